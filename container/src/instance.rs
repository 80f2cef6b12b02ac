//! Type-erased values flowing through the container.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A shared, type-erased value: a resolved service, a raw registered value or
/// a constructor argument.
///
/// Cloning an `Instance` shares the underlying value, so two clones are
/// [`ptr_eq`](Instance::ptr_eq).
#[derive(Clone)]
pub struct Instance {
  value: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl Instance {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }

  pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    Self {
      value,
      type_name: type_name::<T>(),
    }
  }

  /// Wraps a trait object. Trait objects are stored as `Arc<Arc<dyn Trait>>`
  /// and come back out through [`downcast_trait`](Instance::downcast_trait).
  pub fn from_trait<I: ?Sized + Any + Send + Sync>(value: Arc<I>) -> Self {
    Self {
      value: Arc::new(value),
      type_name: type_name::<I>(),
    }
  }

  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.value.clone().downcast::<T>().ok()
  }

  pub fn downcast_trait<I: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<I>> {
    self.value.downcast_ref::<Arc<I>>().cloned()
  }

  /// Like [`downcast`](Instance::downcast) but reports what was found instead.
  pub fn try_downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
    self.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
      expected: type_name::<T>().to_owned(),
      found: self.type_name.to_owned(),
    })
  }

  pub fn is<T: Any>(&self) -> bool {
    self.value.is::<T>()
  }

  /// The Rust type the value was created from.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn ptr_eq(&self, other: &Instance) -> bool {
    Arc::ptr_eq(&self.value, &other.value)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Instance({})", self.type_name)
  }
}

/// An ordered list of arguments for a constructor, method or factory.
///
/// Injected argument lists leave out parameters that could not be resolved,
/// so positions are not guaranteed to line up with the declared parameters;
/// [`find`](Args::find) looks an argument up by type instead.
#[derive(Clone, Default)]
pub struct Args(Vec<Instance>);

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, value: Instance) {
    self.0.push(value);
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Instance> {
    self.0.get(index)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
    self.0.iter()
  }

  /// The argument at `index`, which must exist and be a `T`.
  pub fn arg<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
    match self.0.get(index) {
      Some(value) => value.try_downcast::<T>(),
      None => Err(Error::MissingArgument {
        index,
        expected: type_name::<T>().to_owned(),
      }),
    }
  }

  /// The argument at `index` if it exists and is a `T`.
  pub fn opt<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
    self.0.get(index).and_then(Instance::downcast::<T>)
  }

  /// The first argument that is a `T`.
  pub fn find<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.0.iter().find_map(Instance::downcast::<T>)
  }

  /// The first argument holding the trait object `I`.
  pub fn find_trait<I: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<I>> {
    self.0.iter().find_map(Instance::downcast_trait::<I>)
  }
}

impl fmt::Debug for Args {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.0.iter()).finish()
  }
}

impl From<Vec<Instance>> for Args {
  fn from(values: Vec<Instance>) -> Self {
    Args(values)
  }
}

impl FromIterator<Instance> for Args {
  fn from_iter<I: IntoIterator<Item = Instance>>(iter: I) -> Self {
    Args(iter.into_iter().collect())
  }
}

impl IntoIterator for Args {
  type Item = Instance;
  type IntoIter = std::vec::IntoIter<Instance>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl<'a> IntoIterator for &'a Args {
  type Item = &'a Instance;
  type IntoIter = std::slice::Iter<'a, Instance>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
