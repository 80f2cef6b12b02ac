//! The type-instance cache and the per-resolution context.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::instance::Instance;

/// Type name → shared instance.
///
/// An entry of `None` records that the type was visited but yielded no
/// instance (an interface nobody bound). Parameters of that type are left
/// out of argument lists instead of being retried.
#[derive(Debug, Default)]
pub struct InstanceCache {
  entries: HashMap<String, Option<Instance>>,
}

impl InstanceCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// `None` if the type was never visited, `Some(None)` if it was visited
  /// without producing an instance.
  pub fn lookup(&self, type_name: &str) -> Option<Option<&Instance>> {
    self.entries.get(type_name).map(Option::as_ref)
  }

  pub fn get(&self, type_name: &str) -> Option<&Instance> {
    self.entries.get(type_name).and_then(Option::as_ref)
  }

  pub fn insert(&mut self, type_name: impl Into<String>, instance: Option<Instance>) {
    self.entries.insert(type_name.into(), instance);
  }

  pub fn contains(&self, type_name: &str) -> bool {
    self.entries.contains_key(type_name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

/// State carried through one top-level resolution: the cache to share
/// instances through and the chain of types currently being built.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
  cache: &'a mut InstanceCache,
  in_progress: Vec<String>,
}

impl<'a> ResolutionContext<'a> {
  pub fn new(cache: &'a mut InstanceCache) -> Self {
    Self {
      cache,
      in_progress: Vec::new(),
    }
  }

  pub fn cache(&self) -> &InstanceCache {
    self.cache
  }

  pub(crate) fn cache_mut(&mut self) -> &mut InstanceCache {
    self.cache
  }

  /// Marks `type_name` as being built. Fails if it already is.
  pub(crate) fn enter(&mut self, type_name: &str) -> Result<()> {
    if self.in_progress.iter().any(|t| t == type_name) {
      let mut chain = self.in_progress.clone();
      chain.push(type_name.to_owned());
      return Err(Error::CyclicDependency { chain });
    }
    self.in_progress.push(type_name.to_owned());
    Ok(())
  }

  pub(crate) fn leave(&mut self, type_name: &str) {
    if let Some(pos) = self.in_progress.iter().rposition(|t| t == type_name) {
      self.in_progress.remove(pos);
    }
  }

  pub fn depth(&self) -> usize {
    self.in_progress.len()
  }
}
