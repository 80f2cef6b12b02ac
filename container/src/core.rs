//! Core, non-public data structures for the registry.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::container::Container;
use crate::error::{Error, Result, ServiceKind};
use crate::instance::{Args, Instance};

thread_local! {
  // Identifiers currently being resolved on this thread, in call order, tagged
  // with the container they belong to. A factory that ends up asking for its
  // own identifier shows up here twice.
  static RESOLVING_STACK: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard detecting identifiers that resolve themselves.
///
/// Entering pushes the identifier on the thread-local stack, dropping the
/// guard pops it again.
pub(crate) struct ResolutionGuard {
  owner: usize,
  id: String,
}

impl ResolutionGuard {
  pub(crate) fn enter(owner: &Container, id: &str) -> Result<Self> {
    let owner = owner as *const Container as usize;
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if stack.iter().any(|(o, entry)| *o == owner && entry == id) {
        let mut chain: Vec<String> = stack
          .iter()
          .filter(|(o, _)| *o == owner)
          .map(|(_, entry)| entry.clone())
          .collect();
        chain.push(id.to_owned());
        return Err(Error::CyclicDependency { chain });
      }
      stack.push((owner, id.to_owned()));
      Ok(())
    })?;
    Ok(Self {
      owner,
      id: id.to_owned(),
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(pos) = stack
        .iter()
        .rposition(|(o, entry)| *o == self.owner && *entry == self.id)
      {
        stack.remove(pos);
      }
    });
  }
}

/// A registered callback, invoked on every `get`.
pub type FactoryFn = Arc<dyn Fn(&Container, &Args) -> Result<Instance> + Send + Sync>;

/// What an identifier is bound to.
#[derive(Clone)]
pub enum Service {
  /// A registered type name, or `"Type::method"`.
  Type(String),
  /// A value returned as it is.
  Value(Instance),
  /// A callback invoked on every `get`.
  Factory(FactoryFn),
}

impl Service {
  pub fn class(name: impl Into<String>) -> Self {
    Service::Type(name.into())
  }

  pub fn method(type_name: &str, method: &str) -> Self {
    Service::Type(format!("{type_name}::{method}"))
  }

  pub fn value<T: std::any::Any + Send + Sync>(value: T) -> Self {
    Service::Value(Instance::new(value))
  }

  pub fn factory<F>(f: F) -> Self
  where
    F: Fn(&Container, &Args) -> Result<Instance> + Send + Sync + 'static,
  {
    Service::Factory(Arc::new(f))
  }

  pub fn kind(&self) -> ServiceKind {
    match self {
      Service::Factory(_) => ServiceKind::Factory,
      _ => ServiceKind::Container,
    }
  }
}

impl fmt::Debug for Service {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Service::Type(name) => write!(f, "Service::Type({name})"),
      Service::Value(value) => write!(f, "Service::Value({})", value.type_name()),
      Service::Factory(_) => f.write_str("Service::Factory(..)"),
    }
  }
}

/// The slot behind one identifier: its definition plus what `get` produced.
pub(crate) enum Provider {
  Container {
    service: Service,
    args: Option<Args>,
    cell: OnceCell<Instance>,
  },
  Factory {
    factory: FactoryFn,
    args: Option<Args>,
    last: Mutex<Option<Instance>>,
  },
}

impl Provider {
  pub(crate) fn new(service: Service, args: Option<Args>) -> Self {
    match service {
      Service::Factory(factory) => Provider::Factory {
        factory,
        args,
        last: Mutex::new(None),
      },
      service => Provider::Container {
        service,
        args,
        cell: OnceCell::new(),
      },
    }
  }

  pub(crate) fn kind(&self) -> ServiceKind {
    match self {
      Provider::Container { .. } => ServiceKind::Container,
      Provider::Factory { .. } => ServiceKind::Factory,
    }
  }

  /// The fixed arguments stored at definition time.
  pub(crate) fn args(&self) -> Option<&Args> {
    match self {
      Provider::Container { args, .. } | Provider::Factory { args, .. } => args.as_ref(),
    }
  }

  /// The value the last `get` produced, if any.
  pub(crate) fn resolved(&self) -> Option<Instance> {
    match self {
      Provider::Container { cell, .. } => cell.get().cloned(),
      Provider::Factory { last, .. } => last.lock().clone(),
    }
  }
}
