//! Fan-out of method calls to a set of handlers, followed by event callbacks.
//!
//! Calling a method on an [`EventHandler`] forwards it to every handler
//! listening to that method. Once at least one handler took the call, the
//! registered events fire. With propagation stopped, each event fires at most
//! once over the lifetime of the handler.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::container::Container;
use crate::error::{Error, Result};
use crate::instance::{Args, Instance};

/// Receives forwarded method calls.
pub trait Handler: Send + Sync {
  fn call(&self, method: &str, args: &Args) -> Result<Option<Instance>>;
}

/// A callback fired after a handled method call.
pub trait Event: Send + Sync {
  fn resolve(&self);
}

impl<F: Fn() + Send + Sync> Event for F {
  fn resolve(&self) {
    self()
  }
}

/// Which methods a handler listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
  All,
  Only(Vec<String>),
}

impl MethodFilter {
  pub fn matches(&self, method: &str) -> bool {
    match self {
      MethodFilter::All => true,
      MethodFilter::Only(methods) => methods.iter().any(|m| m == method),
    }
  }
}

impl From<&str> for MethodFilter {
  fn from(method: &str) -> Self {
    MethodFilter::Only(vec![method.to_owned()])
  }
}

impl<const N: usize> From<[&str; N]> for MethodFilter {
  fn from(methods: [&str; N]) -> Self {
    MethodFilter::Only(methods.iter().map(|m| (*m).to_owned()).collect())
  }
}

struct Listener {
  event: Arc<dyn Event>,
  bind: Option<String>,
  delivered: bool,
}

#[derive(Default)]
pub struct EventHandler {
  handlers: Vec<(Arc<dyn Handler>, MethodFilter)>,
  listeners: Vec<Listener>,
  stop_propagation: bool,
}

impl EventHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_handler(
    &mut self,
    handler: Arc<dyn Handler>,
    filter: impl Into<MethodFilter>,
  ) -> &mut Self {
    self.handlers.push((handler, filter.into()));
    self
  }

  /// Adds the handler registered under `id`. The service has to hold an
  /// `Arc<dyn Handler>` (see [`Instance::from_trait`]).
  pub fn add_handler_from(
    &mut self,
    container: &Container,
    id: &str,
    filter: impl Into<MethodFilter>,
  ) -> Result<&mut Self> {
    let handler = downcast::<dyn Handler>(container.get(id)?, "dyn Handler")?;
    Ok(self.add_handler(handler, filter))
  }

  /// Builds `type_name` through the container's resolver and adds it as a
  /// handler. The type has to produce an `Arc<dyn Handler>`.
  pub fn add_handler_type(
    &mut self,
    container: &Container,
    type_name: &str,
    filter: impl Into<MethodFilter>,
  ) -> Result<&mut Self> {
    let handler = downcast::<dyn Handler>(container.build(type_name)?, "dyn Handler")?;
    Ok(self.add_handler(handler, filter))
  }

  /// Adds an event. A bound event only fires after calls to that method.
  pub fn add_event(&mut self, event: Arc<dyn Event>, bind: Option<&str>) -> &mut Self {
    self.listeners.push(Listener {
      event,
      bind: bind.map(str::to_owned),
      delivered: false,
    });
    self
  }

  /// Adds the event registered under `id`, which has to hold an `Arc<dyn Event>`.
  pub fn add_event_from(
    &mut self,
    container: &Container,
    id: &str,
    bind: Option<&str>,
  ) -> Result<&mut Self> {
    let event = downcast::<dyn Event>(container.get(id)?, "dyn Event")?;
    Ok(self.add_event(event, bind))
  }

  /// Builds `type_name`, which has to produce an `Arc<dyn Event>`, and adds it.
  pub fn add_event_type(
    &mut self,
    container: &Container,
    type_name: &str,
    bind: Option<&str>,
  ) -> Result<&mut Self> {
    let event = downcast::<dyn Event>(container.build(type_name)?, "dyn Event")?;
    Ok(self.add_event(event, bind))
  }

  /// When set, every event fires at most once.
  pub fn stop_propagation(&mut self, stop: bool) -> &mut Self {
    self.stop_propagation = stop;
    self
  }

  /// Forwards `method` to the handlers listening to it and returns what the
  /// last of them returned. Fires the events if any handler listened.
  pub fn call(&mut self, method: &str, args: &Args) -> Result<Option<Instance>> {
    let mut result = None;
    let mut handled = false;
    for (handler, filter) in &self.handlers {
      if !filter.matches(method) {
        continue;
      }
      handled = true;
      result = handler.call(method, args)?;
    }
    if handled {
      self.trigger(method);
    } else {
      trace!(method, "No handler listens to method");
    }
    Ok(result)
  }

  fn trigger(&mut self, method: &str) {
    let stop = self.stop_propagation;
    for listener in &mut self.listeners {
      if listener.bind.as_deref().is_some_and(|bind| bind != method) {
        continue;
      }
      if stop && listener.delivered {
        continue;
      }
      listener.event.resolve();
      listener.delivered = true;
    }
    debug!(method, "Triggered events");
  }

  pub fn handler_count(&self) -> usize {
    self.handlers.len()
  }

  pub fn event_count(&self) -> usize {
    self.listeners.len()
  }
}

impl fmt::Debug for EventHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventHandler")
      .field("handlers", &self.handlers.len())
      .field("events", &self.listeners.len())
      .field("stop_propagation", &self.stop_propagation)
      .finish()
  }
}

fn downcast<I: ?Sized + std::any::Any + Send + Sync>(
  instance: Instance,
  expected: &str,
) -> Result<Arc<I>> {
  instance.downcast_trait::<I>().ok_or_else(|| Error::TypeMismatch {
    expected: expected.to_owned(),
    found: instance.type_name().to_owned(),
  })
}
