mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::init_tracing;
use corral::{
  args, Args, Container, Error, Event, EventHandler, Handler, Instance, MethodFilter, Service,
  TypeDescriptor,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

// --- Test Fixtures ---

/// Records every call and answers with its own name.
struct Recorder {
  name: &'static str,
  calls: Mutex<Vec<String>>,
}

impl Recorder {
  fn new(name: &'static str) -> Arc<Self> {
    Arc::new(Self {
      name,
      calls: Mutex::new(Vec::new()),
    })
  }

  fn calls(&self) -> Vec<String> {
    self.calls.lock().clone()
  }
}

impl Handler for Recorder {
  fn call(&self, method: &str, args: &Args) -> corral::Result<Option<Instance>> {
    self.calls.lock().push(format!("{method}/{}", args.len()));
    Ok(Some(Instance::new(self.name.to_owned())))
  }
}

struct Failing;

impl Handler for Failing {
  fn call(&self, method: &str, _: &Args) -> corral::Result<Option<Instance>> {
    Err(Error::MethodNotFound {
      type_name: "Failing".to_owned(),
      method: method.to_owned(),
    })
  }
}

fn counting_event() -> (Arc<AtomicUsize>, Arc<dyn Event>) {
  let fired = Arc::new(AtomicUsize::new(0));
  let counter = fired.clone();
  let event: Arc<dyn Event> = Arc::new(move || {
    counter.fetch_add(1, Ordering::SeqCst);
  });
  (fired, event)
}

// --- Dispatch ---

#[test]
fn test_call_reaches_every_listening_handler() {
  // Arrange
  init_tracing();
  let first = Recorder::new("first");
  let second = Recorder::new("second");
  let mut events = EventHandler::new();
  events
    .add_handler(first.clone(), MethodFilter::All)
    .add_handler(second.clone(), "save");

  // Act
  let saved = events.call("save", &args![1_i64]).unwrap();
  let loaded = events.call("load", &Args::new()).unwrap();

  // Assert
  assert_eq!(*saved.unwrap().downcast::<String>().unwrap(), "second");
  assert_eq!(*loaded.unwrap().downcast::<String>().unwrap(), "first");
  assert_eq!(first.calls(), vec!["save/1", "load/0"]);
  assert_eq!(second.calls(), vec!["save/1"]);
}

#[test]
fn test_call_without_listener_returns_nothing() {
  init_tracing();
  let recorder = Recorder::new("only");
  let (fired, event) = counting_event();
  let mut events = EventHandler::new();
  events
    .add_handler(recorder.clone(), ["start", "stop"])
    .add_event(event, None);

  assert!(events.call("pause", &Args::new()).unwrap().is_none());
  assert!(recorder.calls().is_empty());
  assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_handler_errors_propagate() {
  init_tracing();
  let mut events = EventHandler::new();
  events.add_handler(Arc::new(Failing), MethodFilter::All);

  let err = events.call("anything", &Args::new()).unwrap_err();

  assert!(matches!(err, Error::MethodNotFound { .. }));
}

// --- Events ---

#[test]
fn test_events_fire_after_every_handled_call() {
  init_tracing();
  let (fired, event) = counting_event();
  let mut events = EventHandler::new();
  events
    .add_handler(Recorder::new("h"), MethodFilter::All)
    .add_event(event, None);

  events.call("a", &Args::new()).unwrap();
  events.call("b", &Args::new()).unwrap();

  assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_bound_event_fires_only_for_its_method() {
  init_tracing();
  let (fired, event) = counting_event();
  let mut events = EventHandler::new();
  events
    .add_handler(Recorder::new("h"), MethodFilter::All)
    .add_event(event, Some("save"));

  events.call("load", &Args::new()).unwrap();
  assert_eq!(fired.load(Ordering::SeqCst), 0);

  events.call("save", &Args::new()).unwrap();
  assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_propagation_fires_each_event_once() {
  // Arrange
  init_tracing();
  let (first_fired, first) = counting_event();
  let (second_fired, second) = counting_event();
  let mut events = EventHandler::new();
  events
    .add_handler(Recorder::new("h"), MethodFilter::All)
    .add_event(first, None)
    .add_event(second, Some("save"))
    .stop_propagation(true);

  // Act
  for method in ["load", "save", "load", "save"] {
    events.call(method, &Args::new()).unwrap();
  }

  // Assert
  assert_eq!(first_fired.load(Ordering::SeqCst), 1);
  assert_eq!(second_fired.load(Ordering::SeqCst), 1);
}

// --- Container integration ---

#[test]
fn test_handlers_and_events_from_the_container() {
  // Arrange
  init_tracing();
  let container = Container::new();
  let recorder = Recorder::new("registered");
  let (fired, event) = counting_event();
  container
    .set("handler.recorder", Service::Value(Instance::from_trait::<dyn Handler>(recorder.clone())))
    .unwrap();
  container
    .set("event.counter", Service::Value(Instance::from_trait::<dyn Event>(event)))
    .unwrap();

  // Act
  let mut events = EventHandler::new();
  events
    .add_handler_from(&container, "handler.recorder", MethodFilter::All)
    .unwrap()
    .add_event_from(&container, "event.counter", None)
    .unwrap();
  events.call("run", &Args::new()).unwrap();

  // Assert
  assert_eq!(events.handler_count(), 1);
  assert_eq!(events.event_count(), 1);
  assert_eq!(recorder.calls(), vec!["run/0"]);
  assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_non_handler_service_is_a_type_mismatch() {
  init_tracing();
  let container = Container::new();
  container.set("plain", Service::value(1_i64)).unwrap();

  let mut events = EventHandler::new();
  let err = events
    .add_handler_from(&container, "plain", MethodFilter::All)
    .unwrap_err();

  assert!(matches!(err, Error::TypeMismatch { .. }));
  assert_eq!(events.handler_count(), 0);
}

#[test]
fn test_handlers_and_events_built_from_types() {
  // Arrange
  init_tracing();
  let container = Container::new();
  let recorder = Recorder::new("built");
  let shared = recorder.clone();
  let (fired, event) = counting_event();
  container
    .register_type(TypeDescriptor::class("audit::Recorder").instantiate_with(move || {
      Ok(Instance::from_trait::<dyn Handler>(shared.clone()))
    }))
    .register_type(
      TypeDescriptor::class("audit::Flushed")
        .instantiate_with(move || Ok(Instance::from_trait::<dyn Event>(event.clone()))),
    );

  // Act
  let mut events = EventHandler::new();
  events
    .add_handler_type(&container, "audit::Recorder", "save")
    .unwrap()
    .add_event_type(&container, "audit::Flushed", Some("save"))
    .unwrap();
  events.call("save", &Args::new()).unwrap();

  // Assert
  assert_eq!(recorder.calls(), vec!["save/0"]);
  assert_eq!(fired.load(Ordering::SeqCst), 1);
  assert!(!container.has("audit::Recorder"));
}

#[test]
fn test_unknown_handler_type() {
  init_tracing();
  let container = Container::new();

  let mut events = EventHandler::new();
  let err = events
    .add_handler_type(&container, "audit::Missing", MethodFilter::All)
    .unwrap_err();

  assert!(matches!(err, Error::TypeNotFound { .. }));
}
