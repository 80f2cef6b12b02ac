mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{fixtures, init_tracing};
use corral::{Container, Error, Instance, Service, TypeDescriptor};
use pretty_assertions::assert_eq;

struct Counted {
  serial: usize,
}

// --- Advanced Tests ---

#[test]
fn test_factory_resolving_other_services() {
  // Arrange
  init_tracing();
  let container = Container::with_types(fixtures());
  container
    .set("config.url", Service::value(String::from("postgres://host/db")))
    .unwrap();
  container
    .factory("db", |c, _| {
      let url = c.get_as::<String>("config.url")?;
      Ok(Instance::new(format!("connection to {url}")))
    })
    .unwrap();
  container
    .factory("users", |c, _| {
      let db = c.get_as::<String>("db")?;
      Ok(Instance::new(format!("users from {db}")))
    })
    .unwrap();

  // Act
  let users = container.get_as::<String>("users").unwrap();

  // Assert
  assert_eq!(*users, "users from connection to postgres://host/db");
}

#[test]
fn test_factory_resolving_itself_is_a_cycle() {
  init_tracing();
  let container = Container::new();
  container.factory("ping", |c, _| c.get("pong")).unwrap();
  container.factory("pong", |c, _| c.get("ping")).unwrap();

  let err = container.get("ping").unwrap_err();

  match err {
    Error::CyclicDependency { chain } => assert_eq!(chain, ["ping", "pong", "ping"]),
    other => panic!("unexpected error: {other}"),
  }
  // The guard is released, so unrelated lookups still work.
  container.set("plain", Service::value(1_i64)).unwrap();
  assert!(container.get("plain").is_ok());
}

#[test]
fn test_same_identifier_in_another_container_is_not_a_cycle() {
  init_tracing();
  let inner = Arc::new(Container::new());
  inner.set("name", Service::value(String::from("inner"))).unwrap();

  let outer = Container::new();
  let source = inner.clone();
  outer
    .factory("name", move |_, _| source.get("name"))
    .unwrap();

  assert_eq!(*outer.get_as::<String>("name").unwrap(), "inner");
}

#[test]
fn test_concurrent_gets_construct_once() {
  // Arrange
  init_tracing();
  let built = Arc::new(AtomicUsize::new(0));
  let counter = built.clone();
  let container = Container::new();
  container.register_type(TypeDescriptor::class("Counted").instantiate_with(move || {
    let serial = counter.fetch_add(1, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    Ok(Instance::new(Counted { serial }))
  }));
  container.set("counted", Service::class("Counted")).unwrap();

  // Act
  let resolved: Vec<Instance> = thread::scope(|scope| {
    let handles: Vec<_> = (0..8)
      .map(|_| scope.spawn(|| container.get("counted").unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  // Assert
  assert_eq!(built.load(Ordering::SeqCst), 1);
  assert!(resolved.iter().all(|r| r.ptr_eq(&resolved[0])));
  assert_eq!(resolved[0].downcast::<Counted>().unwrap().serial, 0);
}

#[test]
fn test_concurrent_definitions() {
  init_tracing();
  let container = Container::new();

  thread::scope(|scope| {
    for t in 0..4 {
      let container = &container;
      scope.spawn(move || {
        for i in 0..25 {
          container
            .set(&format!("svc.{t}.{i}"), Service::value(i as i64))
            .unwrap();
        }
      });
    }
  });

  assert_eq!(container.ids().len(), 100);
  assert_eq!(container.fetch("svc.3.*").unwrap().len(), 25);
}

#[test]
fn test_concurrent_conflicting_sets_keep_exactly_one() {
  init_tracing();
  let container = Container::new();

  let successes: usize = thread::scope(|scope| {
    let handles: Vec<_> = (0..8_i64)
      .map(|n| {
        let container = &container;
        scope.spawn(move || container.set("contested", Service::value(n)).is_ok())
      })
      .collect();
    handles
      .into_iter()
      .map(|h| usize::from(h.join().unwrap()))
      .sum()
  });

  assert_eq!(successes, 1);
  assert!(container.get_as::<i64>("contested").is_ok());
}

#[test]
fn test_containers_share_a_type_registry() {
  init_tracing();
  let types = fixtures();
  let first = Container::with_types(types.clone());
  let second = Container::with_types(types.clone());
  first.register_type(
    TypeDescriptor::class("Late").instantiate_with(|| Ok(Instance::new(String::from("late")))),
  );

  assert!(types.contains("Late"));
  assert_eq!(*second.build("Late").unwrap().downcast::<String>().unwrap(), "late");
  assert!(!second.has("Late"));
}
