use std::sync::Arc;

use corral::{args, Args, Container, Event, EventHandler, Handler, Instance, MethodFilter, Service};

struct AuditTrail;
impl Handler for AuditTrail {
  fn call(&self, method: &str, args: &Args) -> corral::Result<Option<Instance>> {
    println!("audit: {method} with {} argument(s)", args.len());
    Ok(None)
  }
}

struct Mailer;
impl Handler for Mailer {
  fn call(&self, method: &str, args: &Args) -> corral::Result<Option<Instance>> {
    let to = args.arg::<String>(0)?;
    Ok(Some(Instance::new(format!("{method} -> {to}"))))
  }
}

fn main() -> corral::Result<()> {
  let container = Container::new();
  container.set(
    "handler.audit",
    Service::Value(Instance::from_trait::<dyn Handler>(Arc::new(AuditTrail))),
  )?;
  let flushed: Arc<dyn Event> = Arc::new(|| println!("event: outbox flushed"));
  container.set("event.flushed", Service::Value(Instance::from_trait::<dyn Event>(flushed)))?;

  let mut events = EventHandler::new();
  events
    .add_handler_from(&container, "handler.audit", MethodFilter::All)?
    .add_handler(Arc::new(Mailer), "send")
    .add_event_from(&container, "event.flushed", Some("send"))?
    .add_event(Arc::new(|| println!("event: something happened")), None)
    .stop_propagation(true);

  let sent = events.call("send", &args![String::from("ada@example.com")])?;
  if let Some(sent) = sent.and_then(|s| s.downcast::<String>()) {
    println!("{sent}");
  }
  // Propagation is stopped, so no event fires a second time.
  events.call("send", &args![String::from("grace@example.com")])?;
  events.call("ping", &Args::new())?;

  Ok(())
}
