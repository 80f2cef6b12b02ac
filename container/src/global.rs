//! The global container instance and access functions.

use crate::container::Container;
use once_cell::sync::Lazy;

// The one and only global container instance, with its own type registry.
// It will be created on its first access in a thread-safe manner.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(Container::default);

/// Provides a reference to the global container instance.
///
/// Its type registry, and so its interface bindings, are process-wide.
///
/// # Examples
///
/// ```
/// use corral::{global, Service};
///
/// fn register_services() -> corral::Result<()> {
///   global().set("app.greeting", Service::value(String::from("Hello from global!")))?;
///   Ok(())
/// }
/// # register_services().unwrap();
/// ```
pub fn global() -> &'static Container {
  &GLOBAL_CONTAINER
}
