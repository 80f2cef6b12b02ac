//! Public macros for ergonomic service resolution.

/// Resolves a service from the global container.
///
/// # Panics
///
/// Panics if the service cannot be resolved or has a different type. For a
/// non-panicking version, use `global().get(...)` directly.
///
/// # Examples
///
/// ```
/// use corral::{global, resolve, Service};
///
/// global().set("doc.message", Service::value(String::from("hello"))).unwrap();
///
/// // Resolve it as an `Instance`
/// let instance = resolve!("doc.message");
/// assert!(instance.is::<String>());
///
/// // Or downcast it on the way out
/// let message = resolve!(String, "doc.message");
/// assert_eq!(*message, "hello");
/// ```
#[macro_export]
macro_rules! resolve {
  // From a specific container: resolve!(in container, MyService, "id")
  (in $container:expr, $type:ty, $id:expr) => {
    $container
      .get_as::<$type>($id)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required service '{}' as {}: {}",
          $id,
          std::any::type_name::<$type>(),
          err
        )
      })
  };

  // Typed: resolve!(MyService, "id")
  ($type:ty, $id:expr) => {
    $crate::global()
      .get_as::<$type>($id)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required service '{}' as {}: {}",
          $id,
          std::any::type_name::<$type>(),
          err
        )
      })
  };

  // Untyped: resolve!("id")
  ($id:expr) => {
    $crate::global()
      .get($id)
      .unwrap_or_else(|err| panic!("Failed to resolve required service '{}': {}", $id, err))
  };
}

/// Builds an [`Args`](crate::Args) list, wrapping every value in an
/// [`Instance`](crate::Instance).
///
/// ```
/// use corral::args;
///
/// let args = args![String::from("hello"), 42_i64];
/// assert_eq!(args.len(), 2);
/// assert_eq!(*args.arg::<i64>(1).unwrap(), 42);
/// ```
#[macro_export]
macro_rules! args {
  () => {
    $crate::Args::new()
  };
  ($($value:expr),+ $(,)?) => {
    $crate::Args::from(vec![$($crate::Instance::new($value)),+])
  };
}
