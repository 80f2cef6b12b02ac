//! # Corral
//!
//! A runtime dependency injection container for Rust.
//!
//! Services are bound to string identifiers. An identifier points at a
//! registered type, a `"Type::method"` reference, a raw value or a factory.
//! Types are described once in a [`TypeRegistry`]; when a type is requested the
//! [`Resolver`] walks its declared constructor parameters, builds every
//! dependency it can (recursively, sharing one instance per type) and wires
//! them in.
//!
//! ## Core Concepts
//!
//! - **Container**: the registry of identifiers, see [`Container`].
//! - **Type descriptors**: constructors, methods and their parameter types,
//!   see [`TypeDescriptor`].
//! - **Resolution**: type references are built once and memoized; factories
//!   run on every `get`.
//! - **Interface bindings**: callbacks supplying a concrete instance when an
//!   interface parameter is met.
//!
//! ## Quick Start
//!
//! ```
//! use corral::{Container, Instance, Param, Service, TypeDescriptor};
//!
//! struct Test {
//!   title: String,
//! }
//!
//! struct TestController {
//!   test: std::sync::Arc<Test>,
//! }
//!
//! fn main() -> corral::Result<()> {
//!   let container = Container::new();
//!
//!   // Describe the types the resolver may build.
//!   container
//!     .register_type(TypeDescriptor::class("Test").constructor(
//!       [Param::new("title", "?string")],
//!       |args| {
//!         let title = args.opt::<String>(0).map(|t| (*t).clone());
//!         Ok(Instance::new(Test { title: title.unwrap_or_else(|| "None is set".into()) }))
//!       },
//!     ))
//!     .register_type(TypeDescriptor::class("TestController").constructor(
//!       [Param::new("test", "Test")],
//!       |args| Ok(Instance::new(TestController { test: args.arg::<Test>(0)? })),
//!     ));
//!
//!   // Bind an identifier and let the resolver wire the dependencies.
//!   container.set("controller", Service::class("TestController"))?;
//!   let controller = container.get_as::<TestController>("controller")?;
//!
//!   assert_eq!(controller.test.title, "None is set");
//!   Ok(())
//! }
//! ```

mod cache;
mod config;
mod container;
mod core;
mod error;
mod events;
mod global;
mod instance;
mod macros;
mod pattern;
mod resolver;
mod types;

pub use cache::{InstanceCache, ResolutionContext};
pub use config::{ContainerConfig, ServiceConfig};
pub use container::Container;
pub use crate::core::{FactoryFn, Service};
pub use error::{Error, Result, ServiceKind};
pub use events::{Event, EventHandler, Handler, MethodFilter};
pub use global::global;
pub use instance::{Args, Instance};
pub use pattern::WildcardPattern;
pub use resolver::Resolver;
pub use types::{
  is_builtin, InitFn, InstanceFn, InterfaceBinding, Method, MethodKind, Param, ParamType, StaticFn,
  TypeDescriptor, TypeKind, TypeRegistry,
};
