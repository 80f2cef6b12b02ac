#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use corral::{Args, Instance, Param, TypeDescriptor, TypeRegistry};

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

fn title_or(args: &Args, index: usize, default: &str) -> String {
  args
    .opt::<String>(index)
    .map(|title| (*title).clone())
    .unwrap_or_else(|| default.to_owned())
}

// --- Test Fixtures ---

#[derive(Debug)]
pub struct TestClass {
  pub title: String,
}

#[derive(Debug)]
pub struct Test {
  pub title: String,
}

pub struct TestController {
  pub test: Arc<Test>,
}

// A small graph: A needs B (and a scalar), B needs C, D needs B and C.
static NEXT_SERIAL: AtomicUsize = AtomicUsize::new(0);

pub struct C {
  pub serial: usize,
}
pub struct B {
  pub c: Arc<C>,
}
pub struct A {
  pub b: Arc<B>,
  pub label: String,
}
pub struct D {
  pub b: Arc<B>,
  pub c: Arc<C>,
}

pub trait Logger: Send + Sync {
  fn log(&self, message: &str) -> String;
}

pub struct FileLogger;
impl Logger for FileLogger {
  fn log(&self, message: &str) -> String {
    format!("file: {message}")
  }
}

pub struct MemoryLogger;
impl Logger for MemoryLogger {
  fn log(&self, message: &str) -> String {
    format!("memory: {message}")
  }
}

pub struct Mailer {
  pub logger: Option<Arc<dyn Logger>>,
  pub sender: String,
}

pub struct Notifier {
  pub logger: Option<Arc<dyn Logger>>,
}

pub struct Chicken;
pub struct Egg;

/// Every fixture type, in a registry of its own.
pub fn fixtures() -> Arc<TypeRegistry> {
  let types = TypeRegistry::new();
  types
    .register(
      TypeDescriptor::class("TestClass")
        .constructor([Param::untyped("title")], |args| {
          Ok(Instance::new(TestClass {
            title: title_or(&args, 0, "None is set"),
          }))
        })
        .static_method("testGet", [Param::untyped("arg")], |args| {
          let arg = title_or(&args, 0, "Daniel");
          Ok(Instance::new(format!("Lorem {arg} ipsum")))
        })
        .method("get", [Param::new("title", "?string")], |this, args| {
          let this = this.try_downcast::<TestClass>()?;
          Ok(Instance::new(title_or(&args, 0, &this.title)))
        })
        .destructor("drop"),
    )
    .register(
      TypeDescriptor::class("Test").constructor([Param::untyped("title")], |args| {
        Ok(Instance::new(Test {
          title: title_or(&args, 0, "None is set"),
        }))
      }),
    )
    .register(
      TypeDescriptor::class("TestController")
        .constructor([Param::new("test", "Test")], |args| {
          Ok(Instance::new(TestController {
            test: args.arg::<Test>(0)?,
          }))
        })
        .method("start", [], |this, _| {
          let this = this.try_downcast::<TestController>()?;
          Ok(Instance::new(format!("{}: This is the start page", this.test.title)))
        }),
    )
    .register(TypeDescriptor::class("graph::C").instantiate_with(|| {
      Ok(Instance::new(C {
        serial: NEXT_SERIAL.fetch_add(1, Ordering::SeqCst),
      }))
    }))
    .register(
      TypeDescriptor::class("graph::B").constructor([Param::new("c", "graph::C")], |args| {
        Ok(Instance::new(B {
          c: args.arg::<C>(0)?,
        }))
      }),
    )
    .register(TypeDescriptor::class("graph::A").constructor(
      [Param::new("b", "graph::B"), Param::new("label", "string")],
      |args| {
        Ok(Instance::new(A {
          b: args.arg::<B>(0)?,
          label: args
            .find::<String>()
            .map(|label| (*label).clone())
            .unwrap_or_else(|| "unlabeled".to_owned()),
        }))
      },
    ))
    .register(TypeDescriptor::class("graph::D").constructor(
      [Param::new("b", "graph::B"), Param::new("c", "graph::C")],
      |args| {
        Ok(Instance::new(D {
          b: args.arg::<B>(0)?,
          c: args.arg::<C>(1)?,
        }))
      },
    ))
    .register(TypeDescriptor::interface("log::LoggerInterface"))
    .register(TypeDescriptor::class("log::Mailer").constructor(
      [Param::new("logger", "log::LoggerInterface"), Param::new("sender", "?string")],
      |args| {
        Ok(Instance::new(Mailer {
          logger: args.find_trait::<dyn Logger>(),
          sender: args
            .find::<String>()
            .map(|sender| (*sender).clone())
            .unwrap_or_else(|| "noreply".to_owned()),
        }))
      },
    ))
    .register(TypeDescriptor::class("log::Notifier").constructor(
      [Param::new("channel", "int|?log::LoggerInterface|graph::C")],
      |args| {
        Ok(Instance::new(Notifier {
          logger: args.find_trait::<dyn Logger>(),
        }))
      },
    ))
    .register(
      TypeDescriptor::class("farm::Chicken")
        .constructor([Param::new("egg", "farm::Egg")], |_| Ok(Instance::new(Chicken))),
    )
    .register(
      TypeDescriptor::class("farm::Egg")
        .constructor([Param::new("chicken", "farm::Chicken")], |_| Ok(Instance::new(Egg))),
    )
    .register(
      TypeDescriptor::class("app::Broken")
        .constructor([Param::new("ghost", "app::Ghost")], |_| Ok(Instance::new(()))),
    );
  Arc::new(types)
}

/// Binds `log::LoggerInterface` to `FileLogger`.
pub fn bind_file_logger(types: &TypeRegistry) {
  types.bind_interface(|short, _full, _desc| {
    (short == "LoggerInterface").then(|| Instance::from_trait::<dyn Logger>(Arc::new(FileLogger)))
  });
}
