use std::sync::Arc;

use corral::{args, Container, Instance, Param, Service, TypeDescriptor};

// --- Types ---
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

struct StdoutLogger;
impl Logger for StdoutLogger {
  fn log(&self, message: &str) {
    println!("[log] {message}");
  }
}

struct Repository {
  table: String,
}

struct PageController {
  repo: Arc<Repository>,
  logger: Option<Arc<dyn Logger>>,
}

impl PageController {
  fn show(&self, page: &str) -> String {
    if let Some(logger) = &self.logger {
      logger.log(&format!("showing {page}"));
    }
    format!("{page} loaded from {}", self.repo.table)
  }
}

fn main() -> corral::Result<()> {
  let container = Container::new();

  // --- Type Metadata ---
  container
    .register_type(TypeDescriptor::interface("app::Logger"))
    .register_type(TypeDescriptor::class("app::Repository").constructor(
      [Param::new("table", "?string")],
      |args| {
        let table = args.opt::<String>(0).map(|t| (*t).clone());
        Ok(Instance::new(Repository {
          table: table.unwrap_or_else(|| "pages".to_owned()),
        }))
      },
    ))
    .register_type(
      TypeDescriptor::class("app::PageController")
        .constructor(
          [Param::new("repo", "app::Repository"), Param::new("logger", "?app::Logger")],
          |args| {
            Ok(Instance::new(PageController {
              repo: args.arg::<Repository>(0)?,
              logger: args.find_trait::<dyn Logger>(),
            }))
          },
        )
        .method("index", [], |this, _| {
          let this = this.try_downcast::<PageController>()?;
          Ok(Instance::new(this.show("index")))
        }),
    );

  // Every interface named "Logger" is served by the stdout logger.
  container.bind_interface(|short, _, _| {
    (short == "Logger").then(|| Instance::from_trait::<dyn Logger>(Arc::new(StdoutLogger)))
  });

  // --- Services ---
  container.set("controller", Service::class("app::PageController"))?;
  container.set("page.index", Service::method("app::PageController", "index"))?;
  container.set_with_args(
    "repo.archive",
    Service::class("app::Repository"),
    args![String::from("archive")],
  )?;

  // --- Resolution ---
  let controller = container.get_as::<PageController>("controller")?;
  println!("{}", controller.show("about"));

  let index = container.get_as::<String>("page.index")?;
  println!("{index}");

  let archive = container.get_as::<Repository>("repo.archive")?;
  println!("archive table: {}", archive.table);

  Ok(())
}
