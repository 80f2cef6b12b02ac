//! Declarative service definitions.
//!
//! ```yaml
//! share_instances: false
//! allow_interfaces: true
//! services:
//!   greeting: { value: "Hello" }
//!   page:     { type: "TestClass", args: ["Test"] }
//!   lorem:    { type: "TestClass::testGet", args: ["Lorem"], overwrite: true }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use crate::container::Container;
use crate::core::Service;
use crate::error::{Error, Result};
use crate::instance::{Args, Instance};
use crate::types::TypeRegistry;

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
  #[serde(default)]
  pub share_instances: bool,
  #[serde(default = "default_allow_interfaces")]
  pub allow_interfaces: bool,
  #[serde(default)]
  pub services: BTreeMap<String, ServiceConfig>,
}

fn default_allow_interfaces() -> bool {
  true
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      share_instances: false,
      allow_interfaces: default_allow_interfaces(),
      services: BTreeMap::new(),
    }
  }
}

// --- Service Config ---
/// One identifier: exactly one of `type` or `value`, plus optional fixed
/// arguments.
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
  #[serde(default, rename = "type")]
  pub type_ref: Option<String>,
  #[serde(default)]
  pub value: Option<Value>,
  #[serde(default)]
  pub args: Vec<Value>,
  #[serde(default)]
  pub overwrite: bool,
}

impl ContainerConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    serde_yaml::from_str(yaml).map_err(|err| Error::Config(err.to_string()))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "Loaded container configuration");
    Self::from_yaml_str(&yaml)
  }
}

impl ServiceConfig {
  fn to_service(&self, id: &str) -> Result<(Service, Option<Args>)> {
    let service = match (&self.type_ref, &self.value) {
      (Some(target), None) => Service::Type(target.clone()),
      (None, Some(value)) => Service::Value(to_instance(value, id)?),
      (Some(_), Some(_)) => {
        return Err(Error::Config(format!("service \"{id}\" sets both type and value")));
      }
      (None, None) => {
        return Err(Error::Config(format!("service \"{id}\" needs a type or a value")));
      }
    };
    if self.args.is_empty() {
      return Ok((service, None));
    }
    let args = self
      .args
      .iter()
      .map(|arg| to_instance(arg, id))
      .collect::<Result<Args>>()?;
    Ok((service, Some(args)))
  }
}

/// Scalars become `String`, `i64`, `f64` or `bool`; lists become `Vec<Instance>`.
fn to_instance(value: &Value, id: &str) -> Result<Instance> {
  match value {
    Value::String(s) => Ok(Instance::new(s.clone())),
    Value::Bool(b) => Ok(Instance::new(*b)),
    Value::Number(n) => match (n.as_i64(), n.as_f64()) {
      (Some(i), _) => Ok(Instance::new(i)),
      (None, Some(f)) => Ok(Instance::new(f)),
      (None, None) => Err(Error::Config(format!("service \"{id}\": unsupported number {n}"))),
    },
    Value::Sequence(items) => items
      .iter()
      .map(|item| to_instance(item, id))
      .collect::<Result<Vec<_>>>()
      .map(Instance::new),
    Value::Null | Value::Mapping(_) | Value::Tagged(_) => Err(Error::Config(format!(
      "service \"{id}\": only scalars and lists of scalars are supported"
    ))),
  }
}

impl Container {
  /// Creates a container configured by `config` and defines its services.
  pub fn from_config(config: &ContainerConfig, types: Arc<TypeRegistry>) -> Result<Self> {
    let mut container = Container::with_types(types).allow_interfaces(config.allow_interfaces);
    if config.share_instances {
      container = container.with_shared_instances();
    }
    container.load_services(config)?;
    Ok(container)
  }

  /// Defines every service of `config`, honoring each entry's `overwrite`.
  pub fn load_services(&self, config: &ContainerConfig) -> Result<&Self> {
    for (id, entry) in &config.services {
      let (service, args) = entry.to_service(id)?;
      match (args, entry.overwrite) {
        (Some(args), true) => self.replace_with_args(id, service, args)?,
        (Some(args), false) => self.set_with_args(id, service, args)?,
        (None, true) => self.replace(id, service)?,
        (None, false) => self.set(id, service)?,
      };
    }
    Ok(self)
  }
}
