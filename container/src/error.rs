use std::fmt;

use thiserror::Error;

/// The two kinds of registry entries a definition can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
  /// A type reference or raw value, memoized after the first `get`.
  Container,
  /// A callback invoked again on every `get`.
  Factory,
}

impl fmt::Display for ServiceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ServiceKind::Container => f.write_str("container"),
      ServiceKind::Factory => f.write_str("factory"),
    }
  }
}

/// The main error type for `corral`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Trying to get a service ({0}) that does not exist")]
  ServiceNotFound(String),

  #[error("Type \"{type_name}\" does not exist (required by \"{required_by}\")")]
  TypeNotFound {
    type_name: String,
    required_by: String,
  },

  #[error("Type \"{type_name}\" has no method \"{method}\"")]
  MethodNotFound { type_name: String, method: String },

  #[error("No services match the pattern \"{pattern}\"")]
  NoMatch { pattern: String },

  #[error("The pattern \"{pattern}\" has no wildcard (*), nothing to search for")]
  InvalidPattern { pattern: String },

  #[error("{}", conflict_message(.id, *.existing, *.requested))]
  AlreadyDefined {
    id: String,
    existing: ServiceKind,
    requested: ServiceKind,
  },

  #[error("Could not construct \"{type_name}\": {reason}")]
  Construction { type_name: String, reason: String },

  #[error("Cyclic dependency detected: {}", .chain.join(" -> "))]
  CyclicDependency { chain: Vec<String> },

  #[error("Type mismatch: expected {expected}, found {found}")]
  TypeMismatch { expected: String, found: String },

  #[error("Missing argument {index} (expected {expected})")]
  MissingArgument { index: usize, expected: String },

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),
}

impl Error {
  /// True for every "could not find it" flavor: unknown identifiers, types,
  /// methods and fruitless or wildcard-less `fetch` patterns.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Error::ServiceNotFound(_)
        | Error::TypeNotFound { .. }
        | Error::MethodNotFound { .. }
        | Error::NoMatch { .. }
        | Error::InvalidPattern { .. }
    )
  }

  pub(crate) fn construction(type_name: &str, reason: impl Into<String>) -> Self {
    Error::Construction {
      type_name: type_name.to_owned(),
      reason: reason.into(),
    }
  }
}

fn conflict_message(id: &str, existing: ServiceKind, requested: ServiceKind) -> String {
  match (existing, requested) {
    (ServiceKind::Container, ServiceKind::Factory) => format!(
      "({id}) Has already been defined, but has been defined as a container and not factory. \
       If you want to overwrite the container as factory then set overwrite to true."
    ),
    (kind, _) => format!(
      "The {kind} ({id}) has already been defined. If you want to overwrite the {kind} \
       then set overwrite to true."
    ),
  }
}

/// A specialized `Result` type for `corral` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
