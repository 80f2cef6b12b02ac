//! Registered type metadata.
//!
//! The resolver never inspects Rust types directly. Every constructible type
//! is described once by a [`TypeDescriptor`]: its kind (class or interface),
//! its constructor and methods, and for each of those the declared parameter
//! types. The resolver walks this table to infer the object graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::instance::{Args, Instance};

const BUILTIN_TYPES: &[&str] = &[
  "int", "float", "string", "bool", "array", "callable", "iterable", "object", "mixed", "null",
  "void", "never", "false", "true", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16",
  "u32", "u64", "u128", "usize", "f32", "f64", "char", "str", "String",
];

/// Whether a type name denotes a built-in scalar rather than a registered type.
pub fn is_builtin(name: &str) -> bool {
  BUILTIN_TYPES.contains(&name)
}

/// The declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
  /// No declared type. Never injected.
  Untyped,
  /// A scalar / built-in type. Never injected.
  Builtin(String),
  /// A registered class or interface.
  Named(String),
  /// `A|B|...`; injected as its first non-builtin alternative.
  Union(Vec<ParamType>),
}

impl ParamType {
  /// Parses a type expression such as `"string"`, `"?Logger"` or `"int|Logger"`.
  pub fn parse(expr: &str) -> Self {
    let expr = expr.trim();
    if expr.is_empty() {
      return ParamType::Untyped;
    }
    if expr.contains('|') {
      return ParamType::Union(expr.split('|').map(ParamType::parse).collect());
    }
    let name = expr.trim_start_matches('?').trim();
    if is_builtin(name) {
      ParamType::Builtin(name.to_owned())
    } else {
      ParamType::Named(name.to_owned())
    }
  }

  /// The type the resolver has to supply, or `None` for scalar parameters.
  pub fn required_type(&self) -> Option<&str> {
    match self {
      ParamType::Untyped | ParamType::Builtin(_) => None,
      ParamType::Named(name) => Some(name),
      ParamType::Union(alternatives) => alternatives.iter().find_map(ParamType::required_type),
    }
  }

  pub fn is_scalar(&self) -> bool {
    self.required_type().is_none()
  }
}

impl From<&str> for ParamType {
  fn from(expr: &str) -> Self {
    ParamType::parse(expr)
  }
}

/// A declared parameter of a constructor or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub name: String,
  pub ty: ParamType,
}

impl Param {
  pub fn new(name: impl Into<String>, ty: impl Into<ParamType>) -> Self {
    Self {
      name: name.into(),
      ty: ty.into(),
    }
  }

  pub fn untyped(name: impl Into<String>) -> Self {
    Self::new(name, ParamType::Untyped)
  }
}

pub type StaticFn = Arc<dyn Fn(Args) -> Result<Instance> + Send + Sync>;
pub type InstanceFn = Arc<dyn Fn(&Instance, Args) -> Result<Instance> + Send + Sync>;
pub type InitFn = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Invoke {
  Static(StaticFn),
  Instance(InstanceFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
  Constructor,
  Static,
  Instance,
  Destructor,
}

/// A constructor or named method with its parameter list.
#[derive(Clone)]
pub struct Method {
  name: String,
  kind: MethodKind,
  params: Vec<Param>,
  invoke: Option<Invoke>,
}

impl Method {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> MethodKind {
    self.kind
  }

  pub fn params(&self) -> &[Param] {
    &self.params
  }

  pub(crate) fn invoke(&self) -> Option<&Invoke> {
    self.invoke.as_ref()
  }
}

impl fmt::Debug for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Method")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("params", &self.params)
      .finish()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
  Class,
  Interface,
}

/// Everything the resolver needs to know about one type.
#[derive(Clone)]
pub struct TypeDescriptor {
  name: String,
  kind: TypeKind,
  constructor: Option<Method>,
  init: Option<InitFn>,
  methods: HashMap<String, Method>,
}

impl TypeDescriptor {
  pub fn class(name: impl Into<String>) -> Self {
    Self::with_kind(name.into(), TypeKind::Class)
  }

  pub fn interface(name: impl Into<String>) -> Self {
    Self::with_kind(name.into(), TypeKind::Interface)
  }

  fn with_kind(name: String, kind: TypeKind) -> Self {
    Self {
      name,
      kind,
      constructor: None,
      init: None,
      methods: HashMap::new(),
    }
  }

  /// Declares the constructor. Its parameters drive injection.
  pub fn constructor<P, F>(mut self, params: P, f: F) -> Self
  where
    P: IntoIterator<Item = Param>,
    F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
  {
    self.constructor = Some(Method {
      name: "constructor".to_owned(),
      kind: MethodKind::Constructor,
      params: params.into_iter().collect(),
      invoke: Some(Invoke::Static(Arc::new(f))),
    });
    self
  }

  /// Instantiation for a type without a declared constructor.
  pub fn instantiate_with<F>(mut self, f: F) -> Self
  where
    F: Fn() -> Result<Instance> + Send + Sync + 'static,
  {
    self.init = Some(Arc::new(f));
    self
  }

  /// An associated function, reachable as `"Type::name"`.
  pub fn static_method<P, F>(mut self, name: impl Into<String>, params: P, f: F) -> Self
  where
    P: IntoIterator<Item = Param>,
    F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
  {
    let name = name.into();
    self.methods.insert(
      name.clone(),
      Method {
        name,
        kind: MethodKind::Static,
        params: params.into_iter().collect(),
        invoke: Some(Invoke::Static(Arc::new(f))),
      },
    );
    self
  }

  /// A method called on a constructed instance of the type.
  pub fn method<P, F>(mut self, name: impl Into<String>, params: P, f: F) -> Self
  where
    P: IntoIterator<Item = Param>,
    F: Fn(&Instance, Args) -> Result<Instance> + Send + Sync + 'static,
  {
    let name = name.into();
    self.methods.insert(
      name.clone(),
      Method {
        name,
        kind: MethodKind::Instance,
        params: params.into_iter().collect(),
        invoke: Some(Invoke::Instance(Arc::new(f))),
      },
    );
    self
  }

  /// Marks `name` as the destructor. It can never be used as a target.
  pub fn destructor(mut self, name: impl Into<String>) -> Self {
    let name = name.into();
    self.methods.insert(
      name.clone(),
      Method {
        name,
        kind: MethodKind::Destructor,
        params: Vec::new(),
        invoke: None,
      },
    );
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The last path segment of the name.
  pub fn short_name(&self) -> &str {
    let tail = self.name.rsplit("::").next().unwrap_or(&self.name);
    tail.rsplit('\\').next().unwrap_or(tail)
  }

  pub fn kind(&self) -> TypeKind {
    self.kind
  }

  pub fn is_interface(&self) -> bool {
    self.kind == TypeKind::Interface
  }

  pub fn constructor_method(&self) -> Option<&Method> {
    self.constructor.as_ref()
  }

  /// Looks up a method by name. The constructor answers to `"constructor"`
  /// as well as its own name.
  pub fn get_method(&self, name: &str) -> Option<&Method> {
    match self.methods.get(name) {
      Some(method) => Some(method),
      None if name == "constructor" || name == "__construct" => self.constructor.as_ref(),
      None => None,
    }
  }

  pub(crate) fn init(&self) -> Option<&InitFn> {
    self.init.as_ref()
  }
}

impl fmt::Debug for TypeDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeDescriptor")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("constructor", &self.constructor)
      .field("methods", &self.methods.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// A callback that may supply a concrete instance for an interface.
///
/// Called with the interface's short name, its full name and its descriptor.
pub type InterfaceBinding =
  Arc<dyn Fn(&str, &str, &TypeDescriptor) -> Option<Instance> + Send + Sync>;

/// The table of registered types and interface bindings.
#[derive(Default)]
pub struct TypeRegistry {
  types: DashMap<String, Arc<TypeDescriptor>>,
  bindings: RwLock<Vec<InterfaceBinding>>,
}

impl TypeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a descriptor, replacing any earlier one with the same name.
  pub fn register(&self, descriptor: TypeDescriptor) -> &Self {
    debug!(type_name = %descriptor.name, kind = ?descriptor.kind, "Registered type");
    self
      .types
      .insert(descriptor.name.clone(), Arc::new(descriptor));
    self
  }

  pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
    self.types.get(name).map(|entry| entry.value().clone())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.types.contains_key(name)
  }

  /// Appends an interface binding. Bindings are never removed.
  pub fn bind_interface<F>(&self, binding: F) -> &Self
  where
    F: Fn(&str, &str, &TypeDescriptor) -> Option<Instance> + Send + Sync + 'static,
  {
    self.bindings.write().push(Arc::new(binding));
    self
  }

  /// A snapshot of the bindings in registration order.
  pub fn interface_bindings(&self) -> Vec<InterfaceBinding> {
    self.bindings.read().clone()
  }
}

impl fmt::Debug for TypeRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeRegistry")
      .field("types", &self.types.len())
      .field("bindings", &self.bindings.read().len())
      .finish()
  }
}
