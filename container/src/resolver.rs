//! The recursive dependency resolver.
//!
//! Given a target (`"Type"` or `"Type::method"`), the resolver walks the
//! declared parameters, builds or reuses an instance for every parameter that
//! names a registered type, and hands the ordered result to the constructor or
//! method. Instances are shared through the [`InstanceCache`] of the
//! [`ResolutionContext`], so every branch of the graph that needs the same type
//! receives the same instance.
//!
//! Scalar parameters are never injected. They come from explicit arguments
//! only, and a parameter that resolves to no instance is left out of the
//! argument list rather than padded.
//!
//! [`InstanceCache`]: crate::InstanceCache

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::ResolutionContext;
use crate::error::{Error, Result};
use crate::instance::{Args, Instance};
use crate::types::{Invoke, Method, MethodKind, TypeDescriptor, TypeRegistry};

/// What a target asks for once its method part is interpreted.
enum Selected<'d> {
  /// Build the type itself, through its constructor if it declares one.
  Construct(Option<&'d Method>),
  /// Call a static or instance method.
  Call(&'d Method),
}

/// Resolves dependencies against a [`TypeRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
  types: &'a TypeRegistry,
  allow_interfaces: bool,
}

impl<'a> Resolver<'a> {
  pub fn new(types: &'a TypeRegistry) -> Self {
    Self {
      types,
      allow_interfaces: true,
    }
  }

  /// When disabled, interface parameters never consult the bindings and
  /// always resolve to no instance.
  pub fn allow_interfaces(mut self, allow: bool) -> Self {
    self.allow_interfaces = allow;
    self
  }

  /// Produces the ordered argument list for `target`'s constructor or method.
  ///
  /// Non-empty `explicit` arguments are used as they are. Otherwise every
  /// parameter naming a registered type is resolved recursively, building and
  /// caching intermediate instances along the way.
  pub fn resolve(
    &self,
    target: &str,
    explicit: Option<&Args>,
    ctx: &mut ResolutionContext<'_>,
  ) -> Result<Args> {
    let (descriptor, method) = self.locate(target, target)?;
    let selected = select(&descriptor, method)?;
    if let Some(args) = explicit.filter(|args| !args.is_empty()) {
      return Ok(args.clone());
    }
    match selected {
      Selected::Construct(Some(ctor)) => self.inject(ctor, descriptor.name(), ctx),
      Selected::Construct(None) => Ok(Args::new()),
      Selected::Call(method) => self.inject(method, descriptor.name(), ctx),
    }
  }

  /// Resolves `target` and constructs it, or calls the method it names.
  pub fn build(
    &self,
    target: &str,
    explicit: Option<&Args>,
    ctx: &mut ResolutionContext<'_>,
  ) -> Result<Instance> {
    let (descriptor, method) = self.locate(target, target)?;
    let selected = select(&descriptor, method)?;

    if descriptor.is_interface() {
      if let Selected::Construct(_) = selected {
        return self
          .instance_of(descriptor.name(), target, ctx)?
          .ok_or_else(|| {
            Error::construction(descriptor.name(), "no interface binding supplied an instance")
          });
      }
    }

    let explicit = explicit.filter(|args| !args.is_empty());
    match selected {
      Selected::Construct(ctor) => {
        let args = match (explicit, ctor) {
          (Some(args), _) => args.clone(),
          (None, Some(ctor)) => self.inject(ctor, descriptor.name(), ctx)?,
          (None, None) => Args::new(),
        };
        instantiate(&descriptor, args)
      }
      Selected::Call(method) => {
        let args = match explicit {
          Some(args) => args.clone(),
          None => self.inject(method, descriptor.name(), ctx)?,
        };
        match method.invoke() {
          Some(Invoke::Static(f)) => f(args),
          Some(Invoke::Instance(f)) => {
            let receiver = self.construct(&descriptor, ctx)?;
            f(&receiver, args)
          }
          None => Err(Error::construction(
            descriptor.name(),
            format!("\"{}\" is not callable", method.name()),
          )),
        }
      }
    }
  }

  /// Injects `method`'s parameters and calls it on an existing instance.
  pub fn call_method(
    &self,
    instance: &Instance,
    type_name: &str,
    method: &str,
    explicit: Option<&Args>,
    ctx: &mut ResolutionContext<'_>,
  ) -> Result<Instance> {
    let descriptor = self.types.get(type_name).ok_or_else(|| Error::TypeNotFound {
      type_name: type_name.to_owned(),
      required_by: format!("{type_name}::{method}"),
    })?;
    let found = descriptor.get_method(method).ok_or_else(|| Error::MethodNotFound {
      type_name: type_name.to_owned(),
      method: method.to_owned(),
    })?;
    let args = match explicit.filter(|args| !args.is_empty()) {
      Some(args) => args.clone(),
      None => self.inject(found, descriptor.name(), ctx)?,
    };
    match (found.kind(), found.invoke()) {
      (MethodKind::Instance, Some(Invoke::Instance(f))) => f(instance, args),
      (MethodKind::Static, Some(Invoke::Static(f))) => f(args),
      (kind, _) => Err(Error::construction(
        type_name,
        format!("the {kind:?} \"{method}\" can not be called on an instance"),
      )),
    }
  }

  /// Finds the descriptor for `target`. `"A::b"` names the type `A::b` if one
  /// is registered, and the method `b` of type `A` otherwise.
  fn locate<'t>(
    &self,
    target: &'t str,
    required_by: &str,
  ) -> Result<(Arc<TypeDescriptor>, Option<&'t str>)> {
    if let Some(descriptor) = self.types.get(target) {
      return Ok((descriptor, None));
    }
    if let Some((type_name, method)) = target.rsplit_once("::") {
      if let Some(descriptor) = self.types.get(type_name) {
        return Ok((descriptor, Some(method)));
      }
    }
    Err(Error::TypeNotFound {
      type_name: target.to_owned(),
      required_by: required_by.to_owned(),
    })
  }

  fn inject(&self, method: &Method, owner: &str, ctx: &mut ResolutionContext<'_>) -> Result<Args> {
    let mut args = Args::new();
    for param in method.params() {
      let Some(type_name) = param.ty.required_type() else {
        trace!(owner, param = %param.name, "Skipping scalar parameter");
        continue;
      };
      match self.instance_of(type_name, owner, ctx)? {
        Some(instance) => args.push(instance),
        None => trace!(owner, param = %param.name, type_name, "Parameter left without an instance"),
      }
    }
    Ok(args)
  }

  /// The shared instance for `type_name`, building it on first use.
  fn instance_of(
    &self,
    type_name: &str,
    required_by: &str,
    ctx: &mut ResolutionContext<'_>,
  ) -> Result<Option<Instance>> {
    if let Some(cached) = ctx.cache().lookup(type_name) {
      trace!(type_name, "Reusing cached instance");
      return Ok(cached.cloned());
    }
    let descriptor = self.types.get(type_name).ok_or_else(|| Error::TypeNotFound {
      type_name: type_name.to_owned(),
      required_by: required_by.to_owned(),
    })?;

    ctx.enter(type_name)?;
    let produced = if descriptor.is_interface() {
      Ok(self.bind_interface(&descriptor))
    } else {
      self.construct(&descriptor, ctx).map(Some)
    };
    ctx.leave(type_name);

    let produced = produced?;
    ctx.cache_mut().insert(type_name, produced.clone());
    Ok(produced)
  }

  fn construct(
    &self,
    descriptor: &TypeDescriptor,
    ctx: &mut ResolutionContext<'_>,
  ) -> Result<Instance> {
    let args = match descriptor.constructor_method() {
      Some(ctor) => self.inject(ctor, descriptor.name(), ctx)?,
      None => Args::new(),
    };
    instantiate(descriptor, args)
  }

  /// Every binding runs in registration order; the last one that supplies an
  /// instance wins.
  fn bind_interface(&self, descriptor: &TypeDescriptor) -> Option<Instance> {
    if !self.allow_interfaces {
      debug!(interface = descriptor.name(), "Interfaces disabled, leaving parameter empty");
      return None;
    }
    let mut bound = None;
    for binding in self.types.interface_bindings() {
      if let Some(instance) = binding(descriptor.short_name(), descriptor.name(), descriptor) {
        bound = Some(instance);
      }
    }
    match &bound {
      Some(instance) => debug!(
        interface = descriptor.name(),
        bound_to = instance.type_name(),
        "Bound interface"
      ),
      None => warn!(interface = descriptor.name(), "No interface binding supplied an instance"),
    }
    bound
  }
}

fn select<'d>(descriptor: &'d TypeDescriptor, method: Option<&str>) -> Result<Selected<'d>> {
  let Some(name) = method else {
    return Ok(Selected::Construct(descriptor.constructor_method()));
  };
  let found = descriptor.get_method(name).ok_or_else(|| Error::MethodNotFound {
    type_name: descriptor.name().to_owned(),
    method: name.to_owned(),
  })?;
  match found.kind() {
    MethodKind::Constructor => Ok(Selected::Construct(Some(found))),
    MethodKind::Destructor => Err(Error::construction(
      descriptor.name(),
      format!("the destructor \"{name}\" can not be used as a service"),
    )),
    MethodKind::Static | MethodKind::Instance => Ok(Selected::Call(found)),
  }
}

fn instantiate(descriptor: &TypeDescriptor, args: Args) -> Result<Instance> {
  debug!(type_name = descriptor.name(), args = args.len(), "Instantiating");
  if let Some(ctor) = descriptor.constructor_method() {
    return match ctor.invoke() {
      Some(Invoke::Static(f)) => f(args),
      _ => Err(Error::construction(descriptor.name(), "the constructor is not callable")),
    };
  }
  match descriptor.init() {
    Some(init) => init(),
    None if descriptor.is_interface() => Err(Error::construction(
      descriptor.name(),
      "an interface can not be instantiated",
    )),
    None => Err(Error::construction(
      descriptor.name(),
      "no constructor or default instantiation is registered",
    )),
  }
}
