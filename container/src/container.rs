//! The main `Container` struct and its associated methods.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{InstanceCache, ResolutionContext};
use crate::core::{Provider, ResolutionGuard, Service};
use crate::error::{Error, Result, ServiceKind};
use crate::instance::{Args, Instance};
use crate::pattern::WildcardPattern;
use crate::resolver::Resolver;
use crate::types::{TypeDescriptor, TypeRegistry};

/// The service registry.
///
/// Binds identifiers to type references, raw values or factories. Type
/// references are resolved through the [`Resolver`] on first `get` and
/// memoized; factories are invoked again on every `get`. The container is
/// thread-safe and definitions may be added at any time.
pub struct Container {
  providers: DashMap<String, Arc<Provider>>,
  types: Arc<TypeRegistry>,
  // Opt-in type cache shared by every resolution of this container.
  shared: Option<Mutex<InstanceCache>>,
  allow_interfaces: bool,
}

impl Default for Container {
  fn default() -> Self {
    Self::with_types(Arc::new(TypeRegistry::new()))
  }
}

impl Container {
  /// Creates a new, empty `Container` with its own type registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a container resolving against an existing type registry.
  pub fn with_types(types: Arc<TypeRegistry>) -> Self {
    Self {
      providers: DashMap::new(),
      types,
      shared: None,
      allow_interfaces: true,
    }
  }

  /// Keeps one type cache for the lifetime of the container instead of a
  /// fresh one per `get`, so unrelated resolutions share instances by type.
  ///
  /// The cache stays locked while a resolution runs: constructors must not
  /// resolve through this same container.
  pub fn with_shared_instances(mut self) -> Self {
    self.shared = Some(Mutex::new(InstanceCache::new()));
    self
  }

  /// See [`Resolver::allow_interfaces`].
  pub fn allow_interfaces(mut self, allow: bool) -> Self {
    self.allow_interfaces = allow;
    self
  }

  pub fn types(&self) -> &Arc<TypeRegistry> {
    &self.types
  }

  pub fn register_type(&self, descriptor: TypeDescriptor) -> &Self {
    self.types.register(descriptor);
    self
  }

  pub fn bind_interface<F>(&self, binding: F) -> &Self
  where
    F: Fn(&str, &str, &TypeDescriptor) -> Option<Instance> + Send + Sync + 'static,
  {
    self.types.bind_interface(binding);
    self
  }

  // --- PRIVATE HELPERS ---

  /// `requested` is the kind of operation (`set` or `factory`), which picks
  /// the wording of the conflict error.
  fn define(
    &self,
    id: &str,
    service: Service,
    args: Option<Args>,
    overwrite: bool,
    requested: ServiceKind,
  ) -> Result<&Self> {
    let provider = Arc::new(Provider::new(service, args));
    match self.providers.entry(id.to_owned()) {
      Entry::Occupied(mut occupied) => {
        if !overwrite {
          return Err(Error::AlreadyDefined {
            id: id.to_owned(),
            existing: occupied.get().kind(),
            requested,
          });
        }
        debug!(id, kind = %provider.kind(), "Overwrote service definition");
        occupied.insert(provider);
      }
      Entry::Vacant(vacant) => {
        debug!(id, kind = %provider.kind(), "Defined service");
        vacant.insert(provider);
      }
    }
    Ok(self)
  }

  fn provider(&self, id: &str) -> Option<Arc<Provider>> {
    self.providers.get(id).map(|entry| entry.value().clone())
  }

  fn resolver(&self) -> Resolver<'_> {
    Resolver::new(&self.types).allow_interfaces(self.allow_interfaces)
  }

  /// Runs `f` against the shared cache, or a fresh one for this call only.
  fn scoped<R>(&self, f: impl FnOnce(&mut ResolutionContext<'_>) -> Result<R>) -> Result<R> {
    match &self.shared {
      Some(shared) => {
        let mut cache = shared.lock();
        f(&mut ResolutionContext::new(&mut cache))
      }
      None => {
        let mut cache = InstanceCache::new();
        f(&mut ResolutionContext::new(&mut cache))
      }
    }
  }

  fn instantiate(&self, id: &str, service: &Service, args: Option<&Args>) -> Result<Instance> {
    match service {
      Service::Type(target) => self
        .scoped(|ctx| self.resolver().build(target, args, ctx))
        .map_err(|err| match err {
          Error::TypeNotFound {
            type_name,
            required_by,
          } if type_name == *target && required_by == *target => Error::TypeNotFound {
            type_name,
            required_by: format!("service {id}"),
          },
          err => err,
        }),
      Service::Value(value) => Ok(value.clone()),
      Service::Factory(factory) => factory(self, args.unwrap_or(&Args::new())),
    }
  }

  // --- PUBLIC API ---

  // --- Definition ---
  /// Binds `id` to `service`. Fails if `id` is already defined.
  pub fn set(&self, id: &str, service: Service) -> Result<&Self> {
    self.define(id, service, None, false, ServiceKind::Container)
  }

  /// Binds `id` to `service` with fixed arguments used when `get` passes none.
  pub fn set_with_args(&self, id: &str, service: Service, args: Args) -> Result<&Self> {
    self.define(id, service, Some(args), false, ServiceKind::Container)
  }

  /// Like [`set`](Container::set), overwriting any existing definition and
  /// dropping what it had resolved.
  pub fn replace(&self, id: &str, service: Service) -> Result<&Self> {
    self.define(id, service, None, true, ServiceKind::Container)
  }

  pub fn replace_with_args(&self, id: &str, service: Service, args: Args) -> Result<&Self> {
    self.define(id, service, Some(args), true, ServiceKind::Container)
  }

  // --- Factory Definition ---
  /// Binds `id` to a callback invoked on every `get`.
  pub fn factory<F>(&self, id: &str, factory: F) -> Result<&Self>
  where
    F: Fn(&Container, &Args) -> Result<Instance> + Send + Sync + 'static,
  {
    self.define(id, Service::factory(factory), None, false, ServiceKind::Factory)
  }

  pub fn replace_factory<F>(&self, id: &str, factory: F) -> Result<&Self>
  where
    F: Fn(&Container, &Args) -> Result<Instance> + Send + Sync + 'static,
  {
    self.define(id, Service::factory(factory), None, true, ServiceKind::Factory)
  }

  // --- Queries ---
  /// Whether anything is registered under `id`. Says nothing about whether
  /// it can be resolved.
  pub fn has(&self, id: &str) -> bool {
    self.providers.contains_key(id)
  }

  pub fn is_factory(&self, id: &str) -> bool {
    self
      .provider(id)
      .is_some_and(|provider| provider.kind() == ServiceKind::Factory)
  }

  pub fn is_container(&self, id: &str) -> bool {
    self
      .provider(id)
      .is_some_and(|provider| provider.kind() == ServiceKind::Container)
  }

  /// Whether `get` has produced a value for the current definition of `id`.
  pub fn is_resolved(&self, id: &str) -> bool {
    self
      .provider(id)
      .is_some_and(|provider| provider.resolved().is_some())
  }

  /// All registered identifiers, sorted.
  pub fn ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.providers.iter().map(|entry| entry.key().clone()).collect();
    ids.sort();
    ids
  }

  // --- Resolution ---
  /// Resolves `id` with its fixed arguments.
  pub fn get(&self, id: &str) -> Result<Instance> {
    self.get_with_args(id, Args::new())
  }

  /// Resolves `id`. Non-empty `args` replace the fixed arguments.
  ///
  /// Factories run on every call. Type references and values are memoized,
  /// except that non-empty `args` on a type reference always build a fresh
  /// instance, which is returned without replacing the memoized one.
  pub fn get_with_args(&self, id: &str, args: Args) -> Result<Instance> {
    let provider = self
      .provider(id)
      .ok_or_else(|| Error::ServiceNotFound(id.to_owned()))?;
    let _guard = ResolutionGuard::enter(self, id)?;

    let explicit = !args.is_empty();
    let args = if explicit { Some(&args) } else { provider.args() };

    match &*provider {
      Provider::Factory { factory, last, .. } => {
        let value = factory(self, args.unwrap_or(&Args::new()))?;
        *last.lock() = Some(value.clone());
        Ok(value)
      }
      Provider::Container { service, cell, .. } => {
        if explicit && matches!(service, Service::Type(_)) {
          debug!(id, "Building a fresh instance for explicit arguments");
          return self.instantiate(id, service, args);
        }
        cell
          .get_or_try_init(|| self.instantiate(id, service, args))
          .cloned()
      }
    }
  }

  /// Resolves `id` and downcasts it.
  pub fn get_as<T: std::any::Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
    self.get(id)?.try_downcast::<T>()
  }

  /// Resolves every identifier matching a `*` wildcard pattern.
  pub fn fetch(&self, pattern: &str) -> Result<BTreeMap<String, Instance>> {
    let matcher = WildcardPattern::new(pattern)?;
    let ids: Vec<String> = self
      .ids()
      .into_iter()
      .filter(|id| matcher.matches(id))
      .collect();
    if ids.is_empty() {
      return Err(Error::NoMatch {
        pattern: pattern.to_owned(),
      });
    }
    ids
      .into_iter()
      .map(|id| self.get(&id).map(|value| (id, value)))
      .collect()
  }

  // --- Direct Resolution ---
  /// Builds a `"Type"` or `"Type::method"` target without registering it.
  pub fn build(&self, target: &str) -> Result<Instance> {
    self.scoped(|ctx| self.resolver().build(target, None, ctx))
  }

  pub fn build_with_args(&self, target: &str, args: Args) -> Result<Instance> {
    self.scoped(|ctx| self.resolver().build(target, Some(&args), ctx))
  }

  /// The argument list the resolver would pass to `target`.
  pub fn resolve_args(&self, target: &str) -> Result<Args> {
    self.scoped(|ctx| self.resolver().resolve(target, None, ctx))
  }

  /// Calls `method` of `type_name` on `instance`, injecting its parameters.
  pub fn call_method(
    &self,
    instance: &Instance,
    type_name: &str,
    method: &str,
  ) -> Result<Instance> {
    self.scoped(|ctx| {
      self
        .resolver()
        .call_method(instance, type_name, method, None, ctx)
    })
  }

  /// Forgets every instance in the shared type cache, if there is one.
  pub fn clear_shared_instances(&self) {
    if let Some(shared) = &self.shared {
      shared.lock().clear();
    }
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("services", &self.ids())
      .field("types", &self.types)
      .field("shared_instances", &self.shared.is_some())
      .field("allow_interfaces", &self.allow_interfaces)
      .finish()
  }
}
