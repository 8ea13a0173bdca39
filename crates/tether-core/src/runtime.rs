//! The marshalling context.
//!
//! A [`Runtime`] bundles the host interface with the handle registry, the
//! class registry and the method-bind cache. Everything that needs a host
//! takes one explicitly; [`Runtime::global`] is a thin convenience for
//! bindings that want a single process-wide context.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tether_sys::{HostInterface, MethodBindPtr};

use crate::builtin::ObjectRef;
use crate::class::{ClassRegistry, GuestClass, HostClass};
use crate::error::{BindError, BindResult};
use crate::options::RuntimeOptions;
use crate::registry::{HandleRegistry, Ownership};

static GLOBAL: OnceCell<Runtime> = OnceCell::new();

type MethodKey = (&'static str, &'static str, i64);

pub(crate) struct RuntimeInner {
    host: Arc<dyn HostInterface>,
    handles: HandleRegistry,
    classes: ClassRegistry,
    // Resolved binds, stored as addresses so the map stays Send + Sync.
    methods: RwLock<FxHashMap<MethodKey, usize>>,
    options: RuntimeOptions,
}

/// Shared marshalling context. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime over `host` with default options
    pub fn new(host: Arc<dyn HostInterface>) -> Self {
        Self::with_options(host, RuntimeOptions::default())
    }

    /// Create a runtime over `host` with specific options
    pub fn with_options(host: Arc<dyn HostInterface>, options: RuntimeOptions) -> Self {
        let handles = HandleRegistry::new(options.handle_capacity, options.report_leaks);
        Self {
            inner: Arc::new(RuntimeInner {
                host,
                handles,
                classes: ClassRegistry::new(),
                methods: RwLock::new(FxHashMap::default()),
                options,
            }),
        }
    }

    /// Make this runtime the process-global one.
    pub fn install_global(self) -> BindResult<()> {
        GLOBAL
            .set(self)
            .map_err(|_| BindError::HostAlreadyInstalled)
    }

    /// The process-global runtime
    pub fn global() -> BindResult<&'static Runtime> {
        GLOBAL.get().ok_or(BindError::HostNotInstalled)
    }

    /// The process-global runtime, if installed
    pub fn try_global() -> Option<&'static Runtime> {
        GLOBAL.get()
    }

    /// Host interface
    pub fn host(&self) -> &dyn HostInterface {
        &*self.inner.host
    }

    /// Handle registry
    pub fn handles(&self) -> &HandleRegistry {
        &self.inner.handles
    }

    /// Options this runtime was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }

    pub(crate) fn classes(&self) -> &ClassRegistry {
        &self.inner.classes
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RuntimeInner>) -> Option<Runtime> {
        weak.upgrade().map(|inner| Runtime { inner })
    }

    /// Register a guest class with the host.
    pub fn register_class<T: GuestClass>(&self) -> BindResult<()> {
        let record = self.inner.classes.register::<T>(self)?;
        log::debug!(
            "registering class {} extends {}",
            record.class_name,
            record.parent_name
        );
        self.host().register_class(&record);
        Ok(())
    }

    /// Whether a guest class of this name is registered
    pub fn is_registered(&self, class: &str) -> bool {
        self.inner.classes.contains(class)
    }

    /// Unregister every guest class from the host, in reverse registration
    /// order. Objects of those classes must already be gone.
    pub fn deinitialize(&self) {
        self.inner.classes.unregister_all(|class| {
            log::debug!("unregistering class {}", class);
            self.host().unregister_class(class);
        });
        self.inner.methods.write().clear();
    }

    /// Resolve a host method, once per process.
    pub fn method_bind(
        &self,
        class: &'static str,
        method: &'static str,
        hash: i64,
    ) -> BindResult<MethodBindPtr> {
        let key = (class, method, hash);
        if let Some(&addr) = self.inner.methods.read().get(&key) {
            return Ok(addr as MethodBindPtr);
        }

        let bind = self.host().method_bind(class, method, hash);
        if bind.is_null() {
            return Err(BindError::MethodBindNotFound {
                class: class.to_string(),
                method: method.to_string(),
                hash,
            });
        }
        self.inner.methods.write().insert(key, bind as usize);
        Ok(bind)
    }

    /// Construct a host object of `T`'s class, owned by the guest.
    pub fn construct<T: HostClass>(&self) -> Option<T> {
        self.construct_as(T::CLASS_NAME)
    }

    /// Construct an object of the named class (for instance a registered
    /// guest class) and view it through the host class `T` it extends.
    pub fn construct_as<T: HostClass>(&self, class: &str) -> Option<T> {
        let ptr = self.host().construct_object(class);
        if ptr.is_null() {
            log::error!("host could not construct {}", class);
            return None;
        }
        ObjectRef::from_ptr(self, ptr, Ownership::Owned).map(T::from_object)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("handles", &self.inner.handles)
            .field("options", &self.inner.options)
            .finish()
    }
}
