//! Opaque handle to a resolved module

use std::{any::Any, fmt, sync::Arc};

/// A resolved module instance.
///
/// The loader never inspects what a module is; it only stores, shares and
/// compares handles. Callers recover the concrete type with [`downcast_ref`]
/// or [`downcast`].
///
/// [`downcast_ref`]: ModuleInstance::downcast_ref
/// [`downcast`]: ModuleInstance::downcast
#[derive(Clone)]
pub struct ModuleInstance {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ModuleInstance {
    /// Wrap a module value
    pub fn new<T: Any + Send + Sync>(module: T) -> Self {
        Self {
            inner: Arc::new(module),
        }
    }

    /// Wrap an already shared module value
    pub fn from_arc<T: Any + Send + Sync>(module: Arc<T>) -> Self {
        Self { inner: module }
    }

    /// Borrow the module as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Get a shared handle to the module as `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Check whether the module is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &ModuleInstance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}
