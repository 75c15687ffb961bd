//! Process-wide device-context registry.
//!
//! Runtimes are registered by kind once at startup; contexts are created
//! on first use and cached per place, so every device keeps exactly one
//! default stream for the process lifetime. Core operations receive the
//! context explicitly; nothing in the copy engine reaches for globals.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::context::DeviceContext;
use crate::error::{Result, UnknownKindSnafu};
use crate::place::{DeviceKind, Place};
use crate::runtime::{DeviceRuntime, SoftRuntime};

pub struct ContextRegistry {
    runtimes: RwLock<HashMap<DeviceKind, Arc<dyn DeviceRuntime>>>,
    contexts: RwLock<HashMap<Place, Arc<DeviceContext>>>,
}

impl ContextRegistry {
    fn new() -> Self {
        Self { runtimes: RwLock::new(HashMap::new()), contexts: RwLock::new(HashMap::new()) }
    }

    /// Register a runtime under its kind. The first registration of a
    /// kind wins; repeats are ignored so process setup stays idempotent.
    pub fn register(&self, runtime: Arc<dyn DeviceRuntime>) {
        let kind = runtime.kind().clone();
        let mut runtimes = self.runtimes.write();
        if runtimes.contains_key(&kind) {
            tracing::debug!(kind = %kind, "runtime already registered, keeping the first");
            return;
        }
        runtimes.insert(kind, runtime);
    }

    /// Get or create the context for `place`.
    pub fn context(&self, place: &Place) -> Result<Arc<DeviceContext>> {
        // Fast path: read lock
        {
            let contexts = self.contexts.read();
            if let Some(ctx) = contexts.get(place) {
                return Ok(Arc::clone(ctx));
            }
        }

        let mut contexts = self.contexts.write();

        // Double-check after acquiring the write lock
        if let Some(ctx) = contexts.get(place) {
            return Ok(Arc::clone(ctx));
        }

        let ctx = Arc::new(self.create_context(place)?);
        contexts.insert(place.clone(), Arc::clone(&ctx));
        Ok(ctx)
    }

    /// Get a context by parsing a device string such as `"gcu:0"`.
    pub fn get_device(&self, device: &str) -> Result<Arc<DeviceContext>> {
        let place = Place::from_str(device)?;
        self.context(&place)
    }

    fn create_context(&self, place: &Place) -> Result<DeviceContext> {
        match place {
            Place::Host => Ok(DeviceContext::host(Arc::new(SoftRuntime::new("host", 0)))),
            Place::Device { kind, id } => {
                let runtime = {
                    let runtimes = self.runtimes.read();
                    runtimes.get(kind).map(Arc::clone)
                };
                let runtime =
                    runtime.ok_or_else(|| UnknownKindSnafu { kind: kind.as_str() }.build())?;
                DeviceContext::new(runtime, *id)
            }
        }
    }
}

/// Global context registry instance.
static REGISTRY: Lazy<ContextRegistry> = Lazy::new(ContextRegistry::new);

/// Get the global context registry.
pub fn registry() -> &'static ContextRegistry {
    &REGISTRY
}

/// Register a runtime with the global registry.
pub fn register(runtime: Arc<dyn DeviceRuntime>) {
    registry().register(runtime)
}

/// Convenience function to get the context for a place.
pub fn context(place: &Place) -> Result<Arc<DeviceContext>> {
    registry().context(place)
}

/// Convenience function to get the host-bound context.
pub fn host() -> Result<Arc<DeviceContext>> {
    registry().context(&Place::Host)
}

/// Convenience function to get a context by device string.
pub fn get_device(device: &str) -> Result<Arc<DeviceContext>> {
    registry().get_device(device)
}
