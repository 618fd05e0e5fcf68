//! Identity-keyed collection of handler records.
//!
//! Drivers usually know handlers by name (a key binding table, a menu
//! definition). [`HandlerRegistry`] maps each [`HandlerId`] to its shared
//! record and refuses a second record under the same identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};
use switchyard_core::{
    DispatchMode, ErrorSink, HandlerId, HandlerRecord, RegistrationError, Routine, TracingSink,
};

/// Registry of handler records sharing one parameter type.
pub struct HandlerRegistry<P> {
    handlers: RwLock<HashMap<HandlerId, Arc<HandlerRecord<P>>>>,
    /// Sink given to records created through [`register`](Self::register).
    sink: Arc<dyn ErrorSink>,
}

impl<P> HandlerRegistry<P> {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Uses `sink` for failures of records created by this registry.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Creates, binds and stores a record for `id`.
    pub fn register(
        &self,
        id: impl Into<HandlerId>,
        routine: Routine<P>,
    ) -> RuntimeResult<Arc<HandlerRecord<P>>> {
        let id = id.into();
        let mut handlers = self.handlers.write();

        if handlers.contains_key(&id) {
            return Err(RuntimeError::HandlerExists(id.to_string()));
        }

        let mode = routine.mode();
        let record = Arc::new(
            HandlerRecord::bound(id.clone(), routine).with_error_sink(Arc::clone(&self.sink)),
        );
        handlers.insert(id.clone(), Arc::clone(&record));

        info!(handler = %id, mode = ?mode, "Registered handler");
        Ok(record)
    }

    /// Stores an existing bound record.
    pub fn insert(&self, record: Arc<HandlerRecord<P>>) -> RuntimeResult<()> {
        let id = record.id().cloned().ok_or(RegistrationError::Unbound)?;
        let mut handlers = self.handlers.write();

        if handlers.contains_key(&id) {
            return Err(RuntimeError::HandlerExists(id.to_string()));
        }

        info!(handler = %id, mode = ?record.mode(), "Registered handler");
        handlers.insert(id, record);
        Ok(())
    }

    /// Removes and returns the record for `id`.
    ///
    /// Outstanding clones of the record keep working; they just are no
    /// longer reachable through the registry.
    pub fn remove(&self, id: &HandlerId) -> RuntimeResult<Arc<HandlerRecord<P>>> {
        let record = self
            .handlers
            .write()
            .remove(id)
            .ok_or_else(|| RuntimeError::HandlerNotFound(id.to_string()))?;
        info!(handler = %id, "Unregistered handler");
        Ok(record)
    }

    /// Gets the record for `id`.
    pub fn get(&self, id: &HandlerId) -> Option<Arc<HandlerRecord<P>>> {
        self.handlers.read().get(id).cloned()
    }

    pub fn contains(&self, id: &HandlerId) -> bool {
        self.handlers.read().contains_key(id)
    }

    /// Returns all handler ids, sorted.
    pub fn ids(&self) -> Vec<HandlerId> {
        let mut ids: Vec<_> = self.handlers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered handlers.
    pub fn count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns statistics about the registry.
    pub fn stats(&self) -> RegistryStats {
        let handlers = self.handlers.read();
        let mut stats = RegistryStats {
            total: handlers.len(),
            ..Default::default()
        };

        for record in handlers.values() {
            match record.mode() {
                DispatchMode::Static => stats.static_handlers += 1,
                DispatchMode::Instance => stats.instance_handlers += 1,
                DispatchMode::Unbound => {}
            }
            stats.instances += record.instance_count();
            stats.live_instances += record.live_instance_count();
        }

        stats
    }
}

impl<P> HandlerRegistry<P>
where
    P: Send + Sync + 'static,
{
    /// Dispatches `params` to the handler named `id`.
    pub async fn invoke(&self, id: &HandlerId, params: P) -> RuntimeResult<bool> {
        let record = self
            .get(id)
            .ok_or_else(|| RuntimeError::HandlerNotFound(id.to_string()))?;
        let consumed = record.invoke(params).await;
        debug!(handler = %id, consumed, "Invoked handler by id");
        Ok(consumed)
    }
}

impl<P> Default for HandlerRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for HandlerRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.ids())
            .finish_non_exhaustive()
    }
}

/// Statistics about the handler registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Total number of handlers.
    pub total: usize,
    pub static_handlers: usize,
    pub instance_handlers: usize,
    /// Registered instance references, dead ones included.
    pub instances: usize,
    pub live_instances: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handlers: {} total ({} static, {} instance), {} instances ({} live)",
            self.total,
            self.static_handlers,
            self.instance_handlers,
            self.instances,
            self.live_instances
        )
    }
}
