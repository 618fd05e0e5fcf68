//! Handler records.
//!
//! A [`HandlerRecord`] ties one routine identity to the set of instances
//! that registered interest in it. The record is created once per routine,
//! bound exactly once, and then shared (usually behind an [`Arc`]) between
//! the registrar, the objects registering themselves, and the driver that
//! dispatches events.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard_core::{HandlerId, HandlerRecord, Routine};
//!
//! struct Door { open: AtomicBool }
//!
//! impl Door {
//!     fn on_use(&self, _actor: &u32) -> bool { self.open.swap(true, Ordering::SeqCst) }
//! }
//!
//! let record = Arc::new(HandlerRecord::bound(
//!     HandlerId::of::<Door>("on_use"),
//!     Routine::method(Door::on_use),
//! ));
//!
//! let door = Arc::new(Door { open: AtomicBool::new(false) });
//! record.register_instance(&door)?;
//!
//! let consumed = record.invoke(7).await;
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, trace};

use crate::error::{RegistrationError, RegistrationResult};
use crate::identity::HandlerId;
use crate::instance::{InstanceRef, InstanceRegistry};
use crate::routine::{DispatchMode, Routine};
use crate::sink::{ErrorSink, TracingSink};

/// Identity and routine, set together exactly once.
pub(crate) struct Binding<P> {
    pub(crate) id: HandlerId,
    pub(crate) routine: Routine<P>,
}

/// Dispatch record for one routine.
///
/// Equality and hashing are defined by the bound identity only; unbound
/// records all hash to the same sentinel value.
///
/// # Thread Safety
///
/// `HandlerRecord` is `Send + Sync`. Instance registration takes a short
/// lock on this record's registry; dispatch cycles on this record are
/// serialized by a second, per-record lock. Records never share locks, so
/// different handlers never contend with each other.
pub struct HandlerRecord<P> {
    pub(crate) binding: OnceLock<Binding<P>>,
    pub(crate) instances: InstanceRegistry,
    /// Refs found dead during the current cycle. Guarded by the cycle lock.
    pub(crate) pending_prune: tokio::sync::Mutex<Vec<InstanceRef>>,
    pub(crate) sink: Arc<dyn ErrorSink>,
}

impl<P> HandlerRecord<P> {
    /// Creates an unbound record.
    pub fn new() -> Self {
        Self {
            binding: OnceLock::new(),
            instances: InstanceRegistry::new(),
            pending_prune: tokio::sync::Mutex::new(Vec::new()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Creates a record already bound to `routine`.
    pub fn bound(id: impl Into<HandlerId>, routine: Routine<P>) -> Self {
        let record = Self::new();
        // A fresh record cannot already be bound.
        let _ = record.binding.set(Binding {
            id: id.into(),
            routine,
        });
        record
    }

    /// Replaces the sink that receives invocation failures.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Binds the routine and its identity.
    ///
    /// Binding is set-once: a second call is rejected with
    /// [`RegistrationError::AlreadyBound`] and leaves the first binding intact.
    pub fn bind(&self, id: impl Into<HandlerId>, routine: Routine<P>) -> RegistrationResult<()> {
        let id = id.into();
        self.binding
            .set(Binding {
                id: id.clone(),
                routine,
            })
            .map_err(|rejected| RegistrationError::AlreadyBound {
                existing: self
                    .binding
                    .get()
                    .map_or(rejected.id, |binding| binding.id.clone()),
            })?;
        debug!(handler = %id, "Bound handler routine");
        Ok(())
    }

    /// Returns the bound identity, if any.
    pub fn id(&self) -> Option<&HandlerId> {
        self.binding.get().map(|binding| &binding.id)
    }

    /// Returns the bound routine, if any.
    pub fn routine(&self) -> Option<&Routine<P>> {
        self.binding.get().map(|binding| &binding.routine)
    }

    /// Returns how this record dispatches.
    pub fn mode(&self) -> DispatchMode {
        self.routine()
            .map_or(DispatchMode::Unbound, Routine::mode)
    }

    /// Registers `instance` as a dispatch target.
    ///
    /// The record only keeps a weak reference. Registering the same
    /// instance twice makes it receive two invocations per cycle.
    pub fn register_instance<T>(&self, instance: &Arc<T>) -> RegistrationResult<InstanceRef>
    where
        T: Any + Send + Sync,
    {
        let binding = self.binding.get().ok_or(RegistrationError::Unbound)?;
        match &binding.routine {
            Routine::Static(_) => {
                return Err(RegistrationError::NotInstanceBound {
                    handler: binding.id.clone(),
                });
            }
            Routine::Instance(routine) if !routine.accepts(TypeId::of::<T>()) => {
                return Err(RegistrationError::InstanceTypeMismatch {
                    handler: binding.id.clone(),
                    expected: routine.receiver_name(),
                    got: type_name::<T>(),
                });
            }
            Routine::Instance(_) => {}
        }

        let instance = InstanceRef::new(instance);
        self.instances.register(instance.clone());
        trace!(
            handler = %binding.id,
            instance_type = instance.type_name(),
            "Registered instance"
        );
        Ok(instance)
    }

    /// Registers `instance` and returns a guard that unregisters it on drop.
    pub fn subscribe<T>(self: &Arc<Self>, instance: &Arc<T>) -> RegistrationResult<Subscription<P>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.register_instance(instance)?;
        Ok(Subscription {
            record: Arc::downgrade(self),
            instance,
        })
    }

    /// Removes every registration of `instance`, sweeping dead refs along
    /// the way. Returns the number of removed references.
    ///
    /// Only the instance list is locked, not a running dispatch cycle. A
    /// cycle that snapshotted the list before this call may still invoke
    /// `instance` after it returns; callers tearing down shared state must
    /// tolerate one late invocation. A routine may therefore unregister its
    /// own instance without deadlocking.
    pub fn unregister_instance<T: ?Sized>(&self, instance: &T) -> usize {
        let removed = self.instances.unregister(instance);
        trace!(handler = ?self.id(), removed, "Unregistered instance");
        removed
    }

    /// Returns the instance registry.
    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    /// Returns the number of stored references, dead or alive.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Returns the number of references whose target is alive.
    pub fn live_instance_count(&self) -> usize {
        self.instances.live_count()
    }
}

impl<P> Default for HandlerRecord<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PartialEq for HandlerRecord<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<P> Eq for HandlerRecord<P> {}

impl<P> Hash for HandlerRecord<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<P> fmt::Debug for HandlerRecord<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("id", &self.id())
            .field("mode", &self.mode())
            .field("instances", &self.instances)
            .finish()
    }
}

// ============================================================================
// Subscription - RAII registration guard
// ============================================================================

/// Keeps an instance registered until dropped.
///
/// Dropping the guard removes the one registration it created. Other
/// registrations of the same instance, through another guard or
/// [`HandlerRecord::register_instance`], stay in place. The guard does not
/// keep the record alive.
#[must_use = "dropping a Subscription unregisters the instance immediately"]
pub struct Subscription<P> {
    record: Weak<HandlerRecord<P>>,
    instance: InstanceRef,
}

impl<P> Subscription<P> {
    /// Returns the registered reference.
    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    /// Unregisters the instance now.
    pub fn cancel(self) {}
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        if let Some(record) = self.record.upgrade() {
            let removed = record.instances.remove_one(&self.instance);
            trace!(handler = ?record.id(), removed, "Subscription dropped");
        }
    }
}

impl<P> fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("instance", &self.instance)
            .finish()
    }
}
