//! Non-owning instance tracking.
//!
//! An [`InstanceRef`] observes a registered object through a [`Weak`]
//! pointer: the registry can call into the object while it is alive, but
//! never keeps it alive. When the owner drops the last [`Arc`], the
//! reference turns dead and is pruned on the next dispatch cycle or
//! unregistration pass.
//!
//! [`InstanceRegistry`] is the per-handler collection of such references.
//! Every operation holds the inner lock only for the duration of a single
//! vector operation, so dispatch iterates over a [`snapshot`] while
//! registrations keep flowing in.
//!
//! [`snapshot`]: InstanceRegistry::snapshot

use std::any::{Any, type_name};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// A live, type-erased instance handed to routines during dispatch.
pub type Target = Arc<dyn Any + Send + Sync>;

/// A non-owning reference to a registered instance.
#[derive(Clone)]
pub struct InstanceRef {
    target: Weak<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl InstanceRef {
    /// Creates a reference observing `instance` without owning it.
    pub fn new<T: Any + Send + Sync>(instance: &Arc<T>) -> Self {
        let target: Weak<T> = Arc::downgrade(instance);
        let target: Weak<dyn Any + Send + Sync> = target;
        Self {
            target,
            type_name: type_name::<T>(),
        }
    }

    /// Returns `true` while the owner has not dropped the instance.
    pub fn is_live(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Returns the live instance, or `None` once it has been destroyed.
    pub fn target(&self) -> Option<Target> {
        self.target.upgrade()
    }

    /// Returns the name of the registered type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if this reference observes exactly `instance`.
    pub fn points_to<T: ?Sized>(&self, instance: &T) -> bool {
        std::ptr::addr_eq(self.target.as_ptr(), instance as *const T)
    }

    /// Returns `true` if both references observe the same allocation.
    pub fn same_as(&self, other: &InstanceRef) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        self.target.as_ptr() as *const ()
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRef")
            .field("type_name", &self.type_name)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Per-handler collection of instance references.
#[derive(Default)]
pub struct InstanceRegistry {
    refs: Mutex<Vec<InstanceRef>>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference.
    ///
    /// No uniqueness check is made: registering the same object twice makes
    /// it receive two invocations per dispatch cycle.
    pub fn register(&self, instance: InstanceRef) {
        self.refs.lock().push(instance);
    }

    /// Removes every reference that is dead or observes `instance`.
    ///
    /// Returns the number of removed references, including unrelated dead
    /// ones swept along the way.
    pub fn unregister<T: ?Sized>(&self, instance: &T) -> usize {
        let mut refs = self.refs.lock();
        let before = refs.len();
        refs.retain(|r| r.is_live() && !r.points_to(instance));
        before - refs.len()
    }

    /// Removes every reference that is dead or observes the same object as
    /// `instance`.
    pub fn remove(&self, instance: &InstanceRef) -> usize {
        let mut refs = self.refs.lock();
        let before = refs.len();
        refs.retain(|r| r.is_live() && !r.same_as(instance));
        before - refs.len()
    }

    /// Removes one reference observing the same object as `instance`.
    ///
    /// Other registrations of that object stay in place. Returns `false`
    /// if no such reference is stored.
    pub fn remove_one(&self, instance: &InstanceRef) -> bool {
        let mut refs = self.refs.lock();
        match refs.iter().position(|r| r.same_as(instance)) {
            Some(index) => {
                refs.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the current references for iteration.
    pub fn snapshot(&self) -> Vec<InstanceRef> {
        self.refs.lock().clone()
    }

    /// Removes the references listed in `dead` that are still dead.
    ///
    /// References registered after the list was computed are kept, so a
    /// prune never discards an instance it did not observe dying.
    pub fn prune(&self, dead: &[InstanceRef]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let dead: HashSet<*const ()> = dead.iter().map(InstanceRef::addr).collect();
        let mut refs = self.refs.lock();
        let before = refs.len();
        refs.retain(|r| r.is_live() || !dead.contains(&r.addr()));
        before - refs.len()
    }

    /// Returns the number of stored references, dead or alive.
    pub fn len(&self) -> usize {
        self.refs.lock().len()
    }

    /// Returns `true` if no references are stored.
    pub fn is_empty(&self) -> bool {
        self.refs.lock().is_empty()
    }

    /// Returns the number of references whose target is still alive.
    pub fn live_count(&self) -> usize {
        self.refs.lock().iter().filter(|r| r.is_live()).count()
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refs = self.refs.lock();
        f.debug_struct("InstanceRegistry")
            .field("len", &refs.len())
            .field("live", &refs.iter().filter(|r| r.is_live()).count())
            .finish()
    }
}
