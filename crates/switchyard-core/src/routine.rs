//! Routines: the callables a handler record dispatches to.
//!
//! A routine is captured once, at registration, as an opaque closure. It is
//! either a free function of the parameters ([`Routine::function`]) or a
//! method on some instance type ([`Routine::method`]). The choice is made
//! when the routine is built and never re-inspected per call.
//!
//! Return values are turned into a "consumed" flag through [`IntoConsumed`]:
//! `bool` is taken as is, any non-boolean value counts as consumed, and
//! `Err` marks a failed invocation.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;

// ============================================================================
// IntoConsumed - Handle routine return values
// ============================================================================

/// Conversion from a routine's return value into a consumed flag.
pub trait IntoConsumed {
    /// Returns whether the event was consumed, or the routine's error.
    fn into_consumed(self) -> Result<bool, BoxError>;
}

impl IntoConsumed for bool {
    fn into_consumed(self) -> Result<bool, BoxError> {
        Ok(self)
    }
}

/// Routines without a meaningful result count as consumed.
impl IntoConsumed for () {
    fn into_consumed(self) -> Result<bool, BoxError> {
        Ok(true)
    }
}

impl<T, E> IntoConsumed for Result<T, E>
where
    T: IntoConsumed,
    E: Into<BoxError>,
{
    fn into_consumed(self) -> Result<bool, BoxError> {
        self.map_err(Into::into)?.into_consumed()
    }
}

// ============================================================================
// Routine
// ============================================================================

/// Type-erased routine that needs no instance.
pub type StaticFn<P> = Arc<dyn Fn(&P) -> Result<bool, BoxError> + Send + Sync>;

/// Type-erased routine called against an instance.
///
/// Yields `None` when the instance is not of the receiver type.
pub type InstanceFn<P> =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &P) -> Option<Result<bool, BoxError>> + Send + Sync>;

/// How a handler record dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// No routine is bound; dispatch is a no-op that reports consumed.
    Unbound,
    /// One call per dispatch, not tied to any instance.
    Static,
    /// One call per live registered instance.
    Instance,
}

/// A routine bound to an instance type.
pub struct InstanceRoutine<P> {
    pub(crate) receiver: TypeId,
    pub(crate) receiver_name: &'static str,
    pub(crate) call: InstanceFn<P>,
}

impl<P> InstanceRoutine<P> {
    /// Returns the name of the receiver type.
    pub fn receiver_name(&self) -> &'static str {
        self.receiver_name
    }

    pub(crate) fn accepts(&self, type_id: TypeId) -> bool {
        self.receiver == type_id
    }
}

impl<P> Clone for InstanceRoutine<P> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver,
            receiver_name: self.receiver_name,
            call: Arc::clone(&self.call),
        }
    }
}

/// A handling routine, resolved once into static or instance form.
pub enum Routine<P> {
    /// Called once per dispatch with the parameters only.
    Static(StaticFn<P>),
    /// Called once per live instance.
    Instance(InstanceRoutine<P>),
}

impl<P: 'static> Routine<P> {
    /// Builds a static routine from a function of the parameters.
    ///
    /// ```rust
    /// use switchyard_core::Routine;
    ///
    /// let quit = Routine::function(|key: &char| *key == 'q');
    /// ```
    pub fn function<F, R>(f: F) -> Self
    where
        F: Fn(&P) -> R + Send + Sync + 'static,
        R: IntoConsumed,
    {
        Self::Static(Arc::new(move |params: &P| f(params).into_consumed()))
    }

    /// Builds an instance routine from a method-like closure on `T`.
    ///
    /// ```rust
    /// use switchyard_core::Routine;
    ///
    /// struct Menu;
    ///
    /// impl Menu {
    ///     fn on_key(&self, key: &char) -> bool {
    ///         *key == '\n'
    ///     }
    /// }
    ///
    /// let routine = Routine::method(Menu::on_key);
    /// ```
    pub fn method<T, F, R>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &P) -> R + Send + Sync + 'static,
        R: IntoConsumed,
    {
        Self::Instance(InstanceRoutine {
            receiver: TypeId::of::<T>(),
            receiver_name: type_name::<T>(),
            call: Arc::new(move |target: &(dyn Any + Send + Sync), params: &P| {
                let target = target.downcast_ref::<T>()?;
                Some(f(target, params).into_consumed())
            }),
        })
    }
}

impl<P> Routine<P> {
    /// Returns the dispatch mode this routine resolves to.
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Static(_) => DispatchMode::Static,
            Self::Instance(_) => DispatchMode::Instance,
        }
    }
}

impl<P> Clone for Routine<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(call) => Self::Static(Arc::clone(call)),
            Self::Instance(routine) => Self::Instance(routine.clone()),
        }
    }
}

impl<P> fmt::Debug for Routine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Routine::Static"),
            Self::Instance(routine) => f
                .debug_tuple("Routine::Instance")
                .field(&routine.receiver_name)
                .finish(),
        }
    }
}
