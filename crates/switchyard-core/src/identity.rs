//! Handler identity.
//!
//! A [`HandlerId`] names exactly one routine. Two handler records built for
//! the same routine carry equal identities and therefore compare and hash
//! identically, which lets callers keep records in identity-keyed sets and
//! maps without duplicates.

use std::borrow::Cow;
use std::fmt;

/// Stable identity of a handling routine.
///
/// The identity is a path-like string, usually `"<owner type>::<routine>"`.
/// Equality, ordering and hashing look at the path only.
///
/// # Example
///
/// ```rust
/// use switchyard_core::HandlerId;
///
/// struct Camera;
///
/// let a = HandlerId::of::<Camera>("on_key");
/// let b = HandlerId::of::<Camera>("on_key");
/// assert_eq!(a, b);
/// assert_ne!(a, HandlerId::new("on_key"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(Cow<'static, str>);

impl HandlerId {
    /// Creates an identity from an explicit routine path.
    pub fn new(path: impl Into<Cow<'static, str>>) -> Self {
        Self(path.into())
    }

    /// Creates an identity for routine `name` declared on type `T`.
    pub fn of<T: ?Sized>(name: &str) -> Self {
        Self(Cow::Owned(format!("{}::{name}", std::any::type_name::<T>())))
    }

    /// Returns the routine path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for HandlerId {
    fn from(path: &'static str) -> Self {
        Self::new(path)
    }
}

impl From<String> for HandlerId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
