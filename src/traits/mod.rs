//! # Cardinality traits.
//!
//! A publisher may promise how many values it emits before it terminates:
//!
//! | trait    | values before `Finished` | `Failure` allowed                |
//! |----------|--------------------------|----------------------------------|
//! | `Maybe`  | zero or one              | only if no value was emitted     |
//! | `Single` | exactly one              | only if no value was emitted     |
//!
//! The promise is carried by the marker traits [`MaybePublisher`] and
//! [`SinglePublisher`]. Any publisher can acquire one of them:
//! - [`Checked`] verifies the promise at runtime and turns violations into
//!   [`CardinalityError`](crate::CardinalityError)s;
//! - [`Assert`] trusts the producer (debug builds still panic on misuse).
//!
//! The marker types [`Maybe`] and [`Single`] select the trait statically and expose
//! it at runtime as a [`Cardinality`] tag.

mod assert;
mod check;

pub use assert::Assert;
pub use check::Checked;

use crate::stream::Publisher;

/// Publisher that emits at most one value, and no value before a failure.
pub trait MaybePublisher: Publisher {}

/// Publisher that emits exactly one value before finishing, or fails without value.
pub trait SinglePublisher: MaybePublisher {}

impl<P: MaybePublisher + ?Sized> MaybePublisher for std::sync::Arc<P> {}
impl<P: SinglePublisher + ?Sized> SinglePublisher for std::sync::Arc<P> {}

/// Runtime tag of a cardinality promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one value.
    Maybe,
    /// Exactly one value.
    Single,
}

impl Cardinality {
    /// Returns true if finishing without a value keeps the promise.
    #[inline]
    pub fn allows_empty(self) -> bool {
        matches!(self, Cardinality::Maybe)
    }

    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            Cardinality::Maybe => "maybe",
            Cardinality::Single => "single",
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Static selector of a [`Cardinality`].
pub trait CardinalityKind: sealed::Sealed + Send + Sync + 'static {
    /// The runtime tag.
    const CARDINALITY: Cardinality;
}

/// Selects the zero-or-one promise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maybe;

/// Selects the exactly-one promise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Single;

impl sealed::Sealed for Maybe {}
impl sealed::Sealed for Single {}

impl CardinalityKind for Maybe {
    const CARDINALITY: Cardinality = Cardinality::Maybe;
}

impl CardinalityKind for Single {
    const CARDINALITY: Cardinality = Cardinality::Single;
}
