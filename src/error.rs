//! Error types used by the checked publishers and by operations.
//!
//! This module defines two error enums:
//!
//! - [`CardinalityError`]: a publisher broke its cardinality promise.
//! - [`OperationError`]: an operation was driven in a way it does not support.
//!
//! Both provide `as_label` for logs. Cancellation is never an error: it is reported
//! as [`Outcome::Cancelled`](crate::Outcome::Cancelled).

use thiserror::Error;

/// # Violations detected by a checked publisher.
///
/// Surfaced to the immediate subscriber as the failure of its subscription, never
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardinalityError<E> {
    /// Upstream failed before emitting any value.
    #[error("upstream failure: {0}")]
    UpstreamFailure(E),

    /// Upstream emitted a second value.
    #[error("publisher emitted more than one value")]
    TooManyValues,

    /// Upstream emitted a value, then failed.
    #[error("publisher emitted a value and then failed")]
    ValueAndFailure,

    /// Upstream finished without emitting the value it promised.
    #[error("publisher finished without emitting a value")]
    NoValue,
}

impl<E> CardinalityError<E> {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use streamtraits::CardinalityError;
    ///
    /// let err: CardinalityError<std::io::Error> = CardinalityError::TooManyValues;
    /// assert_eq!(err.as_label(), "too_many_values");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CardinalityError::UpstreamFailure(_) => "upstream_failure",
            CardinalityError::TooManyValues => "too_many_values",
            CardinalityError::ValueAndFailure => "value_and_failure",
            CardinalityError::NoValue => "no_value",
        }
    }

    /// Returns the upstream failure, if that is what this error wraps.
    pub fn upstream(&self) -> Option<&E> {
        match self {
            CardinalityError::UpstreamFailure(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the wrapped upstream failure.
    pub fn map_upstream<F>(self, f: impl FnOnce(E) -> F) -> CardinalityError<F> {
        match self {
            CardinalityError::UpstreamFailure(e) => CardinalityError::UpstreamFailure(f(e)),
            CardinalityError::TooManyValues => CardinalityError::TooManyValues,
            CardinalityError::ValueAndFailure => CardinalityError::ValueAndFailure,
            CardinalityError::NoValue => CardinalityError::NoValue,
        }
    }
}

/// # Errors produced when driving an operation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// A completion observer is already registered; each operation reports once.
    #[error("operation {operation:?} already has a completion observer")]
    ObserverAlreadyRegistered {
        /// Name of the operation.
        operation: String,
    },
}

impl OperationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationError::ObserverAlreadyRegistered { .. } => "observer_already_registered",
        }
    }
}

/// Text of a caught panic payload (`&str` or `String`), or a placeholder.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
