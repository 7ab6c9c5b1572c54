//! Queue observers.
//!
//! The queue's listener reads the [`Bus`](crate::events::Bus) and hands each event
//! to the [`ObserverSet`], which keeps one lane per [`Observe`] implementation.
//!
//! ```text
//! OperationQueue ─► Bus ─► listener ─► ObserverSet::emit ─┬─► lane ─► LogWriter
//!                                                         └─► lane ─► your observer
//! ```

#[cfg(feature = "logging")]
mod log;
mod observe;
mod set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observe::Observe;
pub use set::ObserverSet;
