//! Push-based streams: the protocol and a handful of publishers built on it.

mod any;
mod canonical;
mod protocol;
pub(crate) mod sink;
mod subject;

pub use any::{AnyMaybePublisher, AnyPublisher, AnySinglePublisher};
pub use canonical::{Empty, Fail, Just, Never};
pub use protocol::{
    Completion, Demand, Publisher, Subscriber, SubscriberRef, Subscription, SubscriptionRef,
};
pub use sink::Cancellable;
pub use subject::Subject;
