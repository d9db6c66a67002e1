//! Sequence status fan-out: one bounded queue and one delivery task per
//! subscriber, so a stalled consumer can never hold up the producer or the
//! other subscribers.

mod hub;
mod sink;
mod subscription;

pub use hub::SequenceStatusHub;
pub use sink::{SinkClosed, StatusSink};
pub use subscription::{Subscription, SubscriptionId};
