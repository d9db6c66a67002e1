use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::hub::HubInner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriptionStats {
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
}

/// Handle for one registered status listener.
///
/// Dropping the handle unsubscribes: the delivery task is cancelled and any
/// queued events are discarded.
#[derive(Debug)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) sequence_id: String,
    pub(crate) cancel: CancellationToken,
    pub(crate) stats: Arc<SubscriptionStats>,
    pub(crate) hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn sequence_id(&self) -> &str {
        &self.sequence_id
    }

    /// `false` once the consumer disconnected, the hub disconnected it for
    /// lagging, or the hub was closed.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Resolves when the subscription is torn down from the hub side.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    pub fn delivered(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Returns `true` if this call removed the registration.
    pub fn unsubscribe(self) -> bool {
        self.cancel.cancel();
        self.hub
            .upgrade()
            .map(|hub| hub.remove(&self.sequence_id, self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(&self.sequence_id, self.id);
        }
    }
}
