use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use mcs_model::{ComponentHealth, OverflowPolicy, SequenceStatus};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    sink::StatusSink,
    subscription::{Subscription, SubscriptionId, SubscriptionStats},
};

#[derive(Debug)]
struct SubscriberSlot {
    id: SubscriptionId,
    sender: mpsc::Sender<SequenceStatus>,
    cancel: CancellationToken,
    stats: Arc<SubscriptionStats>,
}

#[derive(Debug)]
pub(crate) struct HubInner {
    subscribers: DashMap<String, Vec<Arc<SubscriberSlot>>>,
    queue_capacity: usize,
    overflow: OverflowPolicy,
    dropped_total: AtomicU64,
}

impl HubInner {
    pub(crate) fn remove(&self, sequence_id: &str, id: SubscriptionId) -> bool {
        let removed = {
            let Some(mut slots) = self.subscribers.get_mut(sequence_id) else {
                return false;
            };
            let before = slots.len();
            slots.retain(|slot| {
                if slot.id == id {
                    slot.cancel.cancel();
                    false
                } else {
                    true
                }
            });
            slots.len() != before
        };
        self.subscribers
            .remove_if(sequence_id, |_, slots| slots.is_empty());
        removed
    }
}

/// Fans sequence status transitions out to independent subscribers.
///
/// Each subscription owns a bounded queue and a delivery task. `publish`
/// never waits on a subscriber: a full queue either drops the event for that
/// subscriber or disconnects it, depending on the [`OverflowPolicy`].
/// Events reach a single subscriber in publish order.
#[derive(Debug, Clone)]
pub struct SequenceStatusHub {
    inner: Arc<HubInner>,
}

impl SequenceStatusHub {
    pub fn new(queue_capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: DashMap::new(),
                queue_capacity: queue_capacity.max(1),
                overflow,
                dropped_total: AtomicU64::new(0),
            }),
        }
    }

    /// Registers `sink` for every future transition of `sequence_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<S: StatusSink>(
        &self,
        sequence_id: impl Into<String>,
        mut sink: S,
    ) -> Subscription {
        let sequence_id = sequence_id.into();
        let id = SubscriptionId::new();
        let (sender, mut receiver) =
            mpsc::channel::<SequenceStatus>(self.inner.queue_capacity);
        let cancel = CancellationToken::new();
        let stats = Arc::new(SubscriptionStats::default());

        self.inner
            .subscribers
            .entry(sequence_id.clone())
            .or_default()
            .push(Arc::new(SubscriberSlot {
                id,
                sender,
                cancel: cancel.clone(),
                stats: Arc::clone(&stats),
            }));

        let hub = Arc::downgrade(&self.inner);
        let token = cancel.clone();
        let worker_stats = Arc::clone(&stats);
        let worker_sequence = sequence_id.clone();
        tokio::spawn(async move {
            loop {
                let status = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = receiver.recv() => match next {
                        Some(status) => status,
                        None => break,
                    },
                };
                let delivered = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = sink.deliver(status) => result,
                };
                match delivered {
                    Ok(()) => {
                        worker_stats.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        debug!(
                            sequence_id = %worker_sequence,
                            subscription = %id,
                            "{err}; removing subscription"
                        );
                        break;
                    }
                }
            }
            token.cancel();
            if let Some(hub) = hub.upgrade() {
                hub.remove(&worker_sequence, id);
            }
        });

        debug!(sequence_id = %sequence_id, subscription = %id, "status subscriber registered");

        Subscription {
            id,
            sequence_id,
            cancel,
            stats,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a subscription by identity. Safe to call repeatedly or after
    /// the consumer already disconnected.
    pub fn unsubscribe(&self, sequence_id: &str, id: SubscriptionId) -> bool {
        self.inner.remove(sequence_id, id)
    }

    /// Queues `status` for every subscriber of its sequence without waiting.
    pub fn publish(&self, status: &SequenceStatus) {
        // Copy the slots out so no map guard is held while sending.
        let slots: Vec<Arc<SubscriberSlot>> =
            match self.inner.subscribers.get(&status.sequence_id) {
                Some(entry) => entry.value().clone(),
                None => return,
            };

        for slot in slots {
            match slot.sender.try_send(status.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => match self.inner.overflow {
                    OverflowPolicy::DropNewest => {
                        slot.stats.dropped.fetch_add(1, Ordering::Relaxed);
                        self.inner.dropped_total.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            sequence_id = %status.sequence_id,
                            subscription = %slot.id,
                            revision = status.revision,
                            "status queue full; event dropped for subscriber"
                        );
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(
                            sequence_id = %status.sequence_id,
                            subscription = %slot.id,
                            "status queue full; disconnecting subscriber"
                        );
                        self.inner.remove(&status.sequence_id, slot.id);
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    self.inner.remove(&status.sequence_id, slot.id);
                }
            }
        }
    }

    pub fn subscriber_count(&self, sequence_id: &str) -> usize {
        self.inner
            .subscribers
            .get(sequence_id)
            .map(|slots| slots.len())
            .unwrap_or(0)
    }

    pub fn total_subscribers(&self) -> usize {
        self.inner
            .subscribers
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped_total.load(Ordering::Relaxed)
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.inner.overflow
    }

    /// Ends every subscription once its queued events are delivered. Used
    /// when the owning service stops.
    ///
    /// Only the queue senders are released here; each delivery task drains
    /// its backlog, sees the queue closed and then tears its subscription
    /// down.
    pub fn close_all(&self) {
        let closing = self.total_subscribers();
        self.inner.subscribers.clear();
        debug!(subscribers = closing, "status hub closing");
    }

    pub fn health(&self) -> ComponentHealth {
        ComponentHealth::ok()
            .with_detail("subscribers", self.total_subscribers() as u64)
            .with_detail(
                "watched_sequences",
                self.inner.subscribers.len() as u64,
            )
            .with_detail("dropped_events", self.dropped_events())
            .with_detail("queue_capacity", self.inner.queue_capacity as u64)
            .with_detail("overflow", self.inner.overflow.as_str())
    }
}
