//! Queue advancement after terminal events
//!
//! Holds a non-owning reference to the queue owner. The owner normally
//! outlives the relay; when it does not, [`DetachedOwnerPolicy`] decides
//! whether that is logged or fatal.

use super::RelayError;
use crate::config::DetachedOwnerPolicy;
use crate::metrics;
use crate::queue::QueueOwner;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

pub struct QueueAdvancer {
    owner: RwLock<Option<Weak<dyn QueueOwner>>>,
    policy: DetachedOwnerPolicy,
}

impl QueueAdvancer {
    pub fn new(policy: DetachedOwnerPolicy) -> Self {
        Self {
            owner: RwLock::new(None),
            policy,
        }
    }

    pub fn policy(&self) -> DetachedOwnerPolicy {
        self.policy
    }

    /// Point at `owner` without keeping it alive
    pub fn attach<O: QueueOwner + 'static>(&self, owner: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(owner);
        *self.owner.write() = Some(weak);
    }

    pub fn detach(&self) {
        *self.owner.write() = None;
    }

    /// True while the owner is attached and still alive
    pub fn is_attached(&self) -> bool {
        self.resolve().is_some()
    }

    fn resolve(&self) -> Option<Arc<dyn QueueOwner>> {
        self.owner.read().as_ref().and_then(Weak::upgrade)
    }

    /// Remove `upload_id` from the owner's queue and start the next item
    ///
    /// # Panics
    ///
    /// With [`DetachedOwnerPolicy::Panic`], when the owner is gone.
    pub fn advance(&self, upload_id: &str) -> Result<(), RelayError> {
        // Lock is released here; the owner may re-enter the relay.
        let owner = self.resolve();

        let Some(owner) = owner else {
            metrics::record_queue_advance("owner_detached");
            match self.policy {
                DetachedOwnerPolicy::Warn => {
                    warn!(upload.id = %upload_id, "Queue owner is gone, not advancing");
                    return Err(RelayError::OwnerDetached(upload_id.to_string()));
                }
                DetachedOwnerPolicy::Panic => {
                    panic!(
                        "queue owner dropped while relay still receives events (upload {})",
                        upload_id
                    );
                }
            }
        };

        owner.remove_from_queue(upload_id);
        owner.start_next_in_queue();
        metrics::record_queue_advance("advanced");
        debug!(upload.id = %upload_id, "Advanced upload queue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MockQueueOwner;
    use mockall::Sequence;

    #[test]
    fn test_advance_removes_then_starts_next() {
        let mut owner = MockQueueOwner::new();
        let mut seq = Sequence::new();
        owner
            .expect_remove_from_queue()
            .withf(|id| id == "A")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        owner
            .expect_start_next_in_queue()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let owner = Arc::new(owner);
        let advancer = QueueAdvancer::new(DetachedOwnerPolicy::Warn);
        advancer.attach(&owner);

        advancer.advance("A").unwrap();
    }

    #[test]
    fn test_never_attached_is_detached() {
        let advancer = QueueAdvancer::new(DetachedOwnerPolicy::Warn);
        assert!(!advancer.is_attached());
        assert!(matches!(
            advancer.advance("A"),
            Err(RelayError::OwnerDetached(id)) if id == "A"
        ));
    }

    #[test]
    fn test_dropped_owner_is_detached() {
        let advancer = QueueAdvancer::new(DetachedOwnerPolicy::Warn);
        {
            let owner = Arc::new(MockQueueOwner::new());
            advancer.attach(&owner);
            assert!(advancer.is_attached());
        }
        assert!(!advancer.is_attached());
        assert!(advancer.advance("A").is_err());
    }

    #[test]
    fn test_detach_stops_advancing() {
        // No expectations: any call on the mock would fail the test
        let owner = Arc::new(MockQueueOwner::new());
        let advancer = QueueAdvancer::new(DetachedOwnerPolicy::Warn);
        advancer.attach(&owner);
        advancer.detach();
        assert!(advancer.advance("A").is_err());
    }

    #[test]
    #[should_panic(expected = "queue owner dropped")]
    fn test_panic_policy() {
        let advancer = QueueAdvancer::new(DetachedOwnerPolicy::Panic);
        let _ = advancer.advance("A");
    }
}
