//! Subscription registry: identity and lifecycle of every subscription.
//!
//! The registry is the only mutable structure shared between gateway calls and
//! streaming sessions. It is split into shards, each guarded by its own `RwLock`, and a
//! shard lock is only held to find or insert an entry. Lifecycle transitions happen on
//! the entry itself through an atomic compare-and-set, so cancels on different
//! subscriptions never contend and cancels on the same one are linearizable.
//!
//! Lifecycle: `ACTIVE -> CANCEL_PENDING -> CANCELLED`, forward only.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

use log::debug;
use parking_lot::RwLock;
use quotes_common::{CancelOutcome, ClientId, SubscriptionId, SubscriptionState};

const SHARD_COUNT: usize = 16;

const ACTIVE: u8 = 0;
const CANCEL_PENDING: u8 = 1;
const CANCELLED: u8 = 2;

fn decode_state(raw: u8) -> SubscriptionState {
    match raw {
        ACTIVE => SubscriptionState::Active,
        CANCEL_PENDING => SubscriptionState::CancelPending,
        _ => SubscriptionState::Cancelled,
    }
}

/// Registry-owned record; sessions and the gateway only ever see snapshots.
#[derive(Debug)]
struct Entry {
    client_id: ClientId,
    created_at: Instant,
    state: AtomicU8,
}

impl Entry {
    fn state(&self) -> SubscriptionState {
        decode_state(self.state.load(Ordering::Acquire))
    }
}

/// Point-in-time view of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub client_id: ClientId,
    pub state: SubscriptionState,
    /// Monotonic creation time.
    pub created_at: Instant,
}

type Shard = RwLock<HashMap<SubscriptionId, Arc<Entry>>>;

/// Concurrent map from subscription id to lifecycle state.
pub struct SubscriptionRegistry {
    shards: Vec<Shard>,
    next_id: AtomicU64,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new ACTIVE subscription for `client_id`. Ids are never reused.
    pub fn create(&self, client_id: ClientId) -> Subscription {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = Arc::new(Entry {
            client_id,
            created_at: Instant::now(),
            state: AtomicU8::new(ACTIVE),
        });
        let snapshot = Self::snapshot(id, &entry);
        self.shard(id).write().insert(id, entry);
        debug!("Subscription {} created for client {}", id, snapshot.client_id);
        snapshot
    }

    /// Current snapshot of `id`, if the registry knows it.
    pub fn lookup(&self, id: SubscriptionId) -> Option<Subscription> {
        self.entry(id).map(|entry| Self::snapshot(id, &entry))
    }

    /// Current state of `id`, if known.
    pub fn state(&self, id: SubscriptionId) -> Option<SubscriptionState> {
        self.entry(id).map(|entry| entry.state())
    }

    /// `true` only while `id` is ACTIVE.
    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.state(id) == Some(SubscriptionState::Active)
    }

    /// Cancel `id`.
    ///
    /// The ACTIVE -> CANCEL_PENDING step is a single compare-and-set, so among any
    /// number of concurrent callers exactly one wins and reports `Confirmed`; it then
    /// completes the move to CANCELLED. Unknown ids and subscriptions already past
    /// ACTIVE are left untouched and reported `Unconfirmed`.
    pub fn request_cancel(&self, id: SubscriptionId) -> CancelOutcome {
        let Some(entry) = self.entry(id) else {
            debug!("Cancel of unknown subscription {}", id);
            return CancelOutcome::Unconfirmed;
        };

        match entry
            .state
            .compare_exchange(ACTIVE, CANCEL_PENDING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                entry.state.store(CANCELLED, Ordering::Release);
                CancelOutcome::Confirmed
            }
            Err(current) => {
                debug!(
                    "Cancel of subscription {} in state {}",
                    id,
                    decode_state(current)
                );
                CancelOutcome::Unconfirmed
            }
        }
    }

    /// Ids of the ACTIVE subscriptions held by `client_id`.
    pub fn active_for_client(&self, client_id: &ClientId) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .filter(|(_, entry)| {
                        &entry.client_id == client_id
                            && entry.state() == SubscriptionState::Active
                    })
                    .map(|(id, _)| *id)
                    .collect::<Vec<_>>()
            })
            .collect();
        ids.sort();
        ids
    }

    /// Drop CANCELLED entries and return how many were removed.
    ///
    /// A purged id behaves exactly like an unknown one: cancels are `Unconfirmed` and
    /// streams are refused.
    pub fn purge_cancelled(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut map = shard.write();
                let before = map.len();
                map.retain(|_, entry| entry.state() != SubscriptionState::Cancelled);
                before - map.len()
            })
            .sum()
    }

    /// Number of entries currently held, in any state.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ACTIVE subscriptions.
    pub fn active_count(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|entry| entry.state() == SubscriptionState::Active)
                    .count()
            })
            .sum()
    }

    fn shard(&self, id: SubscriptionId) -> &Shard {
        &self.shards[(id.seq() % SHARD_COUNT as u64) as usize]
    }

    fn entry(&self, id: SubscriptionId) -> Option<Arc<Entry>> {
        self.shard(id).read().get(&id).cloned()
    }

    fn snapshot(id: SubscriptionId, entry: &Entry) -> Subscription {
        Subscription {
            id,
            client_id: entry.client_id.clone(),
            state: entry.state(),
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn create_issues_fresh_active_ids() {
        let registry = SubscriptionRegistry::new();
        let a = registry.create("c1".into());
        let b = registry.create("c1".into());
        assert_eq!(a.id.to_string(), "s-1");
        assert_eq!(b.id.to_string(), "s-2");
        assert_eq!(a.state, SubscriptionState::Active);
        assert_eq!(registry.lookup(a.id).unwrap().client_id, ClientId::new("c1"));
        assert!(registry.lookup(SubscriptionId::new(99)).is_none());
    }

    #[test]
    fn cancel_confirms_once() {
        let registry = SubscriptionRegistry::new();
        let sub = registry.create("c1".into());
        assert_eq!(registry.request_cancel(sub.id), CancelOutcome::Confirmed);
        assert_eq!(registry.request_cancel(sub.id), CancelOutcome::Unconfirmed);
        assert_eq!(registry.state(sub.id), Some(SubscriptionState::Cancelled));
        assert!(!registry.is_active(sub.id));
    }

    #[test]
    fn cancel_of_unknown_id_is_unconfirmed_and_creates_nothing() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(
            registry.request_cancel(SubscriptionId::new(5)),
            CancelOutcome::Unconfirmed
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_cancels_yield_exactly_one_confirmation() {
        const CALLERS: usize = 32;
        for _ in 0..20 {
            let registry = Arc::new(SubscriptionRegistry::new());
            let id = registry.create("racer".into()).id;
            let barrier = Arc::new(Barrier::new(CALLERS));

            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        registry.request_cancel(id)
                    })
                })
                .collect();

            let confirmed = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(CancelOutcome::is_confirmed)
                .count();
            assert_eq!(confirmed, 1);
            assert_eq!(registry.state(id), Some(SubscriptionState::Cancelled));
        }
    }

    #[test]
    fn concurrent_creates_never_share_an_id() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| registry.create(ClientId::new(format!("c{n}"))).id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids: Vec<SubscriptionId> =
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(registry.active_count(), 800);
    }

    #[test]
    fn active_for_client_skips_cancelled_and_foreign() {
        let registry = SubscriptionRegistry::new();
        let a = registry.create("alice".into()).id;
        let b = registry.create("alice".into()).id;
        registry.create("bob".into());
        registry.request_cancel(a);
        assert_eq!(registry.active_for_client(&"alice".into()), vec![b]);
    }

    #[test]
    fn purge_forgets_only_cancelled_entries() {
        let registry = SubscriptionRegistry::new();
        let gone = registry.create("c".into()).id;
        let kept = registry.create("c".into()).id;
        registry.request_cancel(gone);

        assert_eq!(registry.purge_cancelled(), 1);
        assert!(registry.lookup(gone).is_none());
        assert!(registry.is_active(kept));
        assert_eq!(registry.request_cancel(gone), CancelOutcome::Unconfirmed);
    }
}
