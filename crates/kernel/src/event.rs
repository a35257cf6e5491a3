//! Event subscription and dispatch types.
//!
//! Subscriptions are keyed by event address pattern. The outer table orders
//! by address, but the per-address entry list preserves insertion order and
//! that order is authoritative for dispatch. The publish fold itself lives
//! on [`World`](crate::world::World).

use crate::error::KernelError;
use crate::message::CollisionData;
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tableau_common::{Address, Value};
use uuid::Uuid;

/// Per-subscriber dispatch outcome: continue or stop the current publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Cascade,
    Resolve,
}

/// End state of one publish: short-circuited or fully folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    Exhausted,
}

/// Typed payload carried by an event.
///
/// A closed variant with explicit accessors: dispatch-side tag checks fail
/// with [`KernelError::EventTypeMismatch`] instead of relying on implicit
/// unboxing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventData {
    /// One simulation step elapsed.
    Tick,
    /// A screen's incoming/outgoing transition completed.
    ScreenTransitionFinished { screen: String },
    /// Physics integrator reported a collision.
    Collision(CollisionData),
    /// An entity with `publish_changes` was updated.
    EntityChange { entity: Address },
    /// User-defined payload.
    Custom(Value),
}

impl EventData {
    pub fn expect_collision(&self) -> Result<&CollisionData, KernelError> {
        match self {
            EventData::Collision(data) => Ok(data),
            _ => Err(KernelError::EventTypeMismatch {
                expected: "collision",
            }),
        }
    }

    pub fn expect_custom(&self) -> Result<&Value, KernelError> {
        match self {
            EventData::Custom(value) => Ok(value),
            _ => Err(KernelError::EventTypeMismatch { expected: "custom" }),
        }
    }
}

/// The event delivered to each subscriber callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_address: Address,
    pub subscriber_address: Address,
    pub publisher_address: Address,
    pub data: EventData,
}

/// Subscriber callback: reads the event, transforms the world, and decides
/// whether the publish fold continues.
pub type Callback =
    Arc<dyn Fn(&Event, &mut World) -> Result<Handling, KernelError> + Send + Sync>;

/// Fresh unique key handed out at subscribe time, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey(Uuid);

impl SubscriptionKey {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry in a subscription list.
#[derive(Clone)]
pub struct SubscriptionEntry {
    pub key: SubscriptionKey,
    pub subscriber: Address,
    pub callback: Callback,
}

impl fmt::Debug for SubscriptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionEntry")
            .field("key", &self.key)
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

/// Address-keyed subscription table plus the reverse index used by
/// unsubscribe.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    table: BTreeMap<Address, Vec<SubscriptionEntry>>,
    index: BTreeMap<SubscriptionKey, Address>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at `event_address` and record the reverse mapping.
    /// Multiple subscriptions to one address preserve insertion order.
    pub fn subscribe(
        &mut self,
        event_address: Address,
        subscriber: Address,
        callback: Callback,
    ) -> SubscriptionKey {
        let key = SubscriptionKey::fresh();
        tracing::debug!(%key, event = %event_address, subscriber = %subscriber, "subscribe");
        self.table
            .entry(event_address.clone())
            .or_default()
            .push(SubscriptionEntry {
                key,
                subscriber,
                callback,
            });
        self.index.insert(key, event_address);
        key
    }

    /// Remove the entry recorded for `key`. Unknown keys are a no-op
    /// (idempotent), not an error.
    pub fn unsubscribe(&mut self, key: SubscriptionKey) -> bool {
        let Some(event_address) = self.index.remove(&key) else {
            return false;
        };
        tracing::debug!(%key, event = %event_address, "unsubscribe");
        if let Some(entries) = self.table.get_mut(&event_address) {
            entries.retain(|entry| entry.key != key);
            if entries.is_empty() {
                self.table.remove(&event_address);
            }
        }
        true
    }

    /// Snapshot of every entry whose address pattern matches `event_address`,
    /// in table order by pattern and insertion order within a pattern.
    pub fn matching(&self, event_address: &Address) -> Vec<SubscriptionEntry> {
        self.table
            .iter()
            .filter(|(pattern, _)| pattern.matches(event_address))
            .flat_map(|(_, entries)| entries.iter().cloned())
            .collect()
    }

    /// Entries subscribed at exactly `event_address` (no pattern matching).
    pub fn entries_at(&self, event_address: &Address) -> &[SubscriptionEntry] {
        self.table
            .get(event_address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Identity sorter: dispatch in subscription insertion order.
pub fn insertion_order(entries: Vec<SubscriptionEntry>, _world: &World) -> Vec<SubscriptionEntry> {
    entries
}

/// Default sorter: stable sort by subscriber publishing priority, highest
/// first. Subscribers that no longer exist sink to the end (they are skipped
/// during the fold anyway).
pub fn by_publishing_priority(
    mut entries: Vec<SubscriptionEntry>,
    world: &World,
) -> Vec<SubscriptionEntry> {
    entries.sort_by(|a, b| {
        let pa = world.publishing_priority(&a.subscriber).unwrap_or(f32::MIN);
        let pb = world.publishing_priority(&b.subscriber).unwrap_or(f32::MIN);
        pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

/// Well-known event channel addresses.
pub mod channels {
    use tableau_common::Address;

    /// Per-step tick event, published from the game root.
    pub fn tick() -> Address {
        Address::new(["tick"])
    }

    /// Change channel of an entity with `publish_changes` set.
    pub fn change(entity: &Address) -> Address {
        entity.child("change")
    }

    /// Collision channel of an entity.
    pub fn collision(entity: &Address) -> Address {
        entity.child("collision")
    }

    /// Published once when a screen's incoming transition completes.
    pub fn incoming_finish(screen: &str) -> Address {
        Address::new([screen, "incoming-finish"])
    }

    /// Published once when a screen's outgoing transition completes.
    pub fn outgoing_finish(screen: &str) -> Address {
        Address::new([screen, "outgoing-finish"])
    }
}
