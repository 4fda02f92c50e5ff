//! Property-based tests for snapshot reconciliation
//!
//! Uses proptest to generate arbitrary snapshots, including duplicates,
//! out-of-order entries and messages from other conversations.

use std::collections::HashSet;

use chrono::Duration;
use maternity_messaging::client::messaging::store::MessageStore;
use maternity_messaging::shared::messaging::{
    ConversationKey, Message, MessageId, PregnancyId, UserId,
};
use proptest::prelude::*;

use crate::common::base_time;

/// (id, minute, inbound, read, conversation selector: 0 = ours, 1 = other counterpart, 2 = other pregnancy)
type RawEntry = (u64, i64, bool, bool, u8);

fn raw_snapshot() -> impl Strategy<Value = Vec<RawEntry>> {
    prop::collection::vec((0u64..20, 0i64..30, any::<bool>(), any::<bool>(), 0u8..3), 0..40)
}

struct World {
    me: UserId,
    key: ConversationKey,
    other_counterpart: UserId,
    other_pregnancy: PregnancyId,
}

impl World {
    fn new() -> Self {
        Self {
            me: UserId::new_v4(),
            key: ConversationKey::new(PregnancyId::new_v4(), UserId::new_v4()),
            other_counterpart: UserId::new_v4(),
            other_pregnancy: PregnancyId::new_v4(),
        }
    }

    fn build(&self, raw: &[RawEntry]) -> Vec<Message> {
        raw.iter()
            .map(|&(id, minute, inbound, read, conversation)| {
                let (pregnancy_id, counterpart) = match conversation {
                    0 => (self.key.pregnancy_id, self.key.counterpart_id),
                    1 => (self.key.pregnancy_id, self.other_counterpart),
                    _ => (self.other_pregnancy, self.key.counterpart_id),
                };
                let (from_user_id, to_user_id) = if inbound {
                    (counterpart, self.me)
                } else {
                    (self.me, counterpart)
                };
                Message {
                    id: MessageId(id),
                    pregnancy_id,
                    from_user_id,
                    to_user_id,
                    body: format!("body {}", id),
                    timestamp: base_time() + Duration::minutes(minute),
                    read,
                }
            })
            .collect()
    }

    fn store(&self) -> MessageStore {
        let mut store = MessageStore::new();
        store.reset(Some(self.key));
        store
    }
}

proptest! {
    #[test]
    fn test_reconcile_is_idempotent(raw in raw_snapshot()) {
        let world = World::new();
        let snapshot = world.build(&raw);
        let mut store = world.store();

        store.reconcile(snapshot.clone(), world.me);
        let first = store.messages().to_vec();
        let revision = store.revision();

        let outcome = store.reconcile(snapshot, world.me);
        prop_assert!(!outcome.changed());
        prop_assert_eq!(store.messages(), first.as_slice());
        prop_assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_reconciled_content_is_ordered_and_unique(raw in raw_snapshot()) {
        let world = World::new();
        let mut store = world.store();
        store.reconcile(world.build(&raw), world.me);

        let messages = store.messages();
        for pair in messages.windows(2) {
            prop_assert!(pair[0].order_key() < pair[1].order_key());
        }
        let ids: HashSet<MessageId> = messages.iter().map(|m| m.id).collect();
        prop_assert_eq!(ids.len(), messages.len());
    }

    #[test]
    fn test_foreign_messages_never_visible(raw in raw_snapshot()) {
        let world = World::new();
        let mut store = world.store();
        store.reconcile(world.build(&raw), world.me);

        for message in store.messages() {
            prop_assert!(world.key.contains(message, world.me));
        }
    }

    #[test]
    fn test_read_never_reverts(raw in raw_snapshot()) {
        let world = World::new();
        let mut store = world.store();

        let read_all: Vec<RawEntry> = raw.iter().map(|&(id, m, i, _, c)| (id, m, i, true, c)).collect();
        store.reconcile(world.build(&read_all), world.me);
        let read_ids: HashSet<MessageId> = store.messages().iter().map(|m| m.id).collect();

        let unread_all: Vec<RawEntry> = raw.iter().map(|&(id, m, i, _, c)| (id, m, i, false, c)).collect();
        store.reconcile(world.build(&unread_all), world.me);

        for message in store.messages() {
            if read_ids.contains(&message.id) {
                prop_assert!(message.read);
            }
        }
    }
}
