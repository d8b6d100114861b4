//! Tests for the list manager.
//!
//! This test suite validates:
//! - Item lifecycle across two users (send, accept, complete, remove, bump)
//! - Reassignment in all its shapes, including rejected ones
//! - Compensating rollback when a primary step fails part-way
//! - Cleanup failures reported as warnings after a successful operation

use std::sync::Arc;

use taskbook_lists::{ListManager, StaticDirectory};
use taskbook_store::test_fixtures::{FaultyKvStore, KvOp};
use taskbook_store::{Error, ItemRepository, ListKind, ReferenceStore, Store};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

struct Harness {
    kv: Arc<FaultyKvStore>,
    store: Store,
    manager: ListManager,
}

fn harness() -> Harness {
    let kv = Arc::new(FaultyKvStore::new());
    let store = Store::new(kv.clone());
    let users = StaticDirectory::new()
        .with_user("alice", "Alice")
        .with_user("bob", "Bob")
        .with_user("carol", "Carol");
    let manager = ListManager::from_store(&store, Arc::new(users));
    Harness { kv, store, manager }
}

impl Harness {
    async fn titles(&self, user: &str, list: ListKind) -> Vec<String> {
        self.manager
            .get_list(user, list)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.item.title)
            .collect()
    }

    async fn item_count(&self) -> usize {
        self.kv.inner().keys_with_prefix("item_").await.len()
    }

    /// Send from alice to bob. Returns (alice's item ID, bob's item ID).
    async fn send(&self, title: &str) -> (String, String) {
        let bob_item = self
            .manager
            .send("alice", "bob", title, "", "")
            .await
            .unwrap();
        let (reference, _) = self
            .store
            .references
            .find_reference("bob", &bob_item, ListKind::Incoming)
            .await
            .unwrap();
        (reference.foreign_item_id, bob_item)
    }
}

// ============================================================================
// ADD / SEND / LIST
// ============================================================================

#[tokio::test]
async fn test_add_appends_to_own_list() {
    let h = harness();
    h.manager.add("alice", "first", "", "").await.unwrap();
    h.manager.add("alice", "second", "details", "post1").await.unwrap();

    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["first", "second"]);
    let list = h.manager.get_list("alice", ListKind::Own).await.unwrap();
    assert_eq!(list[1].item.description, "details");
    assert_eq!(list[1].item.post_id, "post1");
    assert_eq!(list[1].foreign_user, "");
}

#[tokio::test]
async fn test_add_rolls_back_item_when_list_append_fails() {
    let h = harness();
    h.kv.fail_on(KvOp::CompareAndSet, "order_alice");

    let err = h.manager.add("alice", "doomed", "", "").await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_send_creates_mirrored_entries() {
    let h = harness();
    let (alice_item, bob_item) = h.send("buy milk").await;
    assert_ne!(alice_item, bob_item);

    let incoming = h.manager.get_list("bob", ListKind::Incoming).await.unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].item.title, "buy milk");
    assert_eq!(incoming[0].foreign_user, "Alice");
    assert_eq!(incoming[0].foreign_list, "out");
    assert_eq!(incoming[0].foreign_position, 0);

    let outgoing = h.manager.get_list("alice", ListKind::Outgoing).await.unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].item.id, alice_item);
    assert_eq!(outgoing[0].foreign_user, "Bob");
    assert_eq!(outgoing[0].foreign_list, "in");
}

#[tokio::test]
async fn test_send_rolls_back_when_receiver_list_fails() {
    let h = harness();
    h.kv.fail_on(KvOp::CompareAndSet, "order_bob_in");

    let err = h
        .manager
        .send("alice", "bob", "buy milk", "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    h.kv.clear_failures();
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_send_rolls_back_when_sender_list_fails() {
    let h = harness();
    h.kv.fail_on(KvOp::CompareAndSet, "order_alice_out");

    assert!(h.manager.send("alice", "bob", "x", "", "").await.is_err());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_get_list_skips_missing_items() {
    let h = harness();
    let gone = h.manager.add("alice", "gone", "", "").await.unwrap();
    h.manager.add("alice", "kept", "", "").await.unwrap();
    h.store.items.remove(&gone.id).await.unwrap();

    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["kept"]);
}

#[tokio::test]
async fn test_unknown_counterpart_name_uses_placeholder() {
    let h = harness();
    h.manager.send("alice", "dave", "x", "", "").await.unwrap();

    let outgoing = h.manager.get_list("alice", ListKind::Outgoing).await.unwrap();
    assert_eq!(outgoing[0].foreign_user, "Someone");
}

// ============================================================================
// ACCEPT
// ============================================================================

#[tokio::test]
async fn test_accept_moves_to_own_keeping_link() {
    let h = harness();
    let (alice_item, bob_item) = h.send("buy milk").await;

    let accepted = h.manager.accept("bob", &bob_item).await.unwrap();
    assert_eq!(accepted.title, "buy milk");
    assert_eq!(accepted.sender.as_deref(), Some("alice"));

    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
    let own = h.manager.get_list("bob", ListKind::Own).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].foreign_user, "Alice");

    let located = h
        .store
        .references
        .locate("bob", &bob_item)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(located.list, ListKind::Own);
    assert_eq!(located.reference.foreign_item_id, alice_item);
}

#[tokio::test]
async fn test_accept_requires_incoming_item() {
    let h = harness();
    let item = h.manager.add("bob", "mine", "", "").await.unwrap();
    let err = h.manager.accept("bob", &item.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_accept_rolls_back_own_reference_when_incoming_removal_fails() {
    let h = harness();
    let (_, bob_item) = h.send("buy milk").await;
    h.kv.fail_on(KvOp::CompareAndSet, "order_bob_in");

    assert!(h.manager.accept("bob", &bob_item).await.is_err());

    h.kv.clear_failures();
    assert!(h.titles("bob", ListKind::Own).await.is_empty());
    assert_eq!(h.titles("bob", ListKind::Incoming).await, vec!["buy milk"]);
}

// ============================================================================
// COMPLETE / REMOVE / POP
// ============================================================================

#[tokio::test]
async fn test_complete_linked_item_removes_both_sides() {
    let h = harness();
    let (_, bob_item) = h.send("buy milk").await;
    h.manager.accept("bob", &bob_item).await.unwrap();

    let completed = h.manager.complete("bob", &bob_item).await.unwrap();
    assert_eq!(completed.item.unwrap().title, "buy milk");
    assert_eq!(completed.foreign_user.as_deref(), Some("alice"));
    assert_eq!(completed.list, ListKind::Own);
    assert_eq!(completed.foreign_list, Some(ListKind::Outgoing));
    assert!(completed.warnings.is_empty());

    assert!(h.titles("bob", ListKind::Own).await.is_empty());
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_complete_by_sender_removes_receiver_incoming() {
    let h = harness();
    let (alice_item, _) = h.send("buy milk").await;

    let completed = h.manager.complete("alice", &alice_item).await.unwrap();
    assert_eq!(completed.list, ListKind::Outgoing);
    assert_eq!(completed.foreign_list, Some(ListKind::Incoming));
    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_complete_unknown_item_is_not_found() {
    let h = harness();
    let err = h.manager.complete("alice", "nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_user_fault());
}

#[tokio::test]
async fn test_complete_reports_counterpart_cleanup_failure_as_warning() {
    let h = harness();
    let (alice_item, _) = h.send("buy milk").await;
    h.kv.fail_on(KvOp::CompareAndSet, "order_bob_in");

    let completed = h.manager.complete("alice", &alice_item).await.unwrap();
    assert_eq!(completed.warnings.len(), 1);
    assert_eq!(completed.warnings[0].step, "remove_foreign_reference");

    h.kv.clear_failures();
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
}

#[tokio::test]
async fn test_remove_by_receiver_is_decline() {
    let h = harness();
    let (_, bob_item) = h.send("buy milk").await;

    let removed = h.manager.remove("bob", &bob_item).await.unwrap();
    assert!(removed.counterpart_sent);
    assert_eq!(removed.list, ListKind::Incoming);
    assert_eq!(removed.foreign_user.as_deref(), Some("alice"));
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_remove_by_sender_is_not_decline() {
    let h = harness();
    let (alice_item, _) = h.send("buy milk").await;

    let removed = h.manager.remove("alice", &alice_item).await.unwrap();
    assert!(!removed.counterpart_sent);
    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
}

#[tokio::test]
async fn test_remove_unlinked_item() {
    let h = harness();
    let item = h.manager.add("alice", "solo", "", "").await.unwrap();

    let removed = h.manager.remove("alice", &item.id).await.unwrap();
    assert_eq!(removed.item.unwrap().title, "solo");
    assert_eq!(removed.foreign_user, None);
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_remove_warns_when_item_delete_fails() {
    let h = harness();
    let item = h.manager.add("alice", "sticky", "", "").await.unwrap();
    h.kv.fail_on(KvOp::Delete, "item_");

    let removed = h.manager.remove("alice", &item.id).await.unwrap();
    assert!(removed.item.is_none());
    assert_eq!(removed.warnings.len(), 1);
    assert_eq!(removed.warnings[0].step, "remove_item");
    assert!(h.titles("alice", ListKind::Own).await.is_empty());
}

#[tokio::test]
async fn test_pop_takes_top_of_own_list() {
    let h = harness();
    h.manager.add("alice", "first", "", "").await.unwrap();
    h.manager.add("alice", "second", "", "").await.unwrap();

    let popped = h.manager.pop("alice").await.unwrap();
    assert_eq!(popped.item.unwrap().title, "first");
    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["second"]);
}

#[tokio::test]
async fn test_pop_accepted_item_removes_sender_copy() {
    let h = harness();
    let (_, bob_item) = h.send("buy milk").await;
    h.manager.accept("bob", &bob_item).await.unwrap();

    let popped = h.manager.pop("bob").await.unwrap();
    assert_eq!(popped.foreign_user.as_deref(), Some("alice"));
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert_eq!(h.item_count().await, 0);
}

#[tokio::test]
async fn test_pop_empty_list() {
    let h = harness();
    let err = h.manager.pop("alice").await.unwrap_err();
    assert!(matches!(err, Error::EmptyList(_)));
}

// ============================================================================
// EDIT / BUMP
// ============================================================================

#[tokio::test]
async fn test_edit_updates_both_copies() {
    let h = harness();
    let (alice_item, bob_item) = h.send("buy milk").await;

    let edited = h
        .manager
        .edit("alice", &alice_item, "buy oat milk", "two cartons")
        .await
        .unwrap();
    assert_eq!(edited.old_title, "buy milk");
    assert_eq!(edited.list, ListKind::Outgoing);
    assert_eq!(edited.foreign_user.as_deref(), Some("bob"));

    let bob_copy = h.store.items.get(&bob_item).await.unwrap();
    assert_eq!(bob_copy.title, "buy oat milk");
    assert_eq!(bob_copy.description, "two cartons");
}

#[tokio::test]
async fn test_edit_unlinked_item_reports_old_title() {
    let h = harness();
    let item = h.manager.add("alice", "draft", "", "").await.unwrap();

    let edited = h.manager.edit("alice", &item.id, "final", "").await.unwrap();
    assert_eq!(edited.old_title, "draft");
    assert_eq!(edited.foreign_user, None);
    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["final"]);
}

#[tokio::test]
async fn test_edit_missing_reference_is_not_found() {
    let h = harness();
    let err = h.manager.edit("alice", "nope", "x", "").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_bump_moves_receiver_copy_to_front() {
    let h = harness();
    h.manager.send("alice", "bob", "first", "", "").await.unwrap();
    let (alice_second, bob_second) = h.send("second").await;

    let bumped = h.manager.bump("alice", &alice_second).await.unwrap();
    assert_eq!(bumped.title, "second");
    assert_eq!(bumped.foreign_user, "bob");
    assert_eq!(bumped.foreign_item_id, bob_second);
    assert_eq!(
        h.titles("bob", ListKind::Incoming).await,
        vec!["second", "first"]
    );
}

#[tokio::test]
async fn test_bump_requires_outgoing_item() {
    let h = harness();
    let item = h.manager.add("alice", "mine", "", "").await.unwrap();
    let err = h.manager.bump("alice", &item.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_bump_missing_counterpart_changes_nothing() {
    let h = harness();
    h.manager.send("alice", "bob", "first", "", "").await.unwrap();
    let (alice_second, bob_second) = h.send("second").await;
    h.store.items.remove(&bob_second).await.unwrap();

    let err = h.manager.bump("alice", &alice_second).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let order: Vec<String> = h
        .store
        .references
        .list_all("bob", ListKind::Incoming)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.item_id)
        .collect();
    assert_eq!(order[1], bob_second);
}

// ============================================================================
// REASSIGN
// ============================================================================

#[tokio::test]
async fn test_reassign_own_item_to_other_user() {
    let h = harness();
    let item = h.manager.add("alice", "report", "", "").await.unwrap();

    let reassigned = h.manager.reassign(&item.id, "alice", "carol").await.unwrap();
    assert_eq!(reassigned.title, "report");
    assert_eq!(reassigned.previous_foreign_user, None);

    assert!(h.titles("alice", ListKind::Own).await.is_empty());
    assert_eq!(h.titles("alice", ListKind::Outgoing).await, vec!["report"]);
    let incoming = h.manager.get_list("carol", ListKind::Incoming).await.unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(Some(incoming[0].item.id.clone()), reassigned.receiver_item_id);
    assert_eq!(incoming[0].foreign_user, "Alice");
}

#[tokio::test]
async fn test_reassign_sent_item_to_someone_else() {
    let h = harness();
    let (alice_item, _) = h.send("report").await;

    let reassigned = h.manager.reassign(&alice_item, "alice", "carol").await.unwrap();
    assert_eq!(reassigned.previous_foreign_user.as_deref(), Some("bob"));

    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
    assert_eq!(h.titles("carol", ListKind::Incoming).await, vec!["report"]);
    let outgoing = h.manager.get_list("alice", ListKind::Outgoing).await.unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].foreign_user, "Carol");
    // alice's item, carol's copy
    assert_eq!(h.item_count().await, 2);
}

#[tokio::test]
async fn test_reassign_sent_item_back_to_self() {
    let h = harness();
    let (alice_item, _) = h.send("report").await;

    let reassigned = h.manager.reassign(&alice_item, "alice", "alice").await.unwrap();
    assert_eq!(reassigned.previous_foreign_user.as_deref(), Some("bob"));
    assert_eq!(reassigned.receiver_item_id, None);

    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert!(h.titles("bob", ListKind::Incoming).await.is_empty());
    let located = h
        .store
        .references
        .locate("alice", &alice_item)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(located.list, ListKind::Own);
    assert_eq!(located.reference.foreign_user(), None);
}

#[tokio::test]
async fn test_reassign_back_to_self_restores_outgoing_when_own_list_fails() {
    let h = harness();
    let (alice_item, _) = h.send("report").await;
    h.kv.fail_on_key(KvOp::CompareAndSet, "order_alice");

    let err = h
        .manager
        .reassign(&alice_item, "alice", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    h.kv.clear_failures();
    assert_eq!(h.titles("alice", ListKind::Outgoing).await, vec!["report"]);
    assert!(h.titles("alice", ListKind::Own).await.is_empty());
    let located = h
        .store
        .references
        .locate("alice", &alice_item)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(located.list, ListKind::Outgoing);
    assert_eq!(located.reference.foreign_user(), Some("bob"));
}

#[tokio::test]
async fn test_reassign_own_item_to_self_is_noop() {
    let h = harness();
    let item = h.manager.add("alice", "report", "", "").await.unwrap();

    let reassigned = h.manager.reassign(&item.id, "alice", "alice").await.unwrap();
    assert_eq!(reassigned.title, "report");
    assert_eq!(reassigned.previous_foreign_user, None);
    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["report"]);
}

#[tokio::test]
async fn test_reassign_rejects_incoming_and_accepted_items() {
    let h = harness();
    let (_, bob_item) = h.send("report").await;

    let err = h.manager.reassign(&bob_item, "bob", "carol").await.unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));

    h.manager.accept("bob", &bob_item).await.unwrap();
    let err = h.manager.reassign(&bob_item, "bob", "carol").await.unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
    assert_eq!(h.titles("bob", ListKind::Own).await, vec!["report"]);
}

#[tokio::test]
async fn test_reassign_failure_restores_own_reference() {
    let h = harness();
    let item = h.manager.add("alice", "report", "", "").await.unwrap();
    h.kv.fail_on(KvOp::CompareAndSet, "order_carol_in");

    assert!(h.manager.reassign(&item.id, "alice", "carol").await.is_err());

    h.kv.clear_failures();
    assert_eq!(h.titles("alice", ListKind::Own).await, vec!["report"]);
    assert!(h.titles("alice", ListKind::Outgoing).await.is_empty());
    assert_eq!(h.item_count().await, 1);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_operations_survive_transient_cas_conflicts() {
    let h = harness();
    h.kv.force_conflicts(2);
    let (_, bob_item) = h.send("buy milk").await;

    h.kv.force_conflicts(2);
    h.manager.accept("bob", &bob_item).await.unwrap();
    assert_eq!(h.titles("bob", ListKind::Own).await, vec!["buy milk"]);
}
