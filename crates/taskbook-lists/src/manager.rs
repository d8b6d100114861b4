//! List manager: cross-user operations over items and reference lists.
//!
//! An exchanged item exists as two item records (sender's and receiver's
//! copy) and two references (sender's outgoing, receiver's incoming) that
//! point at each other. There is no transaction spanning them, so every
//! operation orders its writes (create before link, unlink before delete)
//! and compensates on failure:
//!
//! - Errors of the primary mutation are returned to the caller.
//! - Failures of compensating rollback after a primary failure are logged
//!   at ERROR and not layered onto the returned error.
//! - Failures of secondary cleanup after the primary mutation succeeded are
//!   logged at WARN and returned as [`CleanupWarning`]s alongside success.

use std::sync::Arc;

use tracing::{debug, error, warn};

use taskbook_core::defaults::UNKNOWN_USER_NAME;
use taskbook_core::{
    Accepted, Bumped, CleanupWarning, Completed, Edited, Error, ExtendedItem, Item,
    ItemRepository, ListKind, Located, Popped, Reassigned, Reference, ReferenceStore, Removed,
    Result, UserDirectory,
};
use taskbook_store::Store;

/// Collects swallowed secondary-cleanup failures of one operation.
struct Cleanup {
    op: &'static str,
    warnings: Vec<CleanupWarning>,
}

impl Cleanup {
    fn new(op: &'static str) -> Self {
        Self {
            op,
            warnings: Vec::new(),
        }
    }

    fn note(&mut self, step: &'static str, target: &str, err: &Error) {
        warn!(
            subsystem = "lists",
            component = "manager",
            op = self.op,
            step,
            target,
            error = %err,
            "Cleanup failed after successful operation"
        );
        self.warnings.push(CleanupWarning {
            step,
            target: target.to_string(),
            error: err.to_string(),
        });
    }
}

/// Log a failed compensating rollback.
fn rollback_failed(op: &'static str, step: &'static str, target: &str, err: &Error) {
    error!(
        subsystem = "lists",
        component = "manager",
        op,
        step,
        target,
        error = %err,
        "Rollback failed, data may be left inconsistent"
    );
}

fn not_found(user_id: &str, item_id: &str) -> Error {
    Error::NotFound(format!("item {} in any list of {}", item_id, user_id))
}

/// Orchestrates the list operations users perform.
pub struct ListManager {
    items: Arc<dyn ItemRepository>,
    references: Arc<dyn ReferenceStore>,
    users: Arc<dyn UserDirectory>,
}

impl ListManager {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        references: Arc<dyn ReferenceStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            items,
            references,
            users,
        }
    }

    /// Build a manager over the repositories of a [`Store`].
    pub fn from_store(store: &Store, users: Arc<dyn UserDirectory>) -> Self {
        Self::new(store.items.clone(), store.references.clone(), users)
    }

    /// Create an item in the user's own list.
    pub async fn add(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
        post_id: &str,
    ) -> Result<Item> {
        let item = Item::new(title, description, post_id);
        self.items.save(&item).await?;

        if let Err(e) = self
            .references
            .add_reference(user_id, &item.id, ListKind::Own, "", "")
            .await
        {
            if let Err(rollback) = self.items.remove(&item.id).await {
                rollback_failed("add", "remove_item", &item.id, &rollback);
            }
            return Err(e);
        }

        Ok(item)
    }

    /// Send an item from `sender_id` to `receiver_id`. Returns the ID of the
    /// receiver's copy.
    pub async fn send(
        &self,
        sender_id: &str,
        receiver_id: &str,
        title: &str,
        description: &str,
        post_id: &str,
    ) -> Result<String> {
        let sender_item = Item::new(title, description, post_id);
        self.items.save(&sender_item).await?;

        let receiver_item = sender_item.duplicate();
        if let Err(e) = self.items.save(&receiver_item).await {
            self.rollback_items("send", &[&sender_item.id]).await;
            return Err(e);
        }

        if let Err(e) = self
            .references
            .add_reference(
                sender_id,
                &sender_item.id,
                ListKind::Outgoing,
                receiver_id,
                &receiver_item.id,
            )
            .await
        {
            self.rollback_items("send", &[&receiver_item.id, &sender_item.id])
                .await;
            return Err(e);
        }

        if let Err(e) = self
            .references
            .add_reference(
                receiver_id,
                &receiver_item.id,
                ListKind::Incoming,
                sender_id,
                &sender_item.id,
            )
            .await
        {
            if let Err(rollback) = self
                .references
                .remove_reference(sender_id, &sender_item.id, ListKind::Outgoing)
                .await
            {
                rollback_failed("send", "remove_sender_reference", &sender_item.id, &rollback);
            }
            self.rollback_items("send", &[&receiver_item.id, &sender_item.id])
                .await;
            return Err(e);
        }

        Ok(receiver_item.id)
    }

    /// Items of one list in order, enriched with their counterpart's
    /// whereabouts. Items that fail to load are skipped.
    pub async fn get_list(&self, user_id: &str, list: ListKind) -> Result<Vec<ExtendedItem>> {
        let references = self.references.list_all(user_id, list).await?;

        let mut extended = Vec::with_capacity(references.len());
        for reference in &references {
            let item = match self.items.get(&reference.item_id).await {
                Ok(item) => item,
                Err(e) => {
                    debug!(
                        subsystem = "lists",
                        component = "manager",
                        user_id,
                        item_id = %reference.item_id,
                        error = %e,
                        "Skipping item that failed to load"
                    );
                    continue;
                }
            };
            extended.push(self.extend(item, reference).await);
        }

        debug!(
            subsystem = "lists",
            component = "manager",
            user_id,
            %list,
            result_count = extended.len(),
            "Loaded list"
        );
        Ok(extended)
    }

    /// Complete an item from whichever list holds it, removing the
    /// counterpart's copy as well when linked.
    pub async fn complete(&self, user_id: &str, item_id: &str) -> Result<Completed> {
        let located = self
            .references
            .locate(user_id, item_id)
            .await?
            .ok_or_else(|| not_found(user_id, item_id))?;

        self.references
            .remove_reference(user_id, item_id, located.list)
            .await?;

        let mut cleanup = Cleanup::new("complete");
        let mut item = self.take_item(item_id, &mut cleanup).await;

        let mut foreign_list = None;
        if let Some((foreign_user, foreign_item)) = linked(&located.reference) {
            let (list, foreign) = self
                .sever_counterpart(foreign_user, foreign_item, &mut cleanup)
                .await;
            foreign_list = list;
            item = item.or(foreign);
        }

        Ok(Completed {
            item,
            foreign_user: located.reference.foreign_user().map(str::to_string),
            list: located.list,
            foreign_list,
            warnings: cleanup.warnings,
        })
    }

    /// Remove or decline an item, removing the counterpart's copy as well
    /// when linked.
    pub async fn remove(&self, user_id: &str, item_id: &str) -> Result<Removed> {
        let located = self
            .references
            .locate(user_id, item_id)
            .await?
            .ok_or_else(|| not_found(user_id, item_id))?;

        self.references
            .remove_reference(user_id, item_id, located.list)
            .await?;

        let mut cleanup = Cleanup::new("remove");
        let mut item = self.take_item(item_id, &mut cleanup).await;

        let mut counterpart_sent = false;
        if let Some((foreign_user, foreign_item)) = linked(&located.reference) {
            let (list, foreign) = self
                .sever_counterpart(foreign_user, foreign_item, &mut cleanup)
                .await;
            counterpart_sent = list == Some(ListKind::Outgoing);
            item = item.or(foreign);
        }

        Ok(Removed {
            item,
            foreign_user: located.reference.foreign_user().map(str::to_string),
            counterpart_sent,
            list: located.list,
            warnings: cleanup.warnings,
        })
    }

    /// Move an item from the incoming list to the own list, keeping its
    /// link to the sender.
    pub async fn accept(&self, user_id: &str, item_id: &str) -> Result<Accepted> {
        let (reference, _) = self
            .references
            .find_reference(user_id, item_id, ListKind::Incoming)
            .await?;
        let item = self.items.get(item_id).await?;

        self.references
            .add_reference(
                user_id,
                item_id,
                ListKind::Own,
                &reference.foreign_user_id,
                &reference.foreign_item_id,
            )
            .await?;

        if let Err(e) = self
            .references
            .remove_reference(user_id, item_id, ListKind::Incoming)
            .await
        {
            if let Err(rollback) = self
                .references
                .remove_reference(user_id, item_id, ListKind::Own)
                .await
            {
                rollback_failed("accept", "remove_own_reference", item_id, &rollback);
            }
            return Err(e);
        }

        Ok(Accepted {
            title: item.title,
            sender: reference.foreign_user().map(str::to_string),
        })
    }

    /// Change an item's title and description, mirroring the change onto
    /// the counterpart's copy when linked.
    pub async fn edit(
        &self,
        user_id: &str,
        item_id: &str,
        new_title: &str,
        new_description: &str,
    ) -> Result<Edited> {
        let located = self
            .references
            .locate(user_id, item_id)
            .await?
            .ok_or_else(|| not_found(user_id, item_id))?;

        let mut item = self.items.get(item_id).await?;
        let old_title = std::mem::replace(&mut item.title, new_title.to_string());
        item.description = new_description.to_string();
        self.items.save(&item).await?;

        let mut cleanup = Cleanup::new("edit");
        if let Some(foreign_item_id) = located.reference.foreign_item() {
            match self.items.get(foreign_item_id).await {
                Ok(mut foreign) => {
                    foreign.title = new_title.to_string();
                    foreign.description = new_description.to_string();
                    if let Err(e) = self.items.save(&foreign).await {
                        cleanup.note("save_foreign_item", foreign_item_id, &e);
                    }
                }
                Err(e) => cleanup.note("load_foreign_item", foreign_item_id, &e),
            }
        }

        Ok(Edited {
            foreign_user: located.reference.foreign_user().map(str::to_string),
            list: located.list,
            old_title,
            warnings: cleanup.warnings,
        })
    }

    /// Move the receiver's copy of an item the user sent to the top of the
    /// receiver's incoming list.
    pub async fn bump(&self, user_id: &str, item_id: &str) -> Result<Bumped> {
        let (reference, _) = self
            .references
            .find_reference(user_id, item_id, ListKind::Outgoing)
            .await?;

        let (foreign_user, foreign_item_id) = linked(&reference).ok_or_else(|| {
            Error::NotFound(format!("counterpart of item {} sent by {}", item_id, user_id))
        })?;
        let foreign = self.items.get(foreign_item_id).await?;

        self.references
            .bump_to_front(foreign_user, foreign_item_id, ListKind::Incoming)
            .await?;

        Ok(Bumped {
            title: foreign.title,
            foreign_user: foreign_user.to_string(),
            foreign_item_id: foreign_item_id.to_string(),
        })
    }

    /// Hand an item the user owns or sent to `new_owner`.
    ///
    /// Any existing link is severed first. Reassigning a sent item to
    /// oneself turns it back into an own item; reassigning to someone else
    /// sends a fresh copy to them. Incoming items and accepted items (own
    /// items that still carry a link) cannot be reassigned.
    pub async fn reassign(
        &self,
        item_id: &str,
        user_id: &str,
        new_owner: &str,
    ) -> Result<Reassigned> {
        let item = self.items.get(item_id).await?;
        let Located {
            list, reference, ..
        } = self
            .references
            .locate(user_id, item_id)
            .await?
            .ok_or_else(|| not_found(user_id, item_id))?;

        if list == ListKind::Incoming
            || (list == ListKind::Own && reference.foreign_item().is_some())
        {
            return Err(Error::InvalidOperation(format!(
                "item {} in {} list is not owned by {}",
                item_id, list, user_id
            )));
        }

        let mut cleanup = Cleanup::new("reassign");
        let previous_foreign_user = reference.foreign_user().map(str::to_string);

        if let Some(foreign_user) = reference.foreign_user() {
            let foreign_item_id = reference.foreign_item().unwrap_or_default();
            let foreign = self
                .references
                .locate(foreign_user, foreign_item_id)
                .await?
                .ok_or_else(|| not_found(foreign_user, foreign_item_id))?;
            self.references
                .remove_reference(foreign_user, foreign_item_id, foreign.list)
                .await?;
            if let Err(e) = self.items.remove(foreign_item_id).await {
                cleanup.note("remove_foreign_item", foreign_item_id, &e);
            }
        }

        if user_id == new_owner {
            if list == ListKind::Outgoing {
                self.references
                    .remove_reference(user_id, item_id, ListKind::Outgoing)
                    .await?;
                if let Err(e) = self
                    .references
                    .add_reference(user_id, item_id, ListKind::Own, "", "")
                    .await
                {
                    self.restore_outgoing(user_id, &reference).await;
                    return Err(e);
                }
            } else {
                debug!(
                    subsystem = "lists",
                    component = "manager",
                    user_id,
                    item_id,
                    "Item already owned by its new owner, nothing to reassign"
                );
            }
            return Ok(Reassigned {
                title: item.title,
                previous_foreign_user,
                receiver_item_id: None,
                warnings: cleanup.warnings,
            });
        }

        self.references
            .remove_reference(user_id, item_id, list)
            .await?;

        let receiver_item = item.duplicate();
        if let Err(e) = self.items.save(&receiver_item).await {
            self.restore_own(user_id, item_id).await;
            return Err(e);
        }

        if let Err(e) = self
            .references
            .add_reference(
                user_id,
                item_id,
                ListKind::Outgoing,
                new_owner,
                &receiver_item.id,
            )
            .await
        {
            self.rollback_items("reassign", &[&receiver_item.id]).await;
            self.restore_own(user_id, item_id).await;
            return Err(e);
        }

        if let Err(e) = self
            .references
            .add_reference(
                new_owner,
                &receiver_item.id,
                ListKind::Incoming,
                user_id,
                item_id,
            )
            .await
        {
            if let Err(rollback) = self
                .references
                .remove_reference(user_id, item_id, ListKind::Outgoing)
                .await
            {
                rollback_failed("reassign", "remove_sender_reference", item_id, &rollback);
            }
            self.rollback_items("reassign", &[&receiver_item.id]).await;
            self.restore_own(user_id, item_id).await;
            return Err(e);
        }

        Ok(Reassigned {
            title: item.title,
            previous_foreign_user,
            receiver_item_id: Some(receiver_item.id),
            warnings: cleanup.warnings,
        })
    }

    /// Remove the top item of the user's own list.
    pub async fn pop(&self, user_id: &str) -> Result<Popped> {
        let reference = self.references.pop_front(user_id, ListKind::Own).await?;

        let mut cleanup = Cleanup::new("pop");
        let mut item = self.take_item(&reference.item_id, &mut cleanup).await;

        if let Some((foreign_user, foreign_item)) = linked(&reference) {
            let (_, foreign) = self
                .sever_counterpart(foreign_user, foreign_item, &mut cleanup)
                .await;
            item = item.or(foreign);
        }

        Ok(Popped {
            item,
            foreign_user: reference.foreign_user().map(str::to_string),
            warnings: cleanup.warnings,
        })
    }

    /// Display name of a user, or a placeholder when the lookup fails.
    pub async fn user_name(&self, user_id: &str) -> String {
        match self.users.display_name(user_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!(
                    subsystem = "lists",
                    component = "manager",
                    user_id,
                    error = %e,
                    "User lookup failed, using placeholder name"
                );
                UNKNOWN_USER_NAME.to_string()
            }
        }
    }

    async fn extend(&self, item: Item, reference: &Reference) -> ExtendedItem {
        let mut extended = ExtendedItem::from(item);
        let Some((foreign_user, foreign_item)) = linked(reference) else {
            return extended;
        };

        if let Ok(Some(located)) = self.references.locate(foreign_user, foreign_item).await {
            extended.foreign_list = located.list.flag().to_string();
            extended.foreign_position = located.position;
        }
        extended.foreign_user = self.user_name(foreign_user).await;
        extended
    }

    /// Delete an item whose reference is already gone.
    async fn take_item(&self, item_id: &str, cleanup: &mut Cleanup) -> Option<Item> {
        match self.items.get_and_remove(item_id).await {
            Ok(item) => Some(item),
            Err(e) => {
                cleanup.note("remove_item", item_id, &e);
                None
            }
        }
    }

    /// Remove the counterpart's reference and item after the local side
    /// is gone. Returns the list the counterpart's reference was in and
    /// the counterpart's item, when they could be found.
    async fn sever_counterpart(
        &self,
        foreign_user: &str,
        foreign_item_id: &str,
        cleanup: &mut Cleanup,
    ) -> (Option<ListKind>, Option<Item>) {
        let list = match self.references.locate(foreign_user, foreign_item_id).await {
            Ok(Some(located)) => {
                if let Err(e) = self
                    .references
                    .remove_reference(foreign_user, foreign_item_id, located.list)
                    .await
                {
                    cleanup.note("remove_foreign_reference", foreign_item_id, &e);
                }
                Some(located.list)
            }
            Ok(None) => {
                cleanup.note(
                    "locate_foreign_reference",
                    foreign_item_id,
                    &not_found(foreign_user, foreign_item_id),
                );
                None
            }
            Err(e) => {
                cleanup.note("locate_foreign_reference", foreign_item_id, &e);
                None
            }
        };

        let item = match self.items.get_and_remove(foreign_item_id).await {
            Ok(item) => Some(item),
            Err(e) => {
                cleanup.note("remove_foreign_item", foreign_item_id, &e);
                None
            }
        };

        (list, item)
    }

    /// Delete items created by a failed operation, in the given order.
    async fn rollback_items(&self, op: &'static str, ids: &[&str]) {
        for id in ids {
            if let Err(e) = self.items.remove(id).await {
                rollback_failed(op, "remove_item", id, &e);
            }
        }
    }

    /// Put an item back into its owner's own list after a failed reassign
    /// already removed its reference.
    async fn restore_outgoing(&self, user_id: &str, reference: &Reference) {
        if let Err(e) = self
            .references
            .add_reference(
                user_id,
                &reference.item_id,
                ListKind::Outgoing,
                &reference.foreign_user_id,
                &reference.foreign_item_id,
            )
            .await
        {
            rollback_failed(
                "reassign",
                "restore_outgoing_reference",
                &reference.item_id,
                &e,
            );
        }
    }

    async fn restore_own(&self, user_id: &str, item_id: &str) {
        if let Err(e) = self
            .references
            .add_reference(user_id, item_id, ListKind::Own, "", "")
            .await
        {
            rollback_failed("reassign", "restore_own_reference", item_id, &e);
        }
    }
}

/// Counterpart user and item of a linked reference.
fn linked(reference: &Reference) -> Option<(&str, &str)> {
    Some((reference.foreign_user()?, reference.foreign_item()?))
}
