//! Service facade over the list manager.
//!
//! [`TaskService`] runs a list operation and then publishes the
//! user-visible side effects of it on the [`EventBus`]: list refreshes for
//! every affected user, bot direct messages to the counterpart, and
//! replies in the thread an item was created from. It also owns the
//! preference and daily-reminder logic of the front end.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tracing::{debug, error, info};

use taskbook_core::defaults::{REMINDER_MIN_GAP_MS, SUMMARY_TIME_FORMAT};
use taskbook_core::{
    Accepted, Bumped, Completed, Edited, Error, EventBus, ExtendedItem, Item, ListKind,
    Notification, Popped, PreferenceStore, Reassigned, Removed, Result,
};

use crate::manager::ListManager;

/// Request to add an item, optionally sending it to another user.
#[derive(Debug, Clone, Default)]
pub struct AddRequest {
    pub message: String,
    pub description: String,
    /// Receiver user ID. Empty or the caller's own ID adds to the own list.
    pub send_to: Option<String>,
    /// Chat message the item was created from.
    pub post_id: String,
}

impl AddRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::InvalidInput("message is required".to_string()));
        }
        Ok(())
    }

    fn receiver(&self) -> Option<&str> {
        self.send_to.as_deref().filter(|s| !s.is_empty())
    }
}

/// What [`TaskService::add`] ended up doing.
#[derive(Debug, Clone)]
pub enum AddOutcome {
    /// Added to the caller's own list.
    Added(Item),
    /// Sent; carries the ID of the receiver's copy.
    Sent { receiver: String, item_id: String },
    /// The receiver blocks incoming items. Nothing was created.
    Blocked { receiver: String },
}

/// Daily reminder request attached to a list call.
#[derive(Debug, Clone, Copy)]
pub struct ReminderRequest {
    /// Caller's UTC offset; calendar days are compared in it.
    pub offset: FixedOffset,
    pub now: DateTime<Utc>,
}

impl ReminderRequest {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            now: Utc::now(),
        }
    }

    /// Build from a browser-style offset in minutes west of UTC
    /// (`Date.getTimezoneOffset()`).
    pub fn from_minutes_west(minutes: i32) -> Result<Self> {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::west_opt)
            .ok_or_else(|| {
                Error::InvalidInput(format!("timezone offset {} out of range", minutes))
            })?;
        Ok(Self::new(offset))
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// A reminder is due when at least an hour has passed since the last
    /// one and the calendar day differs.
    fn is_due(&self, last_millis: i64) -> bool {
        let now_millis = self.now.timestamp_millis();
        if now_millis.saturating_sub(last_millis) < REMINDER_MIN_GAP_MS {
            return false;
        }
        let Some(last) = self.offset.timestamp_millis_opt(last_millis).single() else {
            return true;
        };
        last.date_naive() != self.now.with_timezone(&self.offset).date_naive()
    }
}

/// A user's current settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub reminder: bool,
    pub allow_incoming: bool,
}

impl Settings {
    pub fn reminder_text(on: bool) -> &'static str {
        if on {
            "Reminder setting is set to `on`. **You will receive daily reminders.**"
        } else {
            "Reminder setting is set to `off`. **You will not receive daily reminders.**"
        }
    }

    pub fn allow_incoming_text(on: bool) -> &'static str {
        if on {
            "Allow incoming task requests setting is set to `on`. **Other users can send you task request that you can accept/decline.**"
        } else {
            "Allow incoming task requests setting is set to `off`. **Other users cannot send you task request. They will see a message saying you don't accept Book requests.**"
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current Settings:\n\n{}\n{}",
            Self::reminder_text(self.reminder),
            Self::allow_incoming_text(self.allow_incoming)
        )
    }
}

/// Render items as the bullet list used in reminders and list responses.
pub fn items_summary(items: &[ExtendedItem], offset: &FixedOffset) -> String {
    if items.is_empty() {
        return "Nothing to do!".to_string();
    }

    let mut out = String::from("\n\n");
    for extended in items {
        let created = offset
            .timestamp_millis_opt(extended.item.create_at)
            .single()
            .map(|t| t.format(SUMMARY_TIME_FORMAT).to_string())
            .unwrap_or_default();
        out.push_str(&format!("* {}\n  * ({})\n", extended.item.title, created));
    }
    out
}

/// List operations plus their notifications.
#[derive(Clone)]
pub struct TaskService {
    manager: Arc<ListManager>,
    preferences: Arc<dyn PreferenceStore>,
    events: EventBus,
}

impl TaskService {
    pub fn new(
        manager: Arc<ListManager>,
        preferences: Arc<dyn PreferenceStore>,
        events: EventBus,
    ) -> Self {
        Self {
            manager,
            preferences,
            events,
        }
    }

    pub fn manager(&self) -> &ListManager {
        &self.manager
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Add an item to the caller's list or send it to another user.
    pub async fn add(&self, user_id: &str, request: AddRequest) -> Result<AddOutcome> {
        request.validate()?;
        let sender_name = self.manager.user_name(user_id).await;

        let receiver = match request.receiver() {
            Some(receiver) if receiver != user_id => receiver.to_string(),
            _ => {
                let item = self
                    .manager
                    .add(
                        user_id,
                        &request.message,
                        &request.description,
                        &request.post_id,
                    )
                    .await?;
                self.events
                    .emit(Notification::refresh(user_id, &[ListKind::Own]));
                self.reply_if_needed(
                    &request.post_id,
                    format!("@{} attached a book to this thread", sender_name),
                    &request.message,
                );
                return Ok(AddOutcome::Added(item));
            }
        };

        let receiver_name = self.manager.user_name(&receiver).await;
        if !self.allows_incoming(&receiver).await {
            info!(
                subsystem = "lists",
                component = "service",
                user_id,
                foreign_user_id = %receiver,
                "Receiver blocks incoming items"
            );
            self.events.emit(Notification::direct(
                user_id,
                format!("@{} has blocked Book requests", receiver_name),
            ));
            return Ok(AddOutcome::Blocked { receiver });
        }

        let item_id = self
            .manager
            .send(
                user_id,
                &receiver,
                &request.message,
                &request.description,
                &request.post_id,
            )
            .await?;

        self.events
            .emit(Notification::refresh(user_id, &[ListKind::Outgoing]));
        self.events
            .emit(Notification::refresh(&receiver, &[ListKind::Incoming]));
        self.events.emit(Notification::direct_with_item(
            &receiver,
            format!("You have received a new Book from @{}", sender_name),
            &request.message,
            &item_id,
        ));
        self.reply_if_needed(
            &request.post_id,
            format!(
                "@{} sent @{} a book attached to this thread",
                sender_name, receiver_name
            ),
            &request.message,
        );

        Ok(AddOutcome::Sent { receiver, item_id })
    }

    /// Items of one list. With a reminder request, also posts the daily
    /// reminder when one is due.
    pub async fn list(
        &self,
        user_id: &str,
        list: ListKind,
        reminder: Option<ReminderRequest>,
    ) -> Result<Vec<ExtendedItem>> {
        let items = self.manager.get_list(user_id, list).await?;

        if let Some(reminder) = reminder {
            if !items.is_empty() && self.preferences.reminder_enabled(user_id).await {
                self.remind_if_due(user_id, &items, &reminder).await?;
            }
        }

        Ok(items)
    }

    async fn remind_if_due(
        &self,
        user_id: &str,
        items: &[ExtendedItem],
        reminder: &ReminderRequest,
    ) -> Result<()> {
        let last = self.preferences.last_reminder(user_id).await?;
        if !reminder.is_due(last) {
            debug!(
                subsystem = "lists",
                component = "service",
                user_id,
                last_reminder = last,
                "Daily reminder not due"
            );
            return Ok(());
        }

        self.events.emit(Notification::direct(
            user_id,
            format!(
                "Daily Reminder:\n\n{}",
                items_summary(items, &reminder.offset)
            ),
        ));
        if let Err(e) = self
            .preferences
            .save_last_reminder(user_id, reminder.now.timestamp_millis())
            .await
        {
            error!(
                subsystem = "lists",
                component = "service",
                user_id,
                error = %e,
                "Unable to save last reminder time"
            );
        }
        Ok(())
    }

    pub async fn accept(&self, user_id: &str, item_id: &str) -> Result<Accepted> {
        let accepted = self.manager.accept(user_id, item_id).await?;

        self.events.emit(Notification::refresh(
            user_id,
            &[ListKind::Own, ListKind::Incoming],
        ));
        if let Some(sender) = &accepted.sender {
            self.events
                .emit(Notification::refresh(sender, &[ListKind::Outgoing]));
            let name = self.manager.user_name(user_id).await;
            self.events.emit(Notification::direct(
                sender,
                format!("@{} accepted a Book you sent: {}", name, accepted.title),
            ));
        }

        Ok(accepted)
    }

    pub async fn complete(&self, user_id: &str, item_id: &str) -> Result<Completed> {
        let completed = self.manager.complete(user_id, item_id).await?;
        let name = self.manager.user_name(user_id).await;
        let (title, post_id) = title_and_post(completed.item.as_ref());

        self.events
            .emit(Notification::refresh(user_id, &[completed.list]));
        self.reply_if_needed(
            post_id,
            format!("@{} completed a book attached to this thread", name),
            title,
        );

        if let Some(foreign_user) = &completed.foreign_user {
            let list = completed.foreign_list.unwrap_or(ListKind::Outgoing);
            self.events
                .emit(Notification::refresh(foreign_user, &[list]));
            self.events.emit(Notification::direct(
                foreign_user,
                format!("@{} completed a Book you sent: {}", name, title),
            ));
        }

        Ok(completed)
    }

    pub async fn remove(&self, user_id: &str, item_id: &str) -> Result<Removed> {
        let removed = self.manager.remove(user_id, item_id).await?;
        let name = self.manager.user_name(user_id).await;
        let (title, post_id) = title_and_post(removed.item.as_ref());

        self.events
            .emit(Notification::refresh(user_id, &[removed.list]));
        self.reply_if_needed(
            post_id,
            format!("@{} removed a book attached to this thread", name),
            title,
        );

        if let Some(foreign_user) = &removed.foreign_user {
            let (list, message) = if removed.counterpart_sent {
                (
                    ListKind::Outgoing,
                    format!("@{} declined a Book you sent: {}", name, title),
                )
            } else {
                (
                    ListKind::Incoming,
                    format!("@{} removed a Book you received: {}", name, title),
                )
            };
            self.events
                .emit(Notification::refresh(foreign_user, &[list]));
            self.events
                .emit(Notification::direct(foreign_user, message));
        }

        Ok(removed)
    }

    pub async fn bump(&self, user_id: &str, item_id: &str) -> Result<Bumped> {
        let bumped = self.manager.bump(user_id, item_id).await?;

        self.events.emit(Notification::refresh(
            &bumped.foreign_user,
            &[ListKind::Incoming],
        ));
        let name = self.manager.user_name(user_id).await;
        self.events.emit(Notification::direct_with_item(
            &bumped.foreign_user,
            format!("@{} bumped a Book you received.", name),
            &bumped.title,
            &bumped.foreign_item_id,
        ));

        Ok(bumped)
    }

    pub async fn edit(
        &self,
        user_id: &str,
        item_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Edited> {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("message is required".to_string()));
        }
        let edited = self
            .manager
            .edit(user_id, item_id, title, description)
            .await?;

        self.events
            .emit(Notification::refresh(user_id, &[edited.list]));
        if let Some(foreign_user) = &edited.foreign_user {
            let lists: &[ListKind] = if edited.list == ListKind::Outgoing {
                &[ListKind::Own, ListKind::Incoming]
            } else {
                &[ListKind::Outgoing]
            };
            self.events.emit(Notification::refresh(foreign_user, lists));
            let name = self.manager.user_name(user_id).await;
            self.events.emit(Notification::direct(
                foreign_user,
                format!(
                    "@{} modified a Book from:\n{}\nTo:\n{}",
                    name, edited.old_title, title
                ),
            ));
        }

        Ok(edited)
    }

    pub async fn reassign(
        &self,
        user_id: &str,
        item_id: &str,
        new_owner: &str,
    ) -> Result<Reassigned> {
        let reassigned = self.manager.reassign(item_id, user_id, new_owner).await?;
        let name = self.manager.user_name(user_id).await;

        self.events.emit(Notification::refresh(
            user_id,
            &[ListKind::Own, ListKind::Outgoing],
        ));
        if let Some(receiver_item_id) = &reassigned.receiver_item_id {
            self.events
                .emit(Notification::refresh(new_owner, &[ListKind::Incoming]));
            self.events.emit(Notification::direct_with_item(
                new_owner,
                format!("You have received a new Book from @{}", name),
                &reassigned.title,
                receiver_item_id,
            ));
        }
        if let Some(previous) = &reassigned.previous_foreign_user {
            self.events.emit(Notification::refresh(
                previous,
                &[ListKind::Incoming, ListKind::Own],
            ));
            self.events.emit(Notification::direct(
                previous,
                format!("@{} removed you from Book:\n{}", name, reassigned.title),
            ));
        }

        Ok(reassigned)
    }

    pub async fn pop(&self, user_id: &str) -> Result<Popped> {
        let popped = self.manager.pop(user_id).await?;
        let name = self.manager.user_name(user_id).await;
        let (title, post_id) = title_and_post(popped.item.as_ref());

        if let Some(foreign_user) = &popped.foreign_user {
            self.events
                .emit(Notification::refresh(foreign_user, &[ListKind::Outgoing]));
            self.events.emit(Notification::direct(
                foreign_user,
                format!("@{} popped a Book you sent: {}", name, title),
            ));
        }
        self.events
            .emit(Notification::refresh(user_id, &[ListKind::Own]));
        self.reply_if_needed(
            post_id,
            format!("@{} popped a book attached to this thread", name),
            title,
        );

        Ok(popped)
    }

    pub async fn settings(&self, user_id: &str) -> Settings {
        Settings {
            reminder: self.preferences.reminder_enabled(user_id).await,
            allow_incoming: self.allows_incoming(user_id).await,
        }
    }

    pub async fn set_reminder(&self, user_id: &str, on: bool) -> Result<()> {
        self.preferences.set_reminder_enabled(user_id, on).await
    }

    pub async fn set_allow_incoming(&self, user_id: &str, on: bool) -> Result<()> {
        self.preferences.set_allow_incoming(user_id, on).await
    }

    /// Unreadable preferences allow incoming items.
    async fn allows_incoming(&self, user_id: &str) -> bool {
        match self.preferences.allow_incoming(user_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                error!(
                    subsystem = "lists",
                    component = "service",
                    user_id,
                    error = %e,
                    "Unable to read allow-incoming preference, allowing"
                );
                true
            }
        }
    }

    fn reply_if_needed(&self, post_id: &str, message: String, title: &str) {
        if post_id.is_empty() {
            return;
        }
        self.events.emit(Notification::ThreadReply {
            post_id: post_id.to_string(),
            message,
            title: title.to_string(),
        });
    }
}

fn title_and_post(item: Option<&Item>) -> (&str, &str) {
    item.map(|i| (i.title.as_str(), i.post_id.as_str()))
        .unwrap_or(("", ""))
}
