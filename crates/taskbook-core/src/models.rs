//! Data models for taskbook.
//!
//! Items are the task units themselves. References are the entries of a
//! user's three lists, each pointing at one item and optionally at the
//! counterpart item of another user when the item was exchanged.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// ITEMS
// =============================================================================

/// A task unit.
///
/// The wire layout (`id`, `title`, `description`, `create_at`, `post_id`)
/// is shared with data written by earlier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Creation time in epoch milliseconds.
    pub create_at: i64,
    /// Chat message this item was created from, empty if none.
    #[serde(default)]
    pub post_id: String,
}

impl Item {
    /// Create an item with a fresh ID and the current time.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        post_id: impl Into<String>,
    ) -> Self {
        Self {
            id: new_item_id(),
            title: title.into(),
            description: description.into(),
            create_at: Utc::now().timestamp_millis(),
            post_id: post_id.into(),
        }
    }

    /// A fresh copy with the same content and a new ID, used for the
    /// receiver's side of an exchange.
    pub fn duplicate(&self) -> Self {
        Self::new(
            self.title.clone(),
            self.description.clone(),
            self.post_id.clone(),
        )
    }
}

/// Generate an opaque item ID (UUIDv7, simple hex form).
pub fn new_item_id() -> String {
    Uuid::now_v7().simple().to_string()
}

// =============================================================================
// LISTS
// =============================================================================

/// One of the three lists every user has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Items the user owns, either added directly or accepted.
    Own,
    /// Items received from another user and not yet accepted.
    Incoming,
    /// Items the user sent to someone else.
    Outgoing,
}

impl ListKind {
    /// Search order used when locating an item across a user's lists.
    pub const SEARCH_ORDER: [ListKind; 3] =
        [ListKind::Own, ListKind::Outgoing, ListKind::Incoming];

    /// Suffix appended to the user ID in the list blob key.
    pub fn key_suffix(self) -> &'static str {
        match self {
            Self::Own => "",
            Self::Incoming => "_in",
            Self::Outgoing => "_out",
        }
    }

    /// Short flag shown to clients for the counterpart's list. The own list
    /// has no flag.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Own => "",
            Self::Incoming => "in",
            Self::Outgoing => "out",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Own => write!(f, "own"),
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

impl FromStr for ListKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "my" | "own" => Ok(Self::Own),
            "in" | "incoming" => Ok(Self::Incoming),
            "out" | "outgoing" => Ok(Self::Outgoing),
            _ => Err(Error::InvalidInput(format!("unknown list '{}'", s))),
        }
    }
}

/// An entry in a user's list.
///
/// Empty foreign fields mean the item is not linked to another user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "book_id", default)]
    pub item_id: String,
    #[serde(rename = "foreign_book_id", default)]
    pub foreign_item_id: String,
    #[serde(default)]
    pub foreign_user_id: String,
}

impl Reference {
    /// An unlinked reference.
    pub fn own(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Default::default()
        }
    }

    /// A reference linked to a counterpart item of another user.
    pub fn linked(
        item_id: impl Into<String>,
        foreign_user_id: impl Into<String>,
        foreign_item_id: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            foreign_item_id: foreign_item_id.into(),
            foreign_user_id: foreign_user_id.into(),
        }
    }

    pub fn foreign_user(&self) -> Option<&str> {
        Some(self.foreign_user_id.as_str()).filter(|s| !s.is_empty())
    }

    pub fn foreign_item(&self) -> Option<&str> {
        Some(self.foreign_item_id.as_str()).filter(|s| !s.is_empty())
    }
}

/// Where a reference was found across a user's lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub list: ListKind,
    pub reference: Reference,
    /// Zero-based index within the list.
    pub position: usize,
}

/// An item enriched with where its counterpart currently sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedItem {
    #[serde(flatten)]
    pub item: Item,
    /// Display name of the counterpart user, empty if unlinked.
    #[serde(rename = "user", default)]
    pub foreign_user: String,
    /// Flag of the counterpart's list (`""`, `"in"`, `"out"`).
    #[serde(rename = "list", default)]
    pub foreign_list: String,
    #[serde(rename = "position", default)]
    pub foreign_position: usize,
}

impl From<Item> for ExtendedItem {
    fn from(item: Item) -> Self {
        Self {
            item,
            foreign_user: String::new(),
            foreign_list: String::new(),
            foreign_position: 0,
        }
    }
}

// =============================================================================
// OPERATION OUTCOMES
// =============================================================================

/// A secondary cleanup step that failed after the primary mutation of an
/// operation succeeded. The operation still reports success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    /// Cleanup step, e.g. "remove_foreign_reference".
    pub step: &'static str,
    /// Item or key the step was operating on.
    pub target: String,
    pub error: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} failed: {}", self.step, self.target, self.error)
    }
}

/// Result of completing an item.
#[derive(Debug, Clone)]
pub struct Completed {
    /// The completed item. Falls back to the counterpart's copy when the
    /// local record could not be loaded.
    pub item: Option<Item>,
    pub foreign_user: Option<String>,
    /// List the item was completed from.
    pub list: ListKind,
    /// List the counterpart's reference was removed from, if it was found.
    pub foreign_list: Option<ListKind>,
    pub warnings: Vec<CleanupWarning>,
}

/// Result of removing or declining an item.
#[derive(Debug, Clone)]
pub struct Removed {
    pub item: Option<Item>,
    pub foreign_user: Option<String>,
    /// True when the counterpart is the one who sent the item, i.e. the
    /// caller declined it.
    pub counterpart_sent: bool,
    pub list: ListKind,
    pub warnings: Vec<CleanupWarning>,
}

/// Result of accepting an incoming item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub title: String,
    pub sender: Option<String>,
}

/// Result of editing an item.
#[derive(Debug, Clone)]
pub struct Edited {
    pub foreign_user: Option<String>,
    pub list: ListKind,
    pub old_title: String,
    pub warnings: Vec<CleanupWarning>,
}

/// Result of bumping a sent item to the top of the receiver's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bumped {
    pub title: String,
    pub foreign_user: String,
    pub foreign_item_id: String,
}

/// Result of reassigning an item.
#[derive(Debug, Clone)]
pub struct Reassigned {
    pub title: String,
    pub previous_foreign_user: Option<String>,
    /// ID of the copy created for the new owner, if one was sent.
    pub receiver_item_id: Option<String>,
    pub warnings: Vec<CleanupWarning>,
}

/// Result of popping the top of the own list.
#[derive(Debug, Clone)]
pub struct Popped {
    pub item: Option<Item>,
    pub foreign_user: Option<String>,
    pub warnings: Vec<CleanupWarning>,
}
