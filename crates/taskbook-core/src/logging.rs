//! Structured logging field name constants for taskbook.
//!
//! All crates use these names for structured `tracing` fields so logs can
//! be queried consistently across the store and the list manager.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Compensating rollback failed, data may be left inconsistent |
//! | WARN  | Secondary cleanup failed and was swallowed, CAS budget exhausted |
//! | INFO  | Lifecycle events (startup, backend selection) |
//! | DEBUG | CAS retries, decision points |
//! | TRACE | Per-reference iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "lists", "service", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "items", "references", "cas", "manager", "preferences"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "add_reference", "send", "reassign"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User whose list or item is being operated on.
pub const USER_ID: &str = "user_id";

/// Item ID being operated on.
pub const ITEM_ID: &str = "item_id";

/// Counterpart user of a linked item.
pub const FOREIGN_USER_ID: &str = "foreign_user_id";

/// Counterpart item of a linked item.
pub const FOREIGN_ITEM_ID: &str = "foreign_item_id";

/// List kind ("own", "incoming", "outgoing").
pub const LIST: &str = "list";

/// Raw key-value key.
pub const KEY: &str = "key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// One-based attempt number inside a compare-and-set retry loop.
pub const ATTEMPT: &str = "attempt";

/// Number of entries returned by a list read.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
