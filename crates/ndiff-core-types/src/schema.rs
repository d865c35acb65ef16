//! Event names shared by every crate's log output
//!
//! Each structured event carries an `event` field set to one of these, so
//! log queries and tests can match on a stable name instead of a message.

// Operation lifecycle
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Per-window progress
pub const EVENT_WINDOW_FETCHED: &str = "window_fetched";
pub const EVENT_WINDOW_EMPTY: &str = "window_empty";
pub const EVENT_WINDOW_NO_DIFF: &str = "window_no_diff";
pub const EVENT_WINDOW_DIFF: &str = "window_diff";
pub const EVENT_WINDOW_PERSISTED: &str = "window_persisted";

// Run outcome
pub const EVENT_CANCELLED: &str = "cancelled";
pub const EVENT_RUN_FAILED: &str = "run_failed";
