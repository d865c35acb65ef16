//! Core types shared across ndiff facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: RunId, attached to every event of one reconciliation run
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: canonical event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
