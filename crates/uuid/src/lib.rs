//! Record identifier utilities.
//!
//! Every persisted Klinik record (patient, queue entry, prescription, medicine order, login
//! attempt) is keyed by an opaque identifier issued once at creation time.
//!
//! Klinik uses a *canonical* textual form for identifiers: **32 lowercase hexadecimal
//! characters** (no hyphens). Both storage backends key rows/nodes by this text, so the same
//! identifier can be carried across API and CLI boundaries without normalisation.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers must already be canonical; use [`RecordId::parse`] to
//! validate them. Uppercase, hyphenated or truncated values are rejected rather than repaired.

mod service;

pub use service::{issue_identifier, RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
