//! Entity identifiers.
//!
//! Every EMR entity (programme, workflow, state, enrollment, cohort membership...) carries a
//! UUID that identifies it across systems. Identity-based equality and the final tie-break of
//! every ordering use this value.
//!
//! ## Canonical UUID form
//! - Length: 36
//! - Characters: lowercase hex digits separated by hyphens in the 8-4-4-4-12 layout
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! Canonical form is required for externally supplied identifiers (catalogue files, CLI
//! arguments). Use [`EntityUuid::parse`] to validate an input string. Uppercase, braced,
//! URN-prefixed or unhyphenated values are rejected rather than normalised.

mod entity;

pub use entity::{EntityUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
