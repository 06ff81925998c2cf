//! YAML wire/boundary support for the EMR domain layer.
//!
//! This crate provides **wire models** and **translation helpers** for the on-disk files
//! the `emr` tool reads and writes:
//! - programme catalogues (programme, workflows, states)
//! - enrollment records (one patient's state history in one programme)
//! - cohort definitions
//!
//! Every wire struct uses `#[serde(deny_unknown_fields)]`, and schema errors carry the path
//! of the offending field. Domain rules are enforced by `emr-core` when the wire values
//! are translated, so a file that parses is also a valid domain value.

mod common;
pub mod cohort;
pub mod enrollment;
pub mod program;

// Re-export facades
pub use cohort::CohortDefinition;
pub use enrollment::EnrollmentRecord;
pub use program::ProgramDefinition;

use emr_core::EmrError;

/// Errors returned by the `emr-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    #[error(transparent)]
    Domain(#[from] EmrError),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;
