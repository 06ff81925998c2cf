use chrono::{DateTime, Utc};
use emr_types::TextError;
use emr_uuid::{EntityUuid, UuidError};

fn describe_from(from: &Option<EntityUuid>) -> String {
    match from {
        Some(state) => format!("state {state}"),
        None => "no current state".into(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
    #[error("invalid UUID: {0}")]
    Uuid(#[from] UuidError),

    #[error("state {state} does not belong to any workflow of programme {program}")]
    UnknownWorkflow {
        state: EntityUuid,
        program: EntityUuid,
    },
    #[error("a change date is required to leave state {current}")]
    MissingTransitionDate { current: EntityUuid },
    #[error("cannot leave state {current}: it already ended on {end_date}")]
    CurrentStateAlreadyEnded {
        current: EntityUuid,
        end_date: DateTime<Utc>,
    },
    #[error("cannot leave state {current} on {on_date}: it started on {start_date}")]
    TransitionBeforeCurrentStart {
        current: EntityUuid,
        start_date: DateTime<Utc>,
        on_date: DateTime<Utc>,
    },
    #[error("illegal transition from {} to state {to}", describe_from(.from))]
    IllegalTransition {
        from: Option<EntityUuid>,
        to: EntityUuid,
    },

    #[error("duplicate allergen: {0}")]
    DuplicateAllergen(String),
}

pub type EmrResult<T> = std::result::Result<T, EmrError>;
