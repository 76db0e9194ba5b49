//! Approval state machines.
//!
//! Each machine is a pure function from `(current status, action)` to the
//! next status. Services load the row, ask the machine, then write the
//! result in a single guarded update.

pub mod drawing;
pub mod material;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} a {entity} in status {from}")]
    NotAllowed {
        entity: &'static str,
        action: &'static str,
        from: String,
    },

    #[error("{entity} is already in a terminal status ({status})")]
    Terminal {
        entity: &'static str,
        status: String,
    },

    #[error("stored {entity} status {value} is not recognised")]
    UnknownStatus { entity: &'static str, value: String },
}

impl TransitionError {
    pub(crate) fn unknown(entity: &'static str, value: &str) -> Self {
        TransitionError::UnknownStatus {
            entity,
            value: value.to_string(),
        }
    }
}
