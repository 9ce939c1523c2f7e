//! `seekdog-types` – shared vocabulary of the SeekDog stack.
//!
//! Every other crate speaks in these types: the grid [`Pose`] and its
//! cardinal [`Heading`], the closed [`Action`] enumeration the robot can
//! execute, the [`Observation`] produced by the vision collaborator, and the
//! append-only [`RoundRecord`] written once per completed round.

pub mod action;
pub mod pose;
pub mod round;

pub use action::{Action, ActionKind, reduces_to_stop};
pub use pose::{Heading, Pose};
pub use round::{DecisionSummary, Detection, Observation, RoundRecord, RoundSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Global error type spanning boundary parsing, collaborator failures,
/// hardware faults and session lifecycle violations.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeekError {
    #[error("Invalid heading: {0} degrees is not a cardinal direction")]
    InvalidHeading(i32),

    #[error("Unknown action: '{0}'")]
    UnknownAction(String),

    #[error("Malformed pose: '{0}'")]
    MalformedPose(String),

    #[error("Collaborator Error: {0}")]
    Collaborator(String),

    #[error("Hardware Fault on {component}: {details}")]
    Hardware { component: String, details: String },

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Unknown landmark: '{0}'")]
    UnknownLandmark(String),

    #[error("Search session is no longer active")]
    SessionClosed,

    #[error("A feedback session is already open")]
    FeedbackBusy,

    #[error("The search is not waiting at a feedback checkpoint")]
    NoCheckpoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_error_display() {
        let err = SeekError::UnknownAction("jump".to_string());
        assert!(err.to_string().contains("jump"));

        let err2 = SeekError::Hardware {
            component: "sport_client".to_string(),
            details: "timeout".to_string(),
        };
        assert!(err2.to_string().contains("sport_client"));
    }

    #[test]
    fn seek_error_serializes() {
        let err = SeekError::InvalidHeading(45);
        let json = serde_json::to_string(&err).unwrap();
        let back: SeekError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
