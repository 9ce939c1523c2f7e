//! Observations and round records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Action, Pose};

// ─────────────────────────────────────────────────────────────────────────────
// Observation
// ─────────────────────────────────────────────────────────────────────────────

/// One object reported by the vision collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, e.g. `"banana"`.
    pub label: String,
    /// Bounding-box centre in pixels, `(0, 0)` at the top-left corner.
    pub center_px: (u32, u32),
    /// Estimated distance to the object in metres.
    pub distance_m: f32,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You detected {} at coordinates ({}, {}) with a depth of {:.2} meters.",
            self.label, self.center_px.0, self.center_px.1, self.distance_m
        )
    }
}

/// What the robot saw in one camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub detections: Vec<Detection>,
    /// Free-text description; when empty, [`Observation::summary`] derives
    /// one from the detections.
    #[serde(default)]
    pub description: String,
}

impl Observation {
    /// An observation with nothing detected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.detections.iter().map(|d| d.label.as_str()).collect()
    }

    /// Text handed to the decision collaborator and written to the round log.
    pub fn summary(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.trim().to_string();
        }
        if self.detections.is_empty() {
            return "No objects detected in the image.".to_string();
        }
        self.detections
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RoundRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Which control loop produced a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundSource {
    /// The autonomous perceive–decide–act loop.
    Autonomous,
    /// A user feedback request that preempted the autonomous loop.
    Feedback,
}

/// The decision taken in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub initial_pose: Pose,
    pub actions: Vec<Action>,
    pub new_pose: Pose,
    pub rationale: String,
}

/// One completed round. Records are append-only: once written they are only
/// ever read (by later decisions and by the round log).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: Uuid,
    /// 1-based position of this record in the round memory.
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    pub source: RoundSource,
    pub observation: Observation,
    /// Feedback text active during this round, if any.
    pub feedback: Option<String>,
    pub decision: DecisionSummary,
}

impl RoundRecord {
    /// Create a record with a fresh id and the current UTC time.
    ///
    /// `round` is assigned by the memory store on append.
    pub fn new(
        source: RoundSource,
        observation: Observation,
        feedback: Option<String>,
        decision: DecisionSummary,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            round: 0,
            timestamp: Utc::now(),
            source,
            observation,
            feedback,
            decision,
        }
    }

    /// Comma-separated action labels, `"None"` when empty.
    pub fn action_text(&self) -> String {
        if self.decision.actions.is_empty() {
            "None".to_string()
        } else {
            self.decision
                .actions
                .iter()
                .map(|a| a.label())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Heading;

    fn sample_record() -> RoundRecord {
        RoundRecord::new(
            RoundSource::Autonomous,
            Observation {
                detections: vec![Detection {
                    label: "banana".to_string(),
                    center_px: (640, 360),
                    distance_m: 2.5,
                }],
                description: String::new(),
            },
            None,
            DecisionSummary {
                initial_pose: Pose::new(0, 0, Heading::North),
                actions: vec![Action::MoveForward, Action::MoveForward],
                new_pose: Pose::new(0, 2, Heading::North),
                rationale: "banana centred ahead".to_string(),
            },
        )
    }

    #[test]
    fn summary_derives_sentences_from_detections() {
        let record = sample_record();
        assert_eq!(
            record.observation.summary(),
            "You detected banana at coordinates (640, 360) with a depth of 2.50 meters."
        );
    }

    #[test]
    fn summary_of_empty_observation() {
        assert_eq!(
            Observation::empty().summary(),
            "No objects detected in the image."
        );
    }

    #[test]
    fn labels_list_detections_in_order() {
        let mut obs = sample_record().observation;
        obs.detections.push(Detection {
            label: "chair".to_string(),
            center_px: (10, 10),
            distance_m: 1.0,
        });
        assert_eq!(obs.labels(), vec!["banana", "chair"]);
        assert!(Observation::empty().labels().is_empty());
    }

    #[test]
    fn explicit_description_wins() {
        let obs = Observation {
            detections: vec![],
            description: "  a kitchen counter  ".to_string(),
        };
        assert_eq!(obs.summary(), "a kitchen counter");
    }

    #[test]
    fn action_text_joins_labels() {
        let mut record = sample_record();
        assert_eq!(record.action_text(), "move forward, move forward");
        record.decision.actions.clear();
        assert_eq!(record.action_text(), "None");
    }

    #[test]
    fn record_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: RoundRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
