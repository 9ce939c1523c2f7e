//! Seams between the search runtime and the outside world.
//!
//! The scheduler never talks to a model, a detector or a parser directly; it
//! goes through these traits so any of them can be replaced by a fake in
//! tests or by an offline implementation on the robot.

use std::path::PathBuf;

use async_trait::async_trait;
use seekdog_hal::CameraFrame;
use seekdog_types::{Action, Observation, Pose, SeekError};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the decision collaborator gets to look at in one round.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Pose the robot believes it is in.
    pub pose: Pose,
    pub frame: CameraFrame,
    /// Name of the object being searched for.
    pub target: String,
    /// Free-form operator feedback, only set on the feedback path.
    pub feedback: Option<String>,
    /// Rendered round history.
    pub memory: String,
}

/// The collaborator's answer: what it saw, where it thinks the robot ends
/// up, and what to do to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub observation: Observation,
    pub new_pose: Pose,
    pub actions: Vec<Action>,
    pub rationale: String,
}

/// Perception plus decision for one round.
///
/// Implementations must be cancel-safe: the scheduler drops the returned
/// future when feedback interrupts the round.
#[async_trait]
pub trait Decider: Send + Sync {
    /// # Errors
    ///
    /// Any [`SeekError`]; the scheduler counts the round and keeps the pose.
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, SeekError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Landmark classification
// ─────────────────────────────────────────────────────────────────────────────

/// Decides whether operator feedback names a known landmark.
#[async_trait]
pub trait LandmarkClassifier: Send + Sync {
    async fn is_landmark_reference(&self, text: &str) -> Result<bool, SeekError>;

    /// The landmark name `text` refers to, if any. The name is looked up in
    /// the obstacle map afterwards, so it need not be canonical.
    async fn resolve_landmark(&self, text: &str) -> Result<Option<String>, SeekError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Perception
// ─────────────────────────────────────────────────────────────────────────────

/// Turns a camera frame into an [`Observation`].
pub trait Perception: Send + Sync {
    /// # Errors
    ///
    /// [`SeekError::Collaborator`] when the frame cannot be analysed.
    fn perceive(&self, frame: &CameraFrame) -> Result<Observation, SeekError>;
}

/// Sees nothing. Used when no detector is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPerception;

impl Perception for NullPerception {
    fn perceive(&self, _frame: &CameraFrame) -> Result<Observation, SeekError> {
        Ok(Observation::empty())
    }
}

/// Reads precomputed detections stored next to dataset images.
///
/// For a frame captured from `frames/0003.jpg` the observation is loaded
/// from `frames/0003.json`. Frames without a source file, or without a
/// sidecar, yield an empty observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarPerception;

impl SidecarPerception {
    fn sidecar_path(frame: &CameraFrame) -> Option<PathBuf> {
        frame.source.as_ref().map(|p| p.with_extension("json"))
    }
}

impl Perception for SidecarPerception {
    fn perceive(&self, frame: &CameraFrame) -> Result<Observation, SeekError> {
        let Some(path) = Self::sidecar_path(frame) else {
            return Ok(Observation::empty());
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no detection sidecar");
                return Ok(Observation::empty());
            }
            Err(e) => {
                return Err(SeekError::Collaborator(format!(
                    "reading {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&text)
            .map_err(|e| SeekError::Serialization(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seekdog_types::Detection;

    fn frame_from(path: PathBuf) -> CameraFrame {
        let mut frame = CameraFrame::blank(2, 2);
        frame.source = Some(path);
        frame
    }

    #[test]
    fn null_perception_sees_nothing() {
        let obs = NullPerception.perceive(&CameraFrame::blank(2, 2)).unwrap();
        assert!(obs.detections.is_empty());
    }

    #[test]
    fn sidecar_perception_loads_detections() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("0001.jpg");
        let obs = Observation {
            detections: vec![Detection {
                label: "banana".to_string(),
                center_px: (320, 240),
                distance_m: 1.5,
            }],
            description: String::new(),
        };
        std::fs::write(
            tmp.path().join("0001.json"),
            serde_json::to_string(&obs).unwrap(),
        )
        .unwrap();

        let seen = SidecarPerception.perceive(&frame_from(image)).unwrap();
        assert_eq!(seen, obs);
    }

    #[test]
    fn missing_sidecar_is_an_empty_observation() {
        let tmp = tempfile::tempdir().unwrap();
        let seen = SidecarPerception
            .perceive(&frame_from(tmp.path().join("0002.png")))
            .unwrap();
        assert_eq!(seen, Observation::empty());
        assert_eq!(
            SidecarPerception.perceive(&CameraFrame::blank(1, 1)).unwrap(),
            Observation::empty()
        );
    }

    #[test]
    fn malformed_sidecar_is_a_serialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0003.json"), "{not json").unwrap();
        let err = SidecarPerception
            .perceive(&frame_from(tmp.path().join("0003.jpg")))
            .unwrap_err();
        assert!(matches!(err, SeekError::Serialization(_)));
    }
}
