//! Operator feedback that pre-empts the round loop.
//!
//! A [`FeedbackChannel`] opens a [`FeedbackSession`], which pauses the loop
//! and interrupts the current round. The session then either
//! [`submit`](FeedbackSession::submit)s one instruction or is cancelled.
//! Dropping it without submitting counts as a cancel, so the loop can never
//! be left paused.
//!
//! Submitted text takes one of two paths:
//!
//! - **Landmark** – the classifier says the text names a landmark in the
//!   map. The pathfinder plans a route from the current pose and the
//!   actuator drives it.
//! - **Free form** – anything else is passed, with a fresh frame, to the
//!   decision collaborator as feedback.
//!
//! Both paths commit a [`RoundSource::Feedback`] record.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use seekdog_nav::PathOutcome;
use seekdog_types::{DecisionSummary, Observation, Pose, RoundRecord, RoundSource, SeekError};
use tracing::{debug, info, instrument, warn};

use crate::collaborator::Decision;
use crate::scheduler::{SchedulerState, Shared};

/// What a submitted instruction did.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    Landmark {
        /// Canonical landmark name from the map.
        name: String,
        path: PathOutcome,
        new_pose: Pose,
    },
    FreeForm {
        decision: Decision,
        /// Pose adopted after correction.
        new_pose: Pose,
    },
}

impl FeedbackOutcome {
    pub fn new_pose(&self) -> Pose {
        match self {
            FeedbackOutcome::Landmark { new_pose, .. } | FeedbackOutcome::FreeForm { new_pose, .. } => {
                *new_pose
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FeedbackChannel
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable handle onto a running search.
#[derive(Clone)]
pub struct FeedbackChannel {
    shared: Arc<Shared>,
}

impl FeedbackChannel {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Pause the round loop and interrupt the current round.
    ///
    /// # Errors
    ///
    /// [`SeekError::SessionClosed`] after the search ended and
    /// [`SeekError::FeedbackBusy`] while another session is open.
    pub fn request_feedback(&self) -> Result<FeedbackSession, SeekError> {
        self.shared.signals.begin_feedback()?;
        self.shared.set_state(SchedulerState::AwaitingFeedback);
        info!(pose = %self.shared.current_pose(), "feedback requested");
        Ok(FeedbackSession {
            shared: Arc::clone(&self.shared),
            released: false,
        })
    }

    /// Request a session and submit `text` in one step.
    pub async fn send(&self, text: &str) -> Result<FeedbackOutcome, SeekError> {
        self.request_feedback()?.submit(text).await
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    pub fn current_pose(&self) -> Pose {
        self.shared.current_pose()
    }

    pub fn is_active(&self) -> bool {
        self.shared.signals.is_session_active()
    }

    /// The round the loop is parked before, if it is waiting at a feedback
    /// checkpoint.
    pub fn pending_checkpoint(&self) -> Option<u32> {
        self.shared.checkpoint_slot().as_ref().map(|c| c.round)
    }

    /// Answer the open checkpoint. Blank text, or `None`, lets the round run
    /// without feedback.
    ///
    /// # Errors
    ///
    /// [`SeekError::SessionClosed`] after the search ended and
    /// [`SeekError::NoCheckpoint`] when the loop is not waiting for an answer.
    pub fn answer_checkpoint(&self, feedback: Option<&str>) -> Result<u32, SeekError> {
        if !self.is_active() {
            return Err(SeekError::SessionClosed);
        }
        let checkpoint = self
            .shared
            .checkpoint_slot()
            .take()
            .ok_or(SeekError::NoCheckpoint)?;
        let feedback = feedback.map(str::trim).filter(|t| !t.is_empty());
        info!(round = checkpoint.round, answered = feedback.is_some(), "checkpoint answered");
        checkpoint
            .reply
            .send(feedback.map(str::to_string))
            .map_err(|_| SeekError::NoCheckpoint)?;
        Ok(checkpoint.round)
    }

    /// Names of the landmarks in the map.
    pub fn landmarks(&self) -> Vec<String> {
        self.shared.map.landmarks().keys().cloned().collect()
    }

    /// Plan a route from the current pose to landmark `name` without moving.
    ///
    /// # Errors
    ///
    /// [`SeekError::UnknownLandmark`] when the map has no such landmark.
    pub fn plan(&self, name: &str) -> Result<(String, PathOutcome), SeekError> {
        let (canonical, goal) = self
            .shared
            .map
            .landmark(name)
            .ok_or_else(|| SeekError::UnknownLandmark(name.trim().to_string()))?;
        let path = self
            .shared
            .pathfinder
            .find_path(self.shared.current_pose(), goal, &self.shared.map);
        Ok((canonical.to_string(), path))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FeedbackSession
// ─────────────────────────────────────────────────────────────────────────────

/// An open feedback window. The round loop stays paused until this is
/// submitted, cancelled or dropped.
pub struct FeedbackSession {
    shared: Arc<Shared>,
    released: bool,
}

impl FeedbackSession {
    /// Carry out `text` and release the round loop.
    ///
    /// On error nothing is committed and the pose is unchanged.
    pub async fn submit(mut self, text: &str) -> Result<FeedbackOutcome, SeekError> {
        let result = self.execute(text.trim()).await;
        self.release();
        result
    }

    /// Release the round loop without doing anything.
    pub fn cancel(mut self) {
        debug!("feedback cancelled");
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let resume = if self.shared.running.load(Ordering::SeqCst) {
            SchedulerState::RunningRound
        } else {
            SchedulerState::Idle
        };
        self.shared.set_state(resume);
        self.shared.signals.end_feedback();
    }

    #[instrument(skip(self))]
    async fn execute(&self, text: &str) -> Result<FeedbackOutcome, SeekError> {
        let shared = &self.shared;
        let _turn = shared.turn.lock().await;
        shared.set_state(SchedulerState::ExecutingFeedback);
        let start = shared.current_pose();

        if shared.classifier.is_landmark_reference(text).await? {
            let named = shared.classifier.resolve_landmark(text).await?;
            match named.as_deref().and_then(|n| shared.map.landmark(n)) {
                Some((name, goal)) => return Ok(self.go_to_landmark(text, name, start, goal).await),
                None => debug!(named = ?named, "no such landmark in map, treating as free-form"),
            }
        }

        let frame = shared.capture().await?;
        let request = shared.request(start, frame, Some(text.to_string()));
        let decision = shared.decide(request).await?;
        let new_pose = shared.corrected_pose(start, &decision);
        shared
            .commit(RoundRecord::new(
                RoundSource::Feedback,
                decision.observation.clone(),
                Some(text.to_string()),
                DecisionSummary {
                    initial_pose: start,
                    actions: decision.actions.clone(),
                    new_pose,
                    rationale: decision.rationale.clone(),
                },
            ))
            .await;
        info!(pose = %new_pose, "free-form feedback applied");
        Ok(FeedbackOutcome::FreeForm { decision, new_pose })
    }

    async fn go_to_landmark(&self, text: &str, name: &str, start: Pose, goal: Pose) -> FeedbackOutcome {
        let shared = &self.shared;
        let path = shared.pathfinder.find_path(start, goal, &shared.map);
        let new_pose = if path.is_reachable() {
            goal
        } else {
            warn!(landmark = name, from = %start, "landmark unreachable, staying put");
            start
        };
        shared
            .commit(RoundRecord::new(
                RoundSource::Feedback,
                Observation::empty(),
                Some(text.to_string()),
                DecisionSummary {
                    initial_pose: start,
                    actions: path.actions().to_vec(),
                    new_pose,
                    rationale: String::new(),
                },
            ))
            .await;
        info!(landmark = name, steps = path.actions().len(), pose = %new_pose, "moved to landmark");
        FeedbackOutcome::Landmark {
            name: name.to_string(),
            path,
            new_pose,
        }
    }
}

impl Drop for FeedbackSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use seekdog_nav::MapConfig;
    use seekdog_types::{Action, Heading};

    use super::*;
    use crate::scheduler::{CompletionReason, SchedulerConfig};
    use crate::testing::{Harness, ScriptedDecider, decision};

    fn harness() -> (Harness, Arc<ScriptedDecider>) {
        let decider = ScriptedDecider::new(Ok(decision(
            vec![Action::TurnLeft],
            Pose::new(0, 0, Heading::West),
        )));
        (Harness::new(SchedulerConfig::default(), Arc::<ScriptedDecider>::clone(&decider)), decider)
    }

    #[tokio::test]
    async fn landmark_feedback_drives_there() {
        let (h, decider) = harness();
        let channel = h.scheduler.feedback_channel();

        let outcome = channel.send("Please go to the refrigerator").await.unwrap();

        let FeedbackOutcome::Landmark { name, path, new_pose } = outcome else {
            panic!("expected landmark outcome");
        };
        assert_eq!(name, "refrigerator");
        assert_eq!(new_pose, Pose::new(3, 4, Heading::North));
        assert_eq!(channel.current_pose(), new_pose);
        assert_eq!(h.executed(), path.actions());
        assert_eq!(decider.calls(), 0);

        let record = h.scheduler.memory().last().unwrap();
        assert_eq!(record.source, RoundSource::Feedback);
        assert_eq!(record.feedback.as_deref(), Some("Please go to the refrigerator"));
        assert_eq!(record.decision.new_pose, new_pose);
    }

    #[tokio::test]
    async fn unreachable_landmark_leaves_pose_unchanged() {
        let map = MapConfig {
            border_radius: Some(4),
            obstacles: Default::default(),
            landmarks: [("vault".to_string(), Pose::new(10, 10, Heading::North))]
                .into_iter()
                .collect(),
        };
        let decider = ScriptedDecider::new(Ok(decision(vec![], Pose::default())));
        let h = Harness::new(
            SchedulerConfig {
                map,
                ..SchedulerConfig::default()
            },
            decider,
        );

        let outcome = h.scheduler.feedback_channel().send("go to the vault").await.unwrap();

        assert_eq!(
            outcome,
            FeedbackOutcome::Landmark {
                name: "vault".to_string(),
                path: PathOutcome::Unreachable,
                new_pose: Pose::default(),
            }
        );
        assert!(h.executed().is_empty());
        assert_eq!(h.scheduler.memory().len(), 1);
    }

    #[tokio::test]
    async fn landmark_at_current_pose_is_a_no_op() {
        let decider = ScriptedDecider::new(Ok(decision(vec![], Pose::default())));
        let h = Harness::new(
            SchedulerConfig {
                start_pose: Pose::new(0, 4, Heading::North),
                ..SchedulerConfig::default()
            },
            decider,
        );

        let outcome = h.scheduler.feedback_channel().send("kitchen").await.unwrap();

        assert!(matches!(
            outcome,
            FeedbackOutcome::Landmark { path: PathOutcome::AtGoal, .. }
        ));
        assert_eq!(outcome.new_pose(), Pose::new(0, 4, Heading::North));
    }

    #[tokio::test]
    async fn free_form_feedback_goes_to_decider() {
        let (h, decider) = harness();

        let outcome = h.scheduler.feedback_channel().send("  turn left  ").await.unwrap();

        assert!(matches!(outcome, FeedbackOutcome::FreeForm { .. }));
        assert_eq!(outcome.new_pose(), Pose::new(0, 0, Heading::West));
        assert_eq!(decider.feedbacks(), vec![Some("turn left".to_string())]);
        assert_eq!(h.executed(), vec![Action::TurnLeft]);
        let record = h.scheduler.memory().last().unwrap();
        assert_eq!(record.source, RoundSource::Feedback);
        assert_eq!(record.feedback.as_deref(), Some("turn left"));
    }

    #[tokio::test]
    async fn failed_free_form_feedback_commits_nothing() {
        let decider = ScriptedDecider::new(Err(SeekError::Collaborator("offline".to_string())));
        let h = Harness::new(SchedulerConfig::default(), decider);
        let channel = h.scheduler.feedback_channel();

        let err = channel.send("wiggle").await.unwrap_err();

        assert_eq!(err, SeekError::Collaborator("offline".to_string()));
        assert!(h.scheduler.memory().is_empty());
        assert_eq!(channel.current_pose(), Pose::default());
        assert!(h.scheduler.feedback_channel().request_feedback().is_ok());
    }

    #[tokio::test]
    async fn only_one_session_at_a_time() {
        let (h, _) = harness();
        let channel = h.scheduler.feedback_channel();

        let first = channel.request_feedback().unwrap();
        assert_eq!(channel.state(), SchedulerState::AwaitingFeedback);
        assert_eq!(
            channel.request_feedback().err(),
            Some(SeekError::FeedbackBusy)
        );

        first.cancel();
        assert_eq!(channel.state(), SchedulerState::Idle);
        assert!(channel.request_feedback().is_ok());
    }

    #[tokio::test]
    async fn dropped_session_releases_the_loop() {
        let decider = ScriptedDecider::new(Ok(decision(vec![Action::Stop], Pose::default())));
        let h = Harness::new(SchedulerConfig::default(), decider);
        let channel = h.scheduler.feedback_channel();

        drop(channel.request_feedback().unwrap());

        let summary = h.scheduler.run().await;
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.reason, CompletionReason::TargetFound);
    }

    #[test]
    fn plan_reports_route_without_moving() {
        let (h, _) = harness();
        let channel = h.scheduler.feedback_channel();

        let (name, path) = channel.plan(" Banana ").unwrap();
        assert_eq!(name, "banana");
        assert!(path.is_reachable());
        assert!(!path.actions().is_empty());
        assert_eq!(channel.current_pose(), Pose::default());
        assert_eq!(
            channel.plan("sofa").unwrap_err(),
            SeekError::UnknownLandmark("sofa".to_string())
        );
    }
}
