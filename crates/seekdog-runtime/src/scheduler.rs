//! [`RoundScheduler`] – the autonomous perceive–decide–act loop.
//!
//! Each round:
//!
//! 1. **Wait** – block while operator feedback is in progress; leave if the
//!    session was shut down.
//! 2. **Skip** – if a feedback interrupt is latched, clear it and start over.
//!    Skips never count against the round budget.
//! 3. **Checkpoint** – when `feedback_interval` divides the round number,
//!    pause in [`SchedulerState::AwaitingFeedback`] until the operator
//!    answers through [`FeedbackChannel::answer_checkpoint`]. The answer
//!    rides along with this round's decision request.
//! 4. **Decide** – capture a frame and ask the [`Decider`] for the next
//!    actions. The call races the interrupt notification, so feedback drops
//!    the in-flight future.
//! 5. **Commit** – under the turn lock, discard the result if an interrupt
//!    latched meanwhile; otherwise correct the pose, append a
//!    [`RoundRecord`] and hand the actions to the [`Actuator`].
//!
//! The loop ends when the decision reduces to `stop`, after `max_rounds`
//! counted rounds, or on [`RoundScheduler::shutdown`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use seekdog_hal::{SimActuator, SimCamera};
//! use seekdog_memory::RoundMemory;
//! use seekdog_nav::ObstacleMap;
//! use seekdog_runtime::{
//!     Collaborators, KeywordClassifier, LlmDecider, LlmDriver, NullPerception,
//!     RoundScheduler, SchedulerConfig,
//! };
//!
//! # async fn demo() {
//! let config = SchedulerConfig::default();
//! let map = ObstacleMap::from_config(&config.map);
//! let collaborators = Collaborators {
//!     decider: Arc::new(LlmDecider::new(
//!         LlmDriver::new("http://localhost:11434", "llama3"),
//!         Arc::new(NullPerception),
//!     )),
//!     classifier: Arc::new(KeywordClassifier::from_map(&map)),
//!     camera: Box::new(SimCamera::new("front")),
//!     actuator: Box::new(SimActuator::new(config.start_pose)),
//!     memory: RoundMemory::new(),
//! };
//! let scheduler = RoundScheduler::new(config, collaborators);
//! let summary = scheduler.run().await;
//! println!("finished after {} rounds: {:?}", summary.rounds, summary.reason);
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use seekdog_hal::{Actuator, Camera, CameraFrame};
use seekdog_memory::RoundMemory;
use seekdog_nav::{GridPathfinder, MapConfig, ObstacleMap, PathfinderConfig, replay};
use seekdog_types::{
    Action, DecisionSummary, Pose, RoundRecord, RoundSource, SeekError, reduces_to_stop,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::collaborator::{Decider, Decision, DecisionRequest, LandmarkClassifier};
use crate::feedback::FeedbackChannel;
use crate::signals::RoundSignals;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which pose to adopt after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseCorrection {
    /// Trust the pose reported by the decision collaborator.
    #[default]
    Reported,
    /// Replay the decided actions from the current pose.
    Replayed,
}

/// Configuration bundle for [`RoundScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Object the robot is searching for.
    pub target: String,
    pub start_pose: Pose,
    /// Counted rounds before the search gives up.
    pub max_rounds: u32,
    pub pose_correction: PoseCorrection,
    pub map: MapConfig,
    pub pathfinder: PathfinderConfig,
    /// Upper bound on one decision call; `None` waits indefinitely.
    pub decision_timeout: Option<Duration>,
    /// Ask the operator for feedback before every n-th round.
    pub feedback_interval: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target: "banana".to_string(),
            start_pose: Pose::default(),
            max_rounds: 20,
            pose_correction: PoseCorrection::default(),
            map: MapConfig::default(),
            pathfinder: PathfinderConfig::default(),
            decision_timeout: None,
            feedback_interval: None,
        }
    }
}

/// The external parts a scheduler drives.
pub struct Collaborators {
    pub decider: Arc<dyn Decider>,
    pub classifier: Arc<dyn LandmarkClassifier>,
    pub camera: Box<dyn Camera>,
    pub actuator: Box<dyn Actuator>,
    pub memory: RoundMemory,
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// A decision reduced to `stop`.
    TargetFound,
    RoundBudgetReached,
    /// The budget ran out and every counted round failed.
    Exhausted,
    Shutdown,
}

/// Lifecycle of a scheduler, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningRound,
    AwaitingFeedback,
    ExecutingFeedback,
    Completed(CompletionReason),
}

impl SchedulerState {
    pub fn is_completed(&self) -> bool {
        matches!(self, SchedulerState::Completed(_))
    }
}

/// Result of [`RoundScheduler::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Counted rounds, failed ones included.
    pub rounds: u32,
    pub failures: u32,
    pub reason: CompletionReason,
    pub final_pose: Pose,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

/// The loop is parked before `round` until `reply` is answered.
pub(crate) struct Checkpoint {
    pub(crate) round: u32,
    pub(crate) reply: oneshot::Sender<Option<String>>,
}

/// State shared by the round loop and every [`FeedbackChannel`].
///
/// `pose_tx` is only written while `turn` is held.
pub(crate) struct Shared {
    pub(crate) signals: RoundSignals,
    pub(crate) state_tx: watch::Sender<SchedulerState>,
    pub(crate) pose_tx: watch::Sender<Pose>,
    pub(crate) turn: Mutex<()>,
    /// `true` while [`RoundScheduler::run`] is executing.
    pub(crate) running: AtomicBool,
    pub(crate) memory: RoundMemory,
    pub(crate) map: ObstacleMap,
    pub(crate) pathfinder: GridPathfinder,
    pub(crate) classifier: Arc<dyn LandmarkClassifier>,
    decider: Arc<dyn Decider>,
    camera: Mutex<Box<dyn Camera>>,
    actuator: Mutex<Box<dyn Actuator>>,
    pub(crate) target: String,
    correction: PoseCorrection,
    decision_timeout: Option<Duration>,
    pub(crate) checkpoint: std::sync::Mutex<Option<Checkpoint>>,
}

impl Shared {
    pub(crate) fn current_pose(&self) -> Pose {
        *self.pose_tx.borrow()
    }

    pub(crate) fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    pub(crate) fn checkpoint_slot(&self) -> std::sync::MutexGuard<'_, Option<Checkpoint>> {
        self.checkpoint.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `next` unless the run has already completed.
    pub(crate) fn set_state(&self, next: SchedulerState) {
        self.state_tx.send_if_modified(|state| {
            if state.is_completed() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    pub(crate) async fn capture(&self) -> Result<CameraFrame, SeekError> {
        self.camera.lock().await.capture()
    }

    pub(crate) fn request(&self, pose: Pose, frame: CameraFrame, feedback: Option<String>) -> DecisionRequest {
        DecisionRequest {
            pose,
            frame,
            target: self.target.clone(),
            feedback,
            memory: self.memory.memory_text(),
        }
    }

    pub(crate) async fn decide(&self, request: DecisionRequest) -> Result<Decision, SeekError> {
        match self.decision_timeout {
            Some(limit) => tokio::time::timeout(limit, self.decider.decide(request))
                .await
                .map_err(|_| SeekError::Collaborator(format!("decision timed out after {limit:?}")))?,
            None => self.decider.decide(request).await,
        }
    }

    /// The pose to adopt after `decision`, according to the correction mode.
    pub(crate) fn corrected_pose(&self, start: Pose, decision: &Decision) -> Pose {
        let replayed = replay(start, &decision.actions);
        if replayed != decision.new_pose {
            warn!(
                reported = %decision.new_pose,
                replayed = %replayed,
                mode = ?self.correction,
                "reported pose disagrees with action replay"
            );
        }
        match self.correction {
            PoseCorrection::Reported => decision.new_pose,
            PoseCorrection::Replayed => replayed,
        }
    }

    /// Publish the new pose, record the round and move the robot.
    ///
    /// Caller must hold `turn`. The append runs on the blocking pool since
    /// it may write the round log. Actuator failures are logged; the pose
    /// stays committed.
    pub(crate) async fn commit(&self, record: RoundRecord) -> u32 {
        let new_pose = record.decision.new_pose;
        let actions = record.decision.actions.clone();
        let seen = record.observation.labels().join(", ");
        self.pose_tx.send_replace(new_pose);

        let memory = self.memory.clone();
        let round = match tokio::task::spawn_blocking(move || memory.append(record)).await {
            Ok(round) => round,
            Err(e) => {
                warn!(error = %e, "round append task failed");
                0
            }
        };
        debug!(round, pose = %new_pose, seen = %seen, "round committed");

        if !actions.is_empty() {
            let mut actuator = self.actuator.lock().await;
            if let Err(e) = actuator.execute(&actions).await {
                warn!(round, actuator = actuator.id(), error = %e, "actuation failed");
            }
        }
        round
    }
}

enum RoundOutcome {
    Committed(Vec<Action>),
    Failed(SeekError),
    Interrupted,
    Closed,
}

enum CheckpointOutcome {
    Answered(Option<String>),
    Interrupted,
    Closed,
}

// ─────────────────────────────────────────────────────────────────────────────
// RoundScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Owns one search session.
pub struct RoundScheduler {
    max_rounds: u32,
    feedback_interval: Option<u32>,
    shared: Arc<Shared>,
}

impl RoundScheduler {
    pub fn new(config: SchedulerConfig, collaborators: Collaborators) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        let (pose_tx, _) = watch::channel(config.start_pose);
        let shared = Shared {
            signals: RoundSignals::new(),
            state_tx,
            pose_tx,
            turn: Mutex::new(()),
            running: AtomicBool::new(false),
            memory: collaborators.memory,
            map: ObstacleMap::from_config(&config.map),
            pathfinder: GridPathfinder::new(config.pathfinder),
            classifier: collaborators.classifier,
            decider: collaborators.decider,
            camera: Mutex::new(collaborators.camera),
            actuator: Mutex::new(collaborators.actuator),
            target: config.target,
            correction: config.pose_correction,
            decision_timeout: config.decision_timeout,
            checkpoint: std::sync::Mutex::new(None),
        };
        Self {
            max_rounds: config.max_rounds,
            feedback_interval: config.feedback_interval.filter(|n| *n > 0),
            shared: Arc::new(shared),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.shared.state_tx.subscribe()
    }

    pub fn current_pose(&self) -> Pose {
        self.shared.current_pose()
    }

    pub fn memory(&self) -> &RoundMemory {
        &self.shared.memory
    }

    pub fn map(&self) -> &ObstacleMap {
        &self.shared.map
    }

    /// A handle for pre-empting the loop with operator feedback.
    pub fn feedback_channel(&self) -> FeedbackChannel {
        FeedbackChannel::new(Arc::clone(&self.shared))
    }

    /// End the session. The running loop stops at its next suspension point
    /// and further feedback requests fail with [`SeekError::SessionClosed`].
    pub fn shutdown(&self) {
        info!("search shutdown requested");
        self.shared.signals.close_session();
    }

    /// Run rounds until the search completes.
    pub async fn run(&self) -> RunSummary {
        let shared = &self.shared;
        shared.running.store(true, Ordering::SeqCst);
        if shared.signals.is_feedback_complete() {
            shared.set_state(SchedulerState::RunningRound);
        }
        info!(target_object = %shared.target, pose = %shared.current_pose(), max_rounds = self.max_rounds, "search started");

        let mut rounds = 0u32;
        let mut failures = 0u32;
        let mut prompted_for = None;
        let reason = loop {
            if rounds >= self.max_rounds {
                break if rounds > 0 && failures == rounds {
                    CompletionReason::Exhausted
                } else {
                    CompletionReason::RoundBudgetReached
                };
            }

            // ── 1. Wait ──────────────────────────────────────────────────────
            if !shared.signals.wait_for_turn().await {
                break CompletionReason::Shutdown;
            }

            // ── 2. Skip ──────────────────────────────────────────────────────
            if shared.signals.take_interrupt() {
                debug!(round = rounds + 1, "round skipped after feedback");
                continue;
            }

            // ── 3. Checkpoint ────────────────────────────────────────────────
            let next = rounds + 1;
            let mut feedback = None;
            if self.checkpoint_due(next) && prompted_for != Some(next) {
                prompted_for = Some(next);
                match self.checkpoint(next).await {
                    CheckpointOutcome::Answered(text) => feedback = text,
                    CheckpointOutcome::Interrupted => continue,
                    CheckpointOutcome::Closed => break CompletionReason::Shutdown,
                }
            }

            // ── 4-5. Decide and commit ───────────────────────────────────────
            match self.round(next, feedback).await {
                RoundOutcome::Committed(actions) => {
                    rounds += 1;
                    if reduces_to_stop(&actions) {
                        break CompletionReason::TargetFound;
                    }
                }
                RoundOutcome::Failed(e) => {
                    rounds += 1;
                    failures += 1;
                    warn!(round = rounds, error = %e, "round failed");
                }
                RoundOutcome::Interrupted => {
                    debug!(round = rounds + 1, "round discarded after feedback interrupt");
                }
                RoundOutcome::Closed => break CompletionReason::Shutdown,
            }
        };

        shared.signals.close_session();
        shared.running.store(false, Ordering::SeqCst);
        shared.set_state(SchedulerState::Completed(reason));
        let summary = RunSummary {
            rounds,
            failures,
            reason,
            final_pose: shared.current_pose(),
        };
        info!(rounds, failures, reason = ?reason, pose = %summary.final_pose, "search finished");
        summary
    }

    fn checkpoint_due(&self, round: u32) -> bool {
        self.feedback_interval.is_some_and(|every| round % every == 0)
    }

    /// Park before `round` until the operator answers, an interrupt arrives
    /// or the session closes.
    async fn checkpoint(&self, round: u32) -> CheckpointOutcome {
        let shared = &self.shared;
        let (reply, pending) = oneshot::channel();
        *shared.checkpoint_slot() = Some(Checkpoint { round, reply });
        shared.set_state(SchedulerState::AwaitingFeedback);
        info!(round, "waiting for operator feedback");

        let answer = tokio::select! {
            biased;
            _ = shared.signals.interrupted() => None,
            answer = pending => Some(answer.ok().flatten()),
        };
        shared.checkpoint_slot().take();

        if !shared.signals.is_session_active() {
            return CheckpointOutcome::Closed;
        }
        match answer {
            Some(text) => {
                if shared.signals.is_feedback_complete() {
                    shared.set_state(SchedulerState::RunningRound);
                }
                debug!(round, answered = text.is_some(), "checkpoint released");
                CheckpointOutcome::Answered(text)
            }
            None => CheckpointOutcome::Interrupted,
        }
    }

    #[instrument(skip(self, feedback))]
    async fn round(&self, round: u32, feedback: Option<String>) -> RoundOutcome {
        let shared = &self.shared;
        let start = shared.current_pose();

        let frame = match shared.capture().await {
            Ok(frame) => frame,
            Err(e) => return RoundOutcome::Failed(e),
        };
        let request = shared.request(start, frame, feedback.clone());

        let result = tokio::select! {
            biased;
            _ = shared.signals.interrupted() => None,
            result = shared.decide(request) => Some(result),
        };

        let _turn = shared.turn.lock().await;
        if !shared.signals.is_session_active() {
            return RoundOutcome::Closed;
        }
        let Some(result) = result else {
            return RoundOutcome::Interrupted;
        };
        if shared.signals.interrupt_pending() {
            return RoundOutcome::Interrupted;
        }

        let decision = match result {
            Ok(decision) => decision,
            Err(e) => return RoundOutcome::Failed(e),
        };
        let new_pose = shared.corrected_pose(start, &decision);
        let actions = decision.actions.clone();
        shared
            .commit(RoundRecord::new(
                RoundSource::Autonomous,
                decision.observation,
                feedback,
                DecisionSummary {
                    initial_pose: start,
                    actions: decision.actions,
                    new_pose,
                    rationale: decision.rationale,
                },
            ))
            .await;
        RoundOutcome::Committed(actions)
    }
}
