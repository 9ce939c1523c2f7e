//! In-process simulation drivers for running a search without the robot.
//!
//! [`SimActuator`] moves a virtual pose through the same transition model the
//! planner uses and records every action it was given. [`SimMotionDriver`]
//! records raw velocity commands. [`SimCamera`] returns blank frames.
//!
//! Recorded logs live behind an `Arc<Mutex<…>>` so a test can keep a handle
//! after the driver has been boxed and handed to the scheduler.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seekdog_nav::step;
use seekdog_types::{Action, Pose, SeekError};
use tracing::debug;

use crate::actuator::Actuator;
use crate::camera::{Camera, CameraFrame};
use crate::motion::{MotionCommand, MotionDriver, VelocityCommand};

fn lock_poisoned(component: &str) -> SeekError {
    SeekError::Hardware {
        component: component.to_string(),
        details: "recorder lock poisoned".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub actuator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated body that tracks its pose and records executed actions.
/// Always succeeds.
pub struct SimActuator {
    id: String,
    pose: Pose,
    executed: Arc<Mutex<Vec<Action>>>,
}

impl SimActuator {
    pub fn new(start: Pose) -> Self {
        Self {
            id: "sim_body".to_string(),
            pose: start,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pose reached by replaying every executed action from the start pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Shared handle to the list of executed actions.
    pub fn executed(&self) -> Arc<Mutex<Vec<Action>>> {
        Arc::clone(&self.executed)
    }
}

#[async_trait]
impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&mut self, actions: &[Action]) -> Result<(), SeekError> {
        let mut log = self.executed.lock().map_err(|_| lock_poisoned(&self.id))?;
        for action in actions {
            self.pose = step(self.pose, *action);
            log.push(*action);
        }
        debug!(pose = %self.pose, count = actions.len(), "sim actuator moved");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub motion driver
// ────────────────────────────────────────────────────────────────────────────

/// A simulated locomotion controller that records every command.
pub struct SimMotionDriver {
    id: String,
    commands: Arc<Mutex<Vec<MotionCommand>>>,
    fail: bool,
}

impl SimMotionDriver {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            commands: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Make every command fail with a hardware fault.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn commands(&self) -> Arc<Mutex<Vec<MotionCommand>>> {
        Arc::clone(&self.commands)
    }

    fn record(&mut self, cmd: MotionCommand) -> Result<(), SeekError> {
        if self.fail {
            return Err(SeekError::Hardware {
                component: self.id.clone(),
                details: "simulated controller fault".to_string(),
            });
        }
        self.commands
            .lock()
            .map_err(|_| lock_poisoned(&self.id))?
            .push(cmd);
        Ok(())
    }
}

impl MotionDriver for SimMotionDriver {
    fn id(&self) -> &str {
        &self.id
    }

    fn velocity_move(&mut self, cmd: VelocityCommand) -> Result<(), SeekError> {
        self.record(MotionCommand::Velocity(cmd))
    }

    fn stop_move(&mut self) -> Result<(), SeekError> {
        self.record(MotionCommand::Stop)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub camera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated camera that returns a blank (all-zero) 4×4 greyscale frame.
/// Always succeeds.
pub struct SimCamera {
    id: String,
}

impl SimCamera {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, SeekError> {
        Ok(CameraFrame::blank(4, 4))
    }
}
