//! Velocity-pulse actuation for a legged base.
//!
//! The robot's locomotion controller accepts body-frame velocity commands
//! `(vx, vy, vyaw)` and halts if they stop arriving. One grid action is one
//! pulse: the velocity is re-sent every [`PulseTiming::period`] for
//! [`PulseTiming::duration`], followed by stop commands for the same span so
//! the body settles before the next action.
//!
//! | Action        | vx (m/s) | vy (m/s) | vyaw (rad/s) |
//! |---------------|----------|----------|--------------|
//! | move forward  | 0.5      | 0        | 0            |
//! | move backward | -0.5     | 0        | 0            |
//! | shift right   | 0        | -0.5     | 0            |
//! | shift left    | 0        | 0.5      | 0            |
//! | turn right    | 0        | 0        | -1.04        |
//! | turn left     | 0        | 0        | 1.04         |
//!
//! [`Action::Stop`] issues a stop without a preceding pulse.

use std::time::Duration;

use async_trait::async_trait;
use seekdog_types::{Action, SeekError};
use tracing::debug;

use crate::actuator::Actuator;

/// Body-frame velocity command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    pub vx: f32,
    pub vy: f32,
    pub vyaw: f32,
}

impl VelocityCommand {
    pub const fn new(vx: f32, vy: f32, vyaw: f32) -> Self {
        Self { vx, vy, vyaw }
    }

    /// The velocity pulse for a motion action; `None` for [`Action::Stop`].
    pub fn for_action(action: Action) -> Option<Self> {
        let cmd = match action {
            Action::MoveForward => Self::new(0.5, 0.0, 0.0),
            Action::MoveBackward => Self::new(-0.5, 0.0, 0.0),
            Action::ShiftRight => Self::new(0.0, -0.5, 0.0),
            Action::ShiftLeft => Self::new(0.0, 0.5, 0.0),
            Action::TurnRight => Self::new(0.0, 0.0, -1.04),
            Action::TurnLeft => Self::new(0.0, 0.0, 1.04),
            Action::Stop => return None,
        };
        Some(cmd)
    }
}

/// A command as seen by the locomotion controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Velocity(VelocityCommand),
    Stop,
}

/// Low-level locomotion interface (the robot vendor's sport client).
pub trait MotionDriver: Send + Sync {
    fn id(&self) -> &str;

    /// Start moving with `cmd` until the next command.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::Hardware`] if the controller rejects the command.
    fn velocity_move(&mut self, cmd: VelocityCommand) -> Result<(), SeekError>;

    /// Halt all motion.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::Hardware`] if the controller rejects the command.
    fn stop_move(&mut self) -> Result<(), SeekError>;
}

/// Timing of one velocity pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    /// How long the velocity is held (and then how long stop is held).
    pub duration: Duration,
    /// Interval between repeated commands.
    pub period: Duration,
}

impl PulseTiming {
    /// Number of commands sent per phase; at least one.
    pub fn repeats(&self) -> u32 {
        if self.period.is_zero() {
            return 1;
        }
        let n = self.duration.as_micros() / self.period.as_micros().max(1);
        u32::try_from(n).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for PulseTiming {
    /// One second at 100 Hz.
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(1),
            period: Duration::from_millis(10),
        }
    }
}

/// [`Actuator`] that drives a [`MotionDriver`] with one velocity pulse per
/// action.
pub struct VelocityActuator<D> {
    driver: D,
    timing: PulseTiming,
}

impl<D: MotionDriver> VelocityActuator<D> {
    /// Wrap `driver` with the default pulse timing.
    pub fn new(driver: D) -> Self {
        Self::with_timing(driver, PulseTiming::default())
    }

    pub fn with_timing(driver: D, timing: PulseTiming) -> Self {
        Self { driver, timing }
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    async fn pulse(&mut self, cmd: VelocityCommand) -> Result<(), SeekError> {
        let repeats = self.timing.repeats();
        for _ in 0..repeats {
            self.driver.velocity_move(cmd)?;
            tokio::time::sleep(self.timing.period).await;
        }
        for _ in 0..repeats {
            self.driver.stop_move()?;
            tokio::time::sleep(self.timing.period).await;
        }
        Ok(())
    }
}

#[async_trait]
impl<D: MotionDriver> Actuator for VelocityActuator<D> {
    fn id(&self) -> &str {
        self.driver.id()
    }

    async fn execute(&mut self, actions: &[Action]) -> Result<(), SeekError> {
        for action in actions {
            match VelocityCommand::for_action(*action) {
                Some(cmd) => {
                    debug!(action = %action, vx = cmd.vx, vy = cmd.vy, vyaw = cmd.vyaw, "velocity pulse");
                    self.pulse(cmd).await?;
                }
                None => self.driver.stop_move()?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMotionDriver;

    #[test]
    fn every_motion_has_a_pulse() {
        for a in Action::MOTIONS {
            assert!(VelocityCommand::for_action(a).is_some(), "{a}");
        }
        assert!(VelocityCommand::for_action(Action::Stop).is_none());
    }

    #[test]
    fn inverse_actions_have_opposite_velocities() {
        for a in Action::MOTIONS {
            let v = VelocityCommand::for_action(a).unwrap();
            let w = VelocityCommand::for_action(a.inverse()).unwrap();
            assert_eq!((v.vx, v.vy, v.vyaw), (-w.vx, -w.vy, -w.vyaw));
        }
    }

    #[test]
    fn repeats_per_phase() {
        assert_eq!(PulseTiming::default().repeats(), 100);
        let coarse = PulseTiming {
            duration: Duration::from_secs(1),
            period: Duration::from_millis(500),
        };
        assert_eq!(coarse.repeats(), 2);
        let zero = PulseTiming {
            duration: Duration::from_secs(1),
            period: Duration::ZERO,
        };
        assert_eq!(zero.repeats(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pulses_then_stops_for_each_action() {
        let driver = SimMotionDriver::new("sport");
        let commands = driver.commands();
        let timing = PulseTiming {
            duration: Duration::from_secs(1),
            period: Duration::from_millis(500),
        };
        let mut act = VelocityActuator::with_timing(driver, timing);

        act.execute(&[Action::TurnRight, Action::Stop]).await.unwrap();

        let turn = MotionCommand::Velocity(VelocityCommand::new(0.0, 0.0, -1.04));
        let log = commands.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                turn,
                turn,
                MotionCommand::Stop,
                MotionCommand::Stop,
                MotionCommand::Stop,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn driver_fault_propagates() {
        let mut act = VelocityActuator::new(SimMotionDriver::new("sport").failing());
        let err = act.execute(&[Action::MoveForward]).await.unwrap_err();
        assert!(matches!(err, SeekError::Hardware { .. }));
    }
}
