//! Generic `Actuator` trait for anything that can carry out discrete grid
//! actions.
//!
//! Planning produces `Vec<Action>`; an actuator turns that into motion. The
//! scheduler does not care whether the motion is a real gait controller, a
//! simulator or a test double.

use async_trait::async_trait;
use seekdog_types::{Action, SeekError};

/// Executes discrete actions on the robot body.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Stable identifier for diagnostics, e.g. `"go2_sport"`.
    fn id(&self) -> &str;

    /// Execute `actions` in order and return once the last one has finished.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::Hardware`] if any action cannot be applied. Actions
    /// before the failing one may already have been carried out.
    async fn execute(&mut self, actions: &[Action]) -> Result<(), SeekError>;
}
