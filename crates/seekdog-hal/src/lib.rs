//! `seekdog-hal` – Hardware abstraction for the quadruped.
//!
//! The round scheduler only ever talks to the traits in this crate, so the
//! real robot, the simulator and test doubles are interchangeable.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuator`][actuator::Actuator]: executes a sequence
//!   of discrete [`Action`][seekdog_types::Action]s.
//! - [`motion`] – [`MotionDriver`][motion::MotionDriver] and
//!   [`VelocityActuator`][motion::VelocityActuator]: expands actions into
//!   timed velocity pulses for a legged base.
//! - [`camera`] – [`Camera`][camera::Camera] and
//!   [`DatasetCamera`][camera::DatasetCamera], which replays image files
//!   from a directory.
//! - [`sim`] – headless drivers that record what they were asked to do.

pub mod actuator;
pub mod camera;
pub mod motion;
pub mod sim;

pub use actuator::Actuator;
pub use camera::{Camera, CameraFrame, DatasetCamera, ImageEncoding};
pub use motion::{MotionCommand, MotionDriver, PulseTiming, VelocityActuator, VelocityCommand};
pub use sim::{SimActuator, SimCamera, SimMotionDriver};
