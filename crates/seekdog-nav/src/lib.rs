//! `seekdog-nav` – Grid navigation.
//!
//! Everything the robot needs to reason about where it is and how to get
//! somewhere else on the discrete search grid.
//!
//! # Modules
//!
//! - [`pose_model`] – [`step`][pose_model::step]: the pure `(pose, action) →
//!   pose` transition function, and [`replay`][pose_model::replay] for whole
//!   action sequences.
//! - [`obstacle_map`] – [`ObstacleMap`][obstacle_map::ObstacleMap]: blocked
//!   cells (border perimeter plus static obstacles) and named landmark poses.
//! - [`pathfinder`] – [`GridPathfinder`][pathfinder::GridPathfinder]: A*
//!   search over `(x, y, heading)` that turns a start and goal pose into an
//!   action sequence, translating only once the goal heading is reached.

pub mod obstacle_map;
pub mod pathfinder;
pub mod pose_model;

pub use obstacle_map::{MapConfig, ObstacleMap, ObstacleMapBuilder, border_cells, border_span};
pub use pathfinder::{GridPathfinder, PathOutcome, PathfinderConfig, find_path};
pub use pose_model::{replay, step};
