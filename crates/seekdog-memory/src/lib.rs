//! `seekdog-memory` – What the robot remembers about its search.
//!
//! # Modules
//!
//! - [`round_memory`] – [`RoundMemory`][round_memory::RoundMemory]: the
//!   mutex-guarded, append-only list of completed rounds shared by the
//!   autonomous loop and the feedback path, rendered as history text for the
//!   decision collaborator.
//! - [`round_log`] – [`RoundLog`][round_log::RoundLog]: a human-readable log
//!   file with one block per round, flushed as each round is appended.

pub mod round_log;
pub mod round_memory;

pub use round_log::{RoundLog, RoundLogError, render_record};
pub use round_memory::RoundMemory;
