//! The closed set of discrete robot actions.
//!
//! Language models and operators speak in loose strings (`"turn right"`,
//! `"Move_Forward"`, `"'shift left'"`). Those strings are converted into
//! [`Action`] exactly once, at the collaborator boundary, via [`FromStr`];
//! unknown strings are rejected there and never reach planning or actuation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SeekError;

/// A discrete grid action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveForward,
    MoveBackward,
    ShiftRight,
    ShiftLeft,
    TurnRight,
    TurnLeft,
    Stop,
}

/// Coarse classification of an [`Action`], used for costing and constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// In-place quarter turn.
    Rotate,
    /// Translation along the facing axis.
    Move,
    /// Lateral translation perpendicular to the facing axis.
    Shift,
    Stop,
}

impl Action {
    /// The six motion actions in the order successors are generated.
    pub const MOTIONS: [Action; 6] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::ShiftRight,
        Action::ShiftLeft,
        Action::TurnRight,
        Action::TurnLeft,
    ];

    pub fn kind(self) -> ActionKind {
        match self {
            Action::MoveForward | Action::MoveBackward => ActionKind::Move,
            Action::ShiftRight | Action::ShiftLeft => ActionKind::Shift,
            Action::TurnRight | Action::TurnLeft => ActionKind::Rotate,
            Action::Stop => ActionKind::Stop,
        }
    }

    /// `true` for moves and shifts.
    pub fn is_translation(self) -> bool {
        matches!(self.kind(), ActionKind::Move | ActionKind::Shift)
    }

    /// `true` for turns.
    pub fn is_rotation(self) -> bool {
        self.kind() == ActionKind::Rotate
    }

    /// The action that undoes `self` on an unbounded grid.
    pub fn inverse(self) -> Action {
        match self {
            Action::MoveForward => Action::MoveBackward,
            Action::MoveBackward => Action::MoveForward,
            Action::ShiftRight => Action::ShiftLeft,
            Action::ShiftLeft => Action::ShiftRight,
            Action::TurnRight => Action::TurnLeft,
            Action::TurnLeft => Action::TurnRight,
            Action::Stop => Action::Stop,
        }
    }

    /// Human-readable label, e.g. `"move forward"`.
    pub fn label(self) -> &'static str {
        match self {
            Action::MoveForward => "move forward",
            Action::MoveBackward => "move backward",
            Action::ShiftRight => "shift right",
            Action::ShiftLeft => "shift left",
            Action::TurnRight => "turn right",
            Action::TurnLeft => "turn left",
            Action::Stop => "stop",
        }
    }

    /// Parse a comma-separated action list such as
    /// `"['move forward', 'turn right']"` or `"move forward, turn right"`.
    ///
    /// Empty entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::UnknownAction`] for the first entry that is not a
    /// recognised action.
    pub fn parse_list(text: &str) -> Result<Vec<Action>, SeekError> {
        text.trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Action>)
            .collect()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = SeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_matches(|c: char| matches!(c, '\'' | '"' | '.' | '`'))
            .to_lowercase()
            .replace(['_', '-'], " ");
        let words: Vec<&str> = normalized.split_whitespace().collect();
        match words.join(" ").as_str() {
            "move forward" | "forward" => Ok(Action::MoveForward),
            "move backward" | "backward" => Ok(Action::MoveBackward),
            "shift right" => Ok(Action::ShiftRight),
            "shift left" => Ok(Action::ShiftLeft),
            "turn right" => Ok(Action::TurnRight),
            "turn left" => Ok(Action::TurnLeft),
            "stop" => Ok(Action::Stop),
            _ => Err(SeekError::UnknownAction(s.trim().to_string())),
        }
    }
}

/// `true` when `actions` is non-empty and consists solely of [`Action::Stop`],
/// i.e. the decision collaborator declared the target found.
pub fn reduces_to_stop(actions: &[Action]) -> bool {
    !actions.is_empty() && actions.iter().all(|a| *a == Action::Stop)
}
