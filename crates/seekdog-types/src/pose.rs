//! Grid poses and cardinal headings.
//!
//! A [`Pose`] is an immutable `(x, y, orientation)` triple. Orientation is
//! measured in degrees clockwise from north and is always one of the four
//! cardinal values, which the closed [`Heading`] enum enforces by
//! construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SeekError;

// ─────────────────────────────────────────────────────────────────────────────
// Heading
// ─────────────────────────────────────────────────────────────────────────────

/// Facing direction of the robot, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Heading {
    /// 0°, facing +y.
    North,
    /// 90°, facing +x.
    East,
    /// 180°, facing −y.
    South,
    /// 270°, facing −x.
    West,
}

impl Heading {
    /// All four headings in clockwise order starting at north.
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    /// Build a heading from an arbitrary angle in degrees.
    ///
    /// The angle is normalised into `[0, 360)` first, so `-90` and `630`
    /// both yield [`Heading::West`].
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::InvalidHeading`] when the normalised angle is not
    /// a multiple of 90.
    pub fn from_degrees(degrees: i32) -> Result<Self, SeekError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Heading::North),
            90 => Ok(Heading::East),
            180 => Ok(Heading::South),
            270 => Ok(Heading::West),
            _ => Err(SeekError::InvalidHeading(degrees)),
        }
    }

    /// Angle in degrees, one of `0`, `90`, `180`, `270`.
    pub fn degrees(self) -> i32 {
        match self {
            Heading::North => 0,
            Heading::East => 90,
            Heading::South => 180,
            Heading::West => 270,
        }
    }

    /// Heading after a clockwise quarter turn.
    pub fn turned_right(self) -> Self {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    /// Heading after a counter-clockwise quarter turn.
    pub fn turned_left(self) -> Self {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    /// Unit `(dx, dy)` displacement of one step forward while facing `self`.
    ///
    /// This table and [`Heading::right_delta`] are the only place grid
    /// displacement is defined; every other direction is a negation of one
    /// of them.
    pub fn forward_delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, 1),
            Heading::East => (1, 0),
            Heading::South => (0, -1),
            Heading::West => (-1, 0),
        }
    }

    /// Unit `(dx, dy)` displacement of one lateral step to the right.
    pub fn right_delta(self) -> (i32, i32) {
        match self {
            Heading::North => (1, 0),
            Heading::East => (0, -1),
            Heading::South => (-1, 0),
            Heading::West => (0, 1),
        }
    }
}

impl TryFrom<i32> for Heading {
    type Error = SeekError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Heading::from_degrees(degrees)
    }
}

impl From<Heading> for i32 {
    fn from(heading: Heading) -> Self {
        heading.degrees()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pose
// ─────────────────────────────────────────────────────────────────────────────

/// Robot position on the grid plus its facing direction.
///
/// Poses are value types: every transition produces a new `Pose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "orientation")]
    pub heading: Heading,
}

impl Pose {
    /// Largest `|x|` or `|y|` accepted from collaborators and configuration.
    pub const COORD_LIMIT: i32 = 1 << 20;

    /// Create a new pose.
    pub const fn new(x: i32, y: i32, heading: Heading) -> Self {
        Self { x, y, heading }
    }

    /// Create a pose from a raw orientation in degrees.
    ///
    /// This is the entry point for poses that arrive from outside the
    /// process, so the cell is bounded by [`Pose::COORD_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::InvalidHeading`] for non-cardinal angles and
    /// [`SeekError::MalformedPose`] when `x` or `y` is out of range.
    pub fn from_degrees(x: i32, y: i32, degrees: i32) -> Result<Self, SeekError> {
        let heading = Heading::from_degrees(degrees)?;
        let pose = Self::new(x, y, heading);
        if !pose.in_bounds() {
            return Err(SeekError::MalformedPose(format!(
                "{pose} is outside ±{}",
                Self::COORD_LIMIT
            )));
        }
        Ok(pose)
    }

    /// `true` when both coordinates are within [`Pose::COORD_LIMIT`].
    pub fn in_bounds(&self) -> bool {
        self.x.unsigned_abs() <= Self::COORD_LIMIT.unsigned_abs()
            && self.y.unsigned_abs() <= Self::COORD_LIMIT.unsigned_abs()
    }

    /// The `(x, y)` cell this pose occupies.
    pub fn cell(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Same cell, different heading.
    pub fn with_heading(self, heading: Heading) -> Self {
        Self { heading, ..self }
    }

    /// Manhattan distance between the cells of two poses; heading is ignored.
    ///
    /// Saturates at `u32::MAX` for cells at opposite corners of the grid.
    pub fn manhattan(&self, other: &Pose) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0, 0, Heading::North)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.heading)
    }
}

/// Parses the `(x, y, orientation)` tuple form that language models emit,
/// tolerating surrounding markdown fences, whitespace and missing parentheses.
impl FromStr for Pose {
    type Err = SeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.replace("```", "").replace('\n', "");
        let inner = cleaned.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let [x, y, deg] = parts.as_slice() else {
            return Err(SeekError::MalformedPose(s.to_string()));
        };
        let parse = |v: &str| {
            v.parse::<i32>()
                .map_err(|_| SeekError::MalformedPose(s.to_string()))
        };
        Pose::from_degrees(parse(*x)?, parse(*y)?, parse(*deg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_normalizes_negative_and_large_angles() {
        assert_eq!(Heading::from_degrees(-90).unwrap(), Heading::West);
        assert_eq!(Heading::from_degrees(450).unwrap(), Heading::East);
        assert_eq!(Heading::from_degrees(360).unwrap(), Heading::North);
        assert_eq!(Heading::from_degrees(-180).unwrap(), Heading::South);
    }

    #[test]
    fn heading_rejects_non_cardinal_angles() {
        assert_eq!(
            Heading::from_degrees(45),
            Err(SeekError::InvalidHeading(45))
        );
        assert!(Heading::from_degrees(60).is_err());
    }

    #[test]
    fn turning_four_times_is_identity() {
        for h in Heading::ALL {
            assert_eq!(h.turned_right().turned_right().turned_right().turned_right(), h);
            assert_eq!(h.turned_left().turned_right(), h);
        }
    }

    #[test]
    fn right_is_forward_rotated_clockwise() {
        for h in Heading::ALL {
            assert_eq!(h.right_delta(), h.turned_right().forward_delta());
        }
    }

    #[test]
    fn pose_serializes_orientation_in_degrees() {
        let pose = Pose::new(2, -3, Heading::West);
        let json = serde_json::to_string(&pose).unwrap();
        assert_eq!(json, r#"{"x":2,"y":-3,"orientation":270}"#);
    }

    #[test]
    fn pose_deserialization_rejects_bad_orientation() {
        let result: Result<Pose, _> = serde_json::from_str(r#"{"x":0,"y":0,"orientation":60}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pose_parses_tuple_text() {
        let pose: Pose = "(4, 4, 180)".parse().unwrap();
        assert_eq!(pose, Pose::new(4, 4, Heading::South));

        let fenced: Pose = "```\n(-1, 3, -90)\n```".parse().unwrap();
        assert_eq!(fenced, Pose::new(-1, 3, Heading::West));
    }

    #[test]
    fn pose_parse_rejects_garbage() {
        assert!("(1, 2)".parse::<Pose>().is_err());
        assert!("north".parse::<Pose>().is_err());
        assert!("(1, 2, 45)".parse::<Pose>().is_err());
    }

    #[test]
    fn pose_display_matches_tuple_form() {
        assert_eq!(Pose::new(0, 0, Heading::South).to_string(), "(0, 0, 180)");
    }

    #[test]
    fn manhattan_ignores_heading() {
        let a = Pose::new(0, 0, Heading::North);
        let b = Pose::new(-2, 3, Heading::East);
        assert_eq!(a.manhattan(&b), 5);
    }

    #[test]
    fn manhattan_saturates_across_the_whole_grid() {
        let a = Pose::new(i32::MIN, i32::MIN, Heading::North);
        let b = Pose::new(i32::MAX, i32::MAX, Heading::North);
        assert_eq!(a.manhattan(&b), u32::MAX);
    }

    #[test]
    fn external_poses_are_bounded() {
        let edge = Pose::COORD_LIMIT;
        assert!(Pose::from_degrees(edge, -edge, 0).is_ok());
        assert!(matches!(
            Pose::from_degrees(edge + 1, 0, 0),
            Err(SeekError::MalformedPose(_))
        ));
        assert!(matches!(
            format!("(0, {}, 90)", i32::MIN).parse::<Pose>(),
            Err(SeekError::MalformedPose(_))
        ));
        assert!(!Pose::new(i32::MAX, 0, Heading::East).in_bounds());
    }
}
