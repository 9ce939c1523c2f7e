//! Blocked cells and named landmarks.
//!
//! An [`ObstacleMap`] is the union of a square border perimeter and a set of
//! named static obstacle cells, plus a table of named landmark poses that
//! feedback can send the robot to.
//!
//! # Landmark cells
//!
//! Landmarks frequently sit on the border itself (a refrigerator against a
//! wall). Border cells that coincide with a landmark's cell are therefore
//! left open so the landmark stays reachable. Explicitly listed static
//! obstacles are always blocked, even when a landmark shares their cell.
//!
//! # Example
//!
//! ```rust
//! use seekdog_nav::ObstacleMap;
//! use seekdog_types::{Heading, Pose};
//!
//! let map = ObstacleMap::builder()
//!     .with_border(3)
//!     .with_obstacle("crate", (1, 1))
//!     .with_landmark("door", Pose::new(0, 3, Heading::North))
//!     .build();
//!
//! assert!(map.is_blocked(3, 0));
//! assert!(map.is_blocked(1, 1));
//! assert!(!map.is_blocked(0, 3));
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use seekdog_types::{Heading, Pose};
use tracing::debug;

/// Number of cells along one side of the border square for radius `r`.
///
/// The border encloses `[-r, r] × [-r, r]` inclusive, so a side is `2r + 1`
/// cells long and the perimeter holds `8r` distinct cells.
pub const fn border_span(radius: i32) -> i32 {
    2 * radius + 1
}

/// Every cell on the perimeter of the square `[-radius, radius]²`.
///
/// Returns an empty set for `radius <= 0`.
pub fn border_cells(radius: i32) -> HashSet<(i32, i32)> {
    let mut cells = HashSet::new();
    if radius <= 0 {
        return cells;
    }
    for i in 0..border_span(radius) {
        let c = i - radius;
        cells.insert((c, radius));
        cells.insert((c, -radius));
        cells.insert((radius, c));
        cells.insert((-radius, c));
    }
    cells
}

// ─────────────────────────────────────────────────────────────────────────────
// MapConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Plain description of a map, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Half-width of the border square; `None` leaves the grid unbounded.
    #[serde(default)]
    pub border_radius: Option<i32>,
    /// Named static obstacle cells.
    #[serde(default)]
    pub obstacles: BTreeMap<String, (i32, i32)>,
    /// Named landmark poses.
    #[serde(default)]
    pub landmarks: BTreeMap<String, Pose>,
}

impl Default for MapConfig {
    /// The kitchen layout the robot was first deployed in: a radius-4 border,
    /// a four-cell wall north of the start, and four landmarks.
    fn default() -> Self {
        let obstacles = [
            ("wall_1", (-4, 1)),
            ("wall_2", (-3, 1)),
            ("wall_3", (-2, 1)),
            ("wall_4", (-1, 1)),
        ]
        .into_iter()
        .map(|(name, cell)| (name.to_string(), cell))
        .collect();

        let landmarks = [
            ("banana", Pose::new(2, 4, Heading::North)),
            ("refrigerator", Pose::new(3, 4, Heading::North)),
            ("kitchen", Pose::new(0, 4, Heading::North)),
            ("curtain", Pose::new(-1, 3, Heading::South)),
        ]
        .into_iter()
        .map(|(name, pose)| (name.to_string(), pose))
        .collect();

        Self {
            border_radius: Some(4),
            obstacles,
            landmarks,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ObstacleMap
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable set of blocked cells plus the landmark table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleMap {
    blocked: HashSet<(i32, i32)>,
    landmarks: BTreeMap<String, Pose>,
    border_radius: Option<i32>,
}

impl ObstacleMap {
    /// A map with nothing blocked and no landmarks.
    pub fn open() -> Self {
        Self {
            blocked: HashSet::new(),
            landmarks: BTreeMap::new(),
            border_radius: None,
        }
    }

    pub fn builder() -> ObstacleMapBuilder {
        ObstacleMapBuilder::default()
    }

    /// Build a map from its configuration.
    pub fn from_config(config: &MapConfig) -> Self {
        let mut builder = Self::builder();
        if let Some(radius) = config.border_radius {
            builder = builder.with_border(radius);
        }
        for (name, cell) in &config.obstacles {
            builder = builder.with_obstacle(name, *cell);
        }
        for (name, pose) in &config.landmarks {
            builder = builder.with_landmark(name, *pose);
        }
        builder.build()
    }

    /// `true` if no translation may enter `(x, y)`.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.blocked.contains(&(x, y))
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn border_radius(&self) -> Option<i32> {
        self.border_radius
    }

    pub fn landmarks(&self) -> &BTreeMap<String, Pose> {
        &self.landmarks
    }

    /// Look up a landmark by name, ignoring case and surrounding whitespace.
    pub fn landmark(&self, name: &str) -> Option<(&str, Pose)> {
        let wanted = name.trim();
        self.landmarks
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(wanted))
            .map(|(k, pose)| (k.as_str(), *pose))
    }
}

impl Default for ObstacleMap {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental constructor for [`ObstacleMap`].
///
/// The landmark policy is applied once in [`build`](Self::build), so calls
/// may come in any order.
#[derive(Debug, Default)]
pub struct ObstacleMapBuilder {
    border_radius: Option<i32>,
    obstacles: HashSet<(i32, i32)>,
    landmarks: BTreeMap<String, Pose>,
}

impl ObstacleMapBuilder {
    pub fn with_border(mut self, radius: i32) -> Self {
        self.border_radius = Some(radius);
        self
    }

    /// Block a single cell. The name is only used for diagnostics.
    pub fn with_obstacle(mut self, name: &str, cell: (i32, i32)) -> Self {
        debug!(obstacle = name, x = cell.0, y = cell.1, "static obstacle");
        self.obstacles.insert(cell);
        self
    }

    pub fn with_landmark(mut self, name: &str, pose: Pose) -> Self {
        self.landmarks.insert(name.to_string(), pose);
        self
    }

    pub fn build(self) -> ObstacleMap {
        let landmark_cells: HashSet<(i32, i32)> =
            self.landmarks.values().map(Pose::cell).collect();

        let mut blocked: HashSet<(i32, i32)> = self
            .border_radius
            .map(border_cells)
            .unwrap_or_default()
            .into_iter()
            .filter(|cell| !landmark_cells.contains(cell))
            .collect();
        blocked.extend(self.obstacles);

        debug!(
            blocked = blocked.len(),
            landmarks = self.landmarks.len(),
            "obstacle map built"
        );

        ObstacleMap {
            blocked,
            landmarks: self.landmarks,
            border_radius: self.border_radius,
        }
    }
}
