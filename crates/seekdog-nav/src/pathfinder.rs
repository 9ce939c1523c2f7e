//! Orientation-aware A* over `(x, y, heading)`.
//!
//! The search state is a full [`Pose`]. From any state the six motion
//! actions are tried in the fixed order of [`Action::MOTIONS`]:
//!
//! | Action kind | Cost | Legal when                                         |
//! |-------------|------|----------------------------------------------------|
//! | rotate      | 1    | always                                             |
//! | move        | 2    | heading equals goal heading, target cell is open   |
//! | shift       | 3    | heading equals goal heading, target cell is open   |
//!
//! Restricting translations to the goal heading means every returned route
//! is "turn first, then walk", which is how the robot is expected to
//! approach a landmark: already facing the way it should end up.
//!
//! The heuristic is the Manhattan distance between cells. Every translation
//! costs at least 2 per cell, so it never overestimates.
//!
//! # Example
//!
//! ```rust
//! use seekdog_nav::{GridPathfinder, ObstacleMap, PathfinderConfig};
//! use seekdog_types::{Action, Heading, Pose};
//!
//! let finder = GridPathfinder::new(PathfinderConfig::default());
//! let outcome = finder.find_path(
//!     Pose::new(0, 0, Heading::South),
//!     Pose::new(2, 0, Heading::South),
//!     &ObstacleMap::open(),
//! );
//! assert_eq!(outcome.actions(), &[Action::ShiftLeft, Action::ShiftLeft]);
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use seekdog_types::{Action, ActionKind, Pose};
use tracing::{debug, instrument, warn};

use crate::obstacle_map::ObstacleMap;
use crate::pose_model::step;

/// Tuning for [`GridPathfinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathfinderConfig {
    /// Upper bound on expanded states. Guarantees termination on maps with
    /// no enclosing border.
    pub max_expansions: usize,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_expansions: 100_000,
        }
    }
}

/// Result of a path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Start and goal are the same pose; nothing to do.
    AtGoal,
    /// Ordered actions that take the start pose to the goal pose.
    Route(Vec<Action>),
    /// No route exists (or the search budget ran out).
    Unreachable,
}

impl PathOutcome {
    /// The route as a slice; empty for [`AtGoal`](Self::AtGoal) and
    /// [`Unreachable`](Self::Unreachable).
    pub fn actions(&self) -> &[Action] {
        match self {
            PathOutcome::Route(actions) => actions,
            PathOutcome::AtGoal | PathOutcome::Unreachable => &[],
        }
    }

    pub fn into_actions(self) -> Vec<Action> {
        match self {
            PathOutcome::Route(actions) => actions,
            PathOutcome::AtGoal | PathOutcome::Unreachable => Vec::new(),
        }
    }

    /// `true` unless the goal could not be reached.
    pub fn is_reachable(&self) -> bool {
        !matches!(self, PathOutcome::Unreachable)
    }
}

fn action_cost(action: Action) -> u32 {
    match action.kind() {
        ActionKind::Rotate => 1,
        ActionKind::Move => 2,
        ActionKind::Shift => 3,
        ActionKind::Stop => 0,
    }
}

fn heuristic(pose: &Pose, goal: &Pose) -> u32 {
    pose.manhattan(goal)
}

/// Frontier entry.
#[derive(Debug, Clone, Copy)]
struct Node {
    f: u32,
    g: u32,
    /// Insertion sequence number; breaks `f` ties in FIFO order.
    seq: u64,
    pose: Pose,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        (other.f, other.seq).cmp(&(self.f, self.seq))
    }
}

/// A* planner over poses.
#[derive(Debug, Clone, Default)]
pub struct GridPathfinder {
    config: PathfinderConfig,
}

impl GridPathfinder {
    pub fn new(config: PathfinderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Plan a route from `start` to `goal` avoiding blocked cells of `map`.
    ///
    /// Deterministic for equal inputs. Never fails: an impossible query
    /// yields [`PathOutcome::Unreachable`].
    #[instrument(skip_all, fields(start = %start, goal = %goal))]
    pub fn find_path(&self, start: Pose, goal: Pose, map: &ObstacleMap) -> PathOutcome {
        if start == goal {
            return PathOutcome::AtGoal;
        }
        if start.cell() != goal.cell() && map.is_blocked(goal.x, goal.y) {
            debug!("goal cell is blocked");
            return PathOutcome::Unreachable;
        }

        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<Pose, u32> = HashMap::new();
        let mut came_from: HashMap<Pose, (Pose, Action)> = HashMap::new();
        let mut closed: HashSet<Pose> = HashSet::new();
        let mut seq: u64 = 0;

        best_g.insert(start, 0);
        open.push(Node {
            f: heuristic(&start, &goal),
            g: 0,
            seq,
            pose: start,
        });

        while let Some(Node { g, pose, .. }) = open.pop() {
            if pose == goal {
                let route = reconstruct(&came_from, start, goal);
                debug!(cost = g, steps = route.len(), expanded = closed.len(), "route found");
                return PathOutcome::Route(route);
            }
            if !closed.insert(pose) {
                continue;
            }
            if closed.len() > self.config.max_expansions {
                warn!(
                    max_expansions = self.config.max_expansions,
                    "search budget exhausted"
                );
                return PathOutcome::Unreachable;
            }

            for action in Action::MOTIONS {
                if action.is_translation() && pose.heading != goal.heading {
                    continue;
                }
                let next = step(pose, action);
                if action.is_translation() && map.is_blocked(next.x, next.y) {
                    continue;
                }
                if closed.contains(&next) {
                    continue;
                }
                let tentative = g.saturating_add(action_cost(action));
                if best_g.get(&next).is_some_and(|&known| known <= tentative) {
                    continue;
                }
                best_g.insert(next, tentative);
                came_from.insert(next, (pose, action));
                seq += 1;
                open.push(Node {
                    f: tentative.saturating_add(heuristic(&next, &goal)),
                    g: tentative,
                    seq,
                    pose: next,
                });
            }
        }

        debug!(expanded = closed.len(), "frontier exhausted");
        PathOutcome::Unreachable
    }
}

fn reconstruct(came_from: &HashMap<Pose, (Pose, Action)>, start: Pose, goal: Pose) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&(parent, action)) => {
                actions.push(action);
                current = parent;
            }
            None => break,
        }
    }
    actions.reverse();
    actions
}

/// [`GridPathfinder::find_path`] with the default configuration.
pub fn find_path(start: Pose, goal: Pose, map: &ObstacleMap) -> PathOutcome {
    GridPathfinder::default().find_path(start, goal, map)
}
