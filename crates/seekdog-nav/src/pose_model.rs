//! Pose transition model.
//!
//! [`step`] is the single definition of what each [`Action`] does to a
//! [`Pose`]. Planning, simulation and pose correction all go through it.

use seekdog_types::{Action, Pose};

/// Apply one action to a pose and return the resulting pose.
///
/// Total, deterministic and pure. Translations displace `(x, y)` by one cell
/// along (move) or across (shift) the facing axis; turns rotate the heading
/// by a quarter turn; [`Action::Stop`] is the identity.
///
/// Coordinates saturate at the `i32` range: a translation off the edge of
/// the representable grid leaves that coordinate where it is.
pub fn step(pose: Pose, action: Action) -> Pose {
    let (fx, fy) = pose.heading.forward_delta();
    let (rx, ry) = pose.heading.right_delta();
    let shifted = |dx: i32, dy: i32| {
        Pose::new(pose.x.saturating_add(dx), pose.y.saturating_add(dy), pose.heading)
    };
    match action {
        Action::MoveForward => shifted(fx, fy),
        Action::MoveBackward => shifted(-fx, -fy),
        Action::ShiftRight => shifted(rx, ry),
        Action::ShiftLeft => shifted(-rx, -ry),
        Action::TurnRight => pose.with_heading(pose.heading.turned_right()),
        Action::TurnLeft => pose.with_heading(pose.heading.turned_left()),
        Action::Stop => pose,
    }
}

/// Fold a whole action sequence through [`step`].
pub fn replay(start: Pose, actions: &[Action]) -> Pose {
    actions.iter().fold(start, |pose, action| step(pose, *action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seekdog_types::Heading;

    fn all_actions() -> impl Iterator<Item = Action> {
        Action::MOTIONS.into_iter().chain([Action::Stop])
    }

    fn sample_poses() -> Vec<Pose> {
        let mut poses = Vec::new();
        for x in [-3, 0, 7] {
            for y in [-5, 0, 2] {
                for h in Heading::ALL {
                    poses.push(Pose::new(x, y, h));
                }
            }
        }
        poses
    }

    #[test]
    fn step_then_inverse_is_identity() {
        for p in sample_poses() {
            for a in all_actions() {
                assert_eq!(step(step(p, a), a.inverse()), p, "pose {p} action {a}");
            }
        }
    }

    #[test]
    fn move_forward_follows_heading_table() {
        let origin = |h| Pose::new(0, 0, h);
        assert_eq!(step(origin(Heading::North), Action::MoveForward).cell(), (0, 1));
        assert_eq!(step(origin(Heading::East), Action::MoveForward).cell(), (1, 0));
        assert_eq!(step(origin(Heading::South), Action::MoveForward).cell(), (0, -1));
        assert_eq!(step(origin(Heading::West), Action::MoveForward).cell(), (-1, 0));
    }

    #[test]
    fn shift_right_follows_heading_table() {
        let origin = |h| Pose::new(0, 0, h);
        assert_eq!(step(origin(Heading::North), Action::ShiftRight).cell(), (1, 0));
        assert_eq!(step(origin(Heading::East), Action::ShiftRight).cell(), (0, -1));
        assert_eq!(step(origin(Heading::South), Action::ShiftRight).cell(), (-1, 0));
        assert_eq!(step(origin(Heading::West), Action::ShiftRight).cell(), (0, 1));
    }

    #[test]
    fn translations_keep_heading_and_turns_keep_cell() {
        for p in sample_poses() {
            for a in Action::MOTIONS {
                let next = step(p, a);
                if a.is_translation() {
                    assert_eq!(next.heading, p.heading);
                    assert_eq!(next.manhattan(&p), 1);
                } else {
                    assert_eq!(next.cell(), p.cell());
                    assert_ne!(next.heading, p.heading);
                }
            }
        }
    }

    #[test]
    fn turn_left_from_north_wraps_to_west() {
        let p = step(Pose::new(0, 0, Heading::North), Action::TurnLeft);
        assert_eq!(p.heading, Heading::West);
        assert_eq!(p.heading.degrees(), 270);
    }

    #[test]
    fn stop_is_identity() {
        for p in sample_poses() {
            assert_eq!(step(p, Action::Stop), p);
        }
    }

    #[test]
    fn replay_folds_in_order() {
        let start = Pose::new(0, 0, Heading::South);
        let end = replay(
            start,
            &[Action::TurnLeft, Action::MoveForward, Action::MoveForward],
        );
        assert_eq!(end, Pose::new(2, 0, Heading::East));
        assert_eq!(replay(start, &[]), start);
    }

    #[test]
    fn translations_saturate_at_grid_edge() {
        let east_edge = Pose::new(i32::MAX, 0, Heading::East);
        assert_eq!(step(east_edge, Action::MoveForward), east_edge);
        assert_eq!(
            step(east_edge, Action::MoveBackward),
            Pose::new(i32::MAX - 1, 0, Heading::East)
        );

        let south_west = Pose::new(i32::MIN, i32::MIN, Heading::South);
        assert_eq!(step(south_west, Action::MoveForward), south_west);
        assert_eq!(step(south_west, Action::ShiftRight), south_west);
        assert_eq!(
            step(south_west, Action::ShiftLeft),
            Pose::new(i32::MIN + 1, i32::MIN, Heading::South)
        );
    }
}
