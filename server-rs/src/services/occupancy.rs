use crate::models::Match;
use crate::store::{RosterTx, StoreResult};

/// A roster change as seen by the occupancy counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    Join,
    Leave,
    AddFriend,
    RemoveFriend,
    /// Blocked spots for one team went from `previous` to `next`.
    BlockSpots { previous: i32, next: i32 },
}

pub fn compute_delta(change: RosterChange) -> i32 {
    match change {
        RosterChange::Join | RosterChange::AddFriend => 1,
        RosterChange::Leave | RosterChange::RemoveFriend => -1,
        RosterChange::BlockSpots { previous, next } => next - previous,
    }
}

/// `current + delta`, kept within `[0, capacity]`.
pub fn clamped(current: i32, delta: i32, capacity: i32) -> i32 {
    current.saturating_add(delta).clamp(0, capacity.max(0))
}

/// Applies `delta` to the match and writes it through the open transaction.
/// Returns the new `places_occupied`.
pub async fn apply(tx: &mut dyn RosterTx, game: &mut Match, delta: i32) -> StoreResult<i32> {
    game.places_occupied = clamped(game.places_occupied, delta, game.capacity());
    tx.save_match(game.clone()).await?;
    Ok(game.places_occupied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_changes_move_by_one() {
        assert_eq!(compute_delta(RosterChange::Join), 1);
        assert_eq!(compute_delta(RosterChange::AddFriend), 1);
        assert_eq!(compute_delta(RosterChange::Leave), -1);
        assert_eq!(compute_delta(RosterChange::RemoveFriend), -1);
    }

    #[test]
    fn block_spots_use_signed_difference() {
        assert_eq!(
            compute_delta(RosterChange::BlockSpots { previous: 1, next: 3 }),
            2
        );
        assert_eq!(
            compute_delta(RosterChange::BlockSpots { previous: 4, next: 0 }),
            -4
        );
    }

    #[test]
    fn never_negative() {
        assert_eq!(clamped(0, -1, 16), 0);
        assert_eq!(clamped(2, -5, 16), 0);
    }

    #[test]
    fn never_above_capacity() {
        assert_eq!(clamped(16, 1, 16), 16);
        assert_eq!(clamped(10, 10, 14), 14);
        assert_eq!(clamped(10, 2, 16), 12);
    }

    #[test]
    fn bound_holds_over_any_sequence() {
        let capacity = 14;
        let mut occupied = 0;
        let changes = [
            RosterChange::Join,
            RosterChange::AddFriend,
            RosterChange::BlockSpots { previous: 0, next: 3 },
            RosterChange::Join,
            RosterChange::Leave,
            RosterChange::BlockSpots { previous: 3, next: 0 },
            RosterChange::RemoveFriend,
            RosterChange::Leave,
            RosterChange::Leave,
            RosterChange::Leave,
        ];
        for change in changes {
            occupied = clamped(occupied, compute_delta(change), capacity);
            assert!((0..=capacity).contains(&occupied));
        }
        assert_eq!(occupied, 0);
    }
}
