use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{CapacityClass, ParticipantKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAssignment {
    pub key: ParticipantKey,
    pub team: i32,
}

/// Splits `participants` into two teams.
///
/// The list is shuffled, team 1 is filled up to `floor(n / 2)` (never more
/// than the format's per-team maximum), then team 2, and an odd leftover goes
/// to either side on a fair coin flip. Every participant appears exactly once
/// in the result.
pub fn allocate<R: Rng + ?Sized>(
    participants: &[ParticipantKey],
    capacity: CapacityClass,
    rng: &mut R,
) -> Vec<TeamAssignment> {
    let mut order = participants.to_vec();
    order.shuffle(rng);

    let per_team = (order.len() / 2).min(capacity.max_players_per_team() as usize);
    let mut team1 = 0usize;
    let mut team2 = 0usize;

    order
        .into_iter()
        .map(|key| {
            let team = if team1 < per_team {
                team1 += 1;
                1
            } else if team2 < per_team {
                team2 += 1;
                2
            } else if rng.gen_bool(0.5) {
                1
            } else {
                2
            };
            TeamAssignment { key, team }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn roster(regular: usize, temporary: usize) -> Vec<ParticipantKey> {
        (0..regular)
            .map(|_| ParticipantKey::Regular(Uuid::new_v4()))
            .chain((0..temporary).map(|_| ParticipantKey::Temporary(Uuid::new_v4())))
            .collect()
    }

    fn team_sizes(assignments: &[TeamAssignment]) -> (usize, usize) {
        let t1 = assignments.iter().filter(|a| a.team == 1).count();
        let t2 = assignments.iter().filter(|a| a.team == 2).count();
        (t1, t2)
    }

    #[test]
    fn every_participant_assigned_once() {
        let mut rng = StdRng::seed_from_u64(7);
        for total in 0..=22 {
            let players = roster(total - total / 3, total / 3);
            let result = allocate(&players, CapacityClass::F11, &mut rng);

            assert_eq!(result.len(), players.len());
            let seen: HashSet<ParticipantKey> = result.iter().map(|a| a.key).collect();
            let expected: HashSet<ParticipantKey> = players.iter().copied().collect();
            assert_eq!(seen, expected);
            assert!(result.iter().all(|a| a.team == 1 || a.team == 2));
        }
    }

    #[test]
    fn teams_within_one_player() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let players = roster(11, 4);
            let (t1, t2) = team_sizes(&allocate(&players, CapacityClass::F8, &mut rng));
            assert_eq!(t1 + t2, 15);
            assert!(t1.abs_diff(t2) <= 1);
        }
    }

    #[test]
    fn odd_leftover_lands_on_both_sides() {
        let mut rng = StdRng::seed_from_u64(1234);
        let players = roster(7, 0);
        let mut bigger_team1 = 0;
        let mut bigger_team2 = 0;
        for _ in 0..400 {
            let (t1, t2) = team_sizes(&allocate(&players, CapacityClass::F7, &mut rng));
            if t1 > t2 {
                bigger_team1 += 1;
            } else {
                bigger_team2 += 1;
            }
        }
        assert!(bigger_team1 > 100, "team 1 got the leftover {bigger_team1} times");
        assert!(bigger_team2 > 100, "team 2 got the leftover {bigger_team2} times");
    }

    #[test]
    fn resorting_reshuffles() {
        let mut rng = StdRng::seed_from_u64(99);
        let players = roster(16, 0);
        let first = allocate(&players, CapacityClass::F8, &mut rng);
        let differs = (0..20).any(|_| allocate(&players, CapacityClass::F8, &mut rng) != first);
        assert!(differs);
    }

    #[test]
    fn empty_roster_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(allocate(&[], CapacityClass::F7, &mut rng).is_empty());
    }
}
