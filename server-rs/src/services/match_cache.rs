//! Denormalized `match:<id>` snapshots in Redis.
//!
//! Only reads write snapshots; every committed mutation invalidates. Entries
//! are never read back into a mutation, and a missing or unreadable entry is
//! a miss.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::Cache;
use crate::models::{Match, MatchStatus, Participant};

pub fn match_key(match_id: Uuid) -> String {
    format!("match:{match_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: Uuid,
    pub places_occupied: i32,
    pub block_spots_team1: i32,
    pub block_spots_team2: i32,
    pub has_teams: bool,
    pub status: MatchStatus,
    /// Users that currently have at least one friend on the roster.
    pub added_by: Vec<Uuid>,
}

impl MatchSnapshot {
    pub fn build(game: &Match, participants: &[Participant]) -> Self {
        let mut added_by: Vec<Uuid> = participants
            .iter()
            .filter_map(|p| match p {
                Participant::Temporary(t) => Some(t.added_by),
                Participant::Regular(_) => None,
            })
            .collect();
        added_by.sort();
        added_by.dedup();

        Self {
            id: game.id,
            places_occupied: game.places_occupied,
            block_spots_team1: game.block_spots_team1,
            block_spots_team2: game.block_spots_team2,
            has_teams: game.has_teams,
            status: game.status,
            added_by,
        }
    }
}

/// Value written over an invalidated key. Readers treat it as a miss, and
/// while it lives the read-through `SET NX` cannot land.
const HOLD: &str = "invalidated";

#[derive(Clone)]
pub struct MatchCache {
    cache: Cache,
    ttl_secs: u64,
    hold_secs: u64,
}

impl MatchCache {
    pub fn new(cache: Cache, ttl_secs: u64, hold_secs: u64) -> Self {
        Self {
            cache,
            ttl_secs,
            hold_secs,
        }
    }

    pub async fn get(&self, match_id: Uuid) -> Option<MatchSnapshot> {
        let raw = self.cache.get(&match_key(match_id)).await?;
        if raw == HOLD {
            return None;
        }
        serde_json::from_str(&raw).ok()
    }

    /// Read-through repopulation. Never replaces an existing entry or hold,
    /// so a snapshot read before a concurrent commit cannot overwrite it.
    pub async fn fill(&self, snapshot: &MatchSnapshot) -> bool {
        let Ok(json) = serde_json::to_string(snapshot) else {
            return false;
        };
        self.cache
            .set_nx(&match_key(snapshot.id), &json, self.ttl_secs)
            .await
    }

    /// Drops the entry after a committed mutation.
    pub async fn invalidate(&self, match_id: Uuid) {
        let key = match_key(match_id);
        if self.hold_secs > 0 {
            self.cache.set(&key, HOLD, self.hold_secs).await;
        } else {
            self.cache.del(&key).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapacityClass, TemporaryPlayer};
    use chrono::Utc;

    fn game() -> Match {
        Match {
            id: Uuid::new_v4(),
            location: "Camp Municipal".into(),
            starts_at: Utc::now(),
            duration_minutes: 60,
            price_cents: 500,
            capacity_class: CapacityClass::F8,
            gender: "mixed".into(),
            places_occupied: 10,
            block_spots_team1: 1,
            block_spots_team2: 0,
            has_teams: false,
            status: MatchStatus::Active,
        }
    }

    fn friend(match_id: Uuid, owner: Uuid) -> Participant {
        Participant::Temporary(TemporaryPlayer {
            id: Uuid::new_v4(),
            match_id,
            name: "Guest".into(),
            phone: "600123123".into(),
            team_number: 0,
            added_by: owner,
            substitute_requested: false,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn key_format() {
        let id = Uuid::nil();
        assert_eq!(match_key(id), format!("match:{id}"));
    }

    #[test]
    fn snapshot_collects_distinct_friend_owners() {
        let m = game();
        let owner = Uuid::new_v4();
        let snapshot = MatchSnapshot::build(&m, &[friend(m.id, owner), friend(m.id, owner)]);
        assert_eq!(snapshot.added_by, vec![owner]);
        assert_eq!(snapshot.places_occupied, 10);
    }

    #[tokio::test]
    async fn fill_then_hit() {
        let cache = MatchCache::new(Cache::local(), 43_200, 5);
        let snapshot = MatchSnapshot::build(&game(), &[]);
        assert!(cache.fill(&snapshot).await);
        assert_eq!(cache.get(snapshot.id).await, Some(snapshot));
    }

    #[tokio::test]
    async fn fill_never_replaces_a_newer_entry() {
        let cache = MatchCache::new(Cache::local(), 43_200, 5);
        let m = game();
        let fresh = MatchSnapshot::build(&m, &[]);
        let mut stale = fresh.clone();
        stale.places_occupied = 3;

        assert!(cache.fill(&fresh).await);
        assert!(!cache.fill(&stale).await);
        assert_eq!(cache.get(m.id).await.map(|s| s.places_occupied), Some(10));
    }

    #[tokio::test]
    async fn invalidation_holds_off_late_fills() {
        let cache = MatchCache::new(Cache::local(), 43_200, 5);
        let m = game();
        let before = MatchSnapshot::build(&m, &[]);
        assert!(cache.fill(&before).await);

        cache.invalidate(m.id).await;
        assert!(cache.get(m.id).await.is_none());
        // A read that started before the commit finishes after it.
        assert!(!cache.fill(&before).await);
        assert!(cache.get(m.id).await.is_none());
    }

    #[tokio::test]
    async fn zero_hold_deletes() {
        let cache = MatchCache::new(Cache::local(), 43_200, 0);
        let m = game();
        cache.fill(&MatchSnapshot::build(&m, &[])).await;
        cache.invalidate(m.id).await;
        assert!(cache.fill(&MatchSnapshot::build(&m, &[])).await);
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = MatchCache::new(Cache::disabled(), 43_200, 5);
        let m = game();
        assert!(!cache.fill(&MatchSnapshot::build(&m, &[])).await);
        assert!(cache.get(m.id).await.is_none());
        cache.invalidate(m.id).await;
    }
}
