use uuid::Uuid;

use super::RosterEngine;
use crate::error::AppResult;
use crate::models::{RosterCode, RosterOutcome};
use crate::services::match_cache::MatchSnapshot;
use crate::services::permissions::check_permission;

impl RosterEngine {
    /// Cached match summary; a miss is served from the store and repopulates
    /// the cache.
    pub async fn get_match(&self, match_id: Uuid) -> AppResult<RosterOutcome> {
        if let Some(snapshot) = self.cache.get(match_id).await {
            return Ok(RosterOutcome::ok(RosterCode::MatchFetched)
                .with("match", snapshot)
                .with("cached", true));
        }

        let mut tx = self.begin().await?;
        let Some(game) = tx.find_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        let participants = tx.list_participants(match_id).await?;
        drop(tx);

        let snapshot = MatchSnapshot::build(&game, &participants);
        self.cache.fill(&snapshot).await;

        Ok(RosterOutcome::ok(RosterCode::MatchFetched)
            .with("match", snapshot)
            .with("cached", false))
    }

    /// Full match row plus every participant, straight from the store.
    pub async fn get_roster(&self, match_id: Uuid) -> AppResult<RosterOutcome> {
        let mut tx = self.begin().await?;
        let Some(game) = tx.find_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        let participants = tx.list_participants(match_id).await?;

        Ok(RosterOutcome::ok(RosterCode::RosterFetched)
            .with("match", &game)
            .with("participants", &participants))
    }

    pub async fn get_permissions(&self, user_id: Uuid, match_id: Uuid) -> AppResult<RosterOutcome> {
        let mut tx = self.begin().await?;
        if tx.find_match(match_id).await?.is_none() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        }
        let perms = check_permission(tx.as_mut(), user_id, match_id).await?;

        Ok(RosterOutcome::ok(RosterCode::PermissionResolved).with("permissions", perms))
    }
}
