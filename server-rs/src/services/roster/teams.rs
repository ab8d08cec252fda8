use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use super::{find_participant, save_participant, CacheEffect, RosterEngine};
use crate::error::AppResult;
use crate::models::{
    opposite_team, BlockSpotsRequest, ParticipantKey, RosterCode, RosterOutcome,
    TargetPlayerRequest,
};
use crate::services::occupancy::{self, RosterChange};
use crate::services::permissions::check_permission;
use crate::services::team_sort;

impl RosterEngine {
    /// Moves a participant to the other side. Unassigned players go to team 1.
    pub async fn switch_team(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: TargetPlayerRequest,
    ) -> AppResult<RosterOutcome> {
        let key = match (req.player_id, req.is_temporary) {
            (Some(id), is_temporary) => ParticipantKey::new(id, is_temporary),
            (None, false) => ParticipantKey::Regular(user_id),
            (None, true) => {
                return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                    .with_message("playerId is required for temporary players"))
            }
        };

        let mut tx = self.begin().await?;
        let Some(game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }

        let Some(mut participant) = find_participant(tx.as_mut(), match_id, key).await? else {
            return Ok(RosterOutcome::fail(RosterCode::PlayerNotFound));
        };
        let new_team = opposite_team(participant.team_number());
        participant.set_team_number(new_team);
        save_participant(tx.as_mut(), participant).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Keep).await;
        tracing::info!(%match_id, %user_id, ?key, new_team, "team switched");

        Ok(RosterOutcome::ok(RosterCode::TeamSwitchedSuccessfully).with("new_team", new_team))
    }

    /// Sets the blocked-spot count for one team and moves occupancy by the
    /// difference.
    pub async fn block_spots(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: BlockSpotsRequest,
    ) -> AppResult<RosterOutcome> {
        if req.team != 1 && req.team != 2 {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("team must be 1 or 2"));
        }
        if req.count < 0 {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("count must not be negative"));
        }

        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        let perms = check_permission(tx.as_mut(), user_id, match_id).await?;
        if !perms.has_permission {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }

        let previous = game.blocked_spots(req.team);
        let delta = occupancy::compute_delta(RosterChange::BlockSpots {
            previous,
            next: req.count,
        });
        let free = game.capacity() - game.places_occupied;
        if delta > free {
            return Ok(RosterOutcome::fail(RosterCode::MatchFull)
                .with_message("not enough free places to block")
                .with("free_places", free.max(0)));
        }
        game.set_blocked_spots(req.team, req.count);
        let places = occupancy::apply(tx.as_mut(), &mut game, delta).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, team = req.team, previous, count = req.count, "spots blocked");

        Ok(RosterOutcome::ok(RosterCode::SpotsBlockedSuccessfully)
            .with("team", req.team)
            .with("block_spots", req.count)
            .with("updated_places_occupied", places))
    }

    /// Randomly splits every participant into two balanced teams.
    pub async fn sort_teams(&self, user_id: Uuid, match_id: Uuid) -> AppResult<RosterOutcome> {
        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        let perms = check_permission(tx.as_mut(), user_id, match_id).await?;
        if !perms.has_permission {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }

        let participants = tx.list_participants(match_id).await?;
        let keys: Vec<ParticipantKey> = participants.iter().map(|p| p.key()).collect();
        let assignments: HashMap<ParticipantKey, i32> = {
            let mut rng = StdRng::from_entropy();
            team_sort::allocate(&keys, game.capacity_class, &mut rng)
                .into_iter()
                .map(|a| (a.key, a.team))
                .collect()
        };

        let mut team1 = 0;
        let mut team2 = 0;
        for mut participant in participants {
            let team = assignments
                .get(&participant.key())
                .copied()
                .unwrap_or(1);
            if team == 1 {
                team1 += 1;
            } else {
                team2 += 1;
            }
            participant.set_team_number(team);
            save_participant(tx.as_mut(), participant).await?;
        }

        game.has_teams = true;
        tx.save_match(game).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, team1, team2, "teams sorted");

        Ok(RosterOutcome::ok(RosterCode::TeamsSortedSuccessfully)
            .with("team1", team1)
            .with("team2", team2))
    }
}
