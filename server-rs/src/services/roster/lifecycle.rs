use uuid::Uuid;

use super::{refund_failure, CacheEffect, RosterEngine};
use crate::error::AppResult;
use crate::models::{
    CreateMatchRequest, Match, MatchStatus, Participant, PlayerFlagsRequest, RosterCode,
    RosterOutcome,
};
use crate::services::ledger;
use crate::services::permissions::check_permission;

impl RosterEngine {
    /// Global admins only. The match starts active and empty.
    pub async fn create_match(
        &self,
        user_id: Uuid,
        req: CreateMatchRequest,
    ) -> AppResult<RosterOutcome> {
        let location = req.location.trim();
        let gender = req.gender.trim();
        if location.is_empty() {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("location is required"));
        }
        if req.duration_minutes <= 0 {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("durationMinutes must be positive"));
        }
        if req.price_cents < 0 {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("priceCents must not be negative"));
        }

        let mut tx = self.begin().await?;
        let is_admin = tx
            .find_user(user_id)
            .await?
            .map(|u| u.is_admin)
            .unwrap_or(false);
        if !is_admin {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }

        let game = Match {
            id: Uuid::new_v4(),
            location: location.to_string(),
            starts_at: req.starts_at,
            duration_minutes: req.duration_minutes,
            price_cents: req.price_cents,
            capacity_class: req.capacity_class,
            gender: if gender.is_empty() { "mixed".to_string() } else { gender.to_string() },
            places_occupied: 0,
            block_spots_team1: 0,
            block_spots_team2: 0,
            has_teams: false,
            status: MatchStatus::Active,
        };
        tx.insert_match(game.clone()).await?;
        tx.commit().await?;

        self.after_commit(game.id, CacheEffect::Keep).await;
        tracing::info!(match_id = %game.id, %user_id, capacity = ?game.capacity_class, "match created");

        Ok(RosterOutcome::ok(RosterCode::MatchCreatedSuccessfully).with("match", &game))
    }

    /// Cancels the match and refunds every seat paid from balance. Any
    /// refund failure aborts the whole cancellation.
    pub async fn cancel_match(&self, user_id: Uuid, match_id: Uuid) -> AppResult<RosterOutcome> {
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

        let mut paid: Vec<_> = tx
            .list_participants(match_id)
            .await?
            .into_iter()
            .filter_map(|p| match p {
                Participant::Regular(player) if player.has_entered_with_balance => Some(player),
                _ => None,
            })
            .collect();
        paid.sort_by_key(|p| p.user_id);

        let mut refunded_cents = 0i64;
        for mut player in paid.iter().cloned() {
            if let Err(e) = ledger::credit(tx.as_mut(), player.user_id, game.price_cents).await {
                return refund_failure(e, RosterCode::InternalServerError);
            }
            refunded_cents += game.price_cents;
            player.has_entered_with_balance = false;
            tx.save_player(player).await?;
        }

        game.status = MatchStatus::Cancelled;
        tx.save_match(game).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, refunded_players = paid.len(), refunded_cents, "match cancelled");

        Ok(RosterOutcome::ok(RosterCode::MatchCancelledSuccessfully)
            .with("refunded_players", paid.len())
            .with("refunded_cents", refunded_cents))
    }

    pub async fn finish_match(&self, user_id: Uuid, match_id: Uuid) -> AppResult<RosterOutcome> {
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

        game.status = MatchStatus::Finished;
        tx.save_match(game).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, "match finished");

        Ok(RosterOutcome::ok(RosterCode::MatchFinishedSuccessfully))
    }

    /// Admin edit of a player's payment flags. Granting or revoking match
    /// admin rights needs a global admin. Allowed after the match ends so
    /// payments can still be recorded.
    pub async fn update_player_flags(
        &self,
        caller_id: Uuid,
        match_id: Uuid,
        player_id: Uuid,
        req: PlayerFlagsRequest,
    ) -> AppResult<RosterOutcome> {
        if req.is_empty() {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("no flags to update"));
        }

        let mut tx = self.begin().await?;
        if tx.lock_match(match_id).await?.is_none() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        }
        let perms = check_permission(tx.as_mut(), caller_id, match_id).await?;
        if !perms.has_permission || (req.has_match_admin.is_some() && !perms.is_global_admin) {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }

        let Some(mut player) = tx.find_player(match_id, player_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::PlayerNotFound));
        };
        if let Some(v) = req.has_paid {
            player.has_paid = v;
        }
        if let Some(v) = req.has_discount {
            player.has_discount = v;
        }
        if let Some(v) = req.has_gratis {
            player.has_gratis = v;
        }
        if let Some(v) = req.has_match_admin {
            player.has_match_admin = v;
        }
        tx.save_player(player.clone()).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Keep).await;
        tracing::info!(%match_id, %player_id, %caller_id, "player flags updated");

        Ok(RosterOutcome::ok(RosterCode::PlayerUpdatedSuccessfully).with("player", &player))
    }
}
