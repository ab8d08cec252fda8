use chrono::Utc;
use uuid::Uuid;

use super::{debit_failure, find_participant, refund_failure, vacate, CacheEffect, RosterEngine};
use crate::error::AppResult;
use crate::models::{
    is_valid_team, JoinMatchRequest, LeaveMatchRequest, Participant, ParticipantKey,
    RegularPlayer, RosterCode, RosterOutcome,
};
use crate::services::ledger;
use crate::services::occupancy::{self, RosterChange};
use crate::services::permissions::check_permission;

impl RosterEngine {
    /// Adds the caller to the roster, optionally paying from their balance.
    ///
    /// A full match can still be joined while someone has asked for a
    /// substitute: the oldest such seat is vacated (and refunded) and the
    /// joiner takes its team. Occupancy does not move in that case.
    pub async fn join_match(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: JoinMatchRequest,
    ) -> AppResult<RosterOutcome> {
        if let Some(team) = req.team {
            if !is_valid_team(team) {
                return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                    .with_message("team must be 0, 1 or 2"));
            }
        }

        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }
        if tx.find_player(match_id, user_id).await?.is_some() {
            return Ok(RosterOutcome::fail(RosterCode::PlayerAlreadyInMatch));
        }
        if tx.find_user(user_id).await?.is_none() {
            return Ok(RosterOutcome::fail(RosterCode::UserNotFound));
        }

        let mut replaced: Option<Participant> = None;
        if !game.has_free_place() {
            let participants = tx.list_participants(match_id).await?;
            replaced = participants
                .into_iter()
                .filter(|p| p.substitute_requested())
                .min_by_key(|p| p.entered_at());
            if replaced.is_none() {
                return Ok(RosterOutcome::fail(RosterCode::MatchFull));
            }
        }

        // Lock both balances in id order before touching either.
        if let Some(Participant::Regular(seat)) = &replaced {
            if seat.has_entered_with_balance && req.with_balance {
                let mut ids = [seat.user_id, user_id];
                ids.sort();
                for id in ids {
                    tx.lock_user(id).await?;
                }
            }
        }

        let mut refunded_cents = 0;
        let mut released_owner = None;
        if let Some(seat) = &replaced {
            match vacate(tx.as_mut(), &game, seat).await {
                Ok(Some(vacated)) => {
                    refunded_cents = vacated.refunded_cents;
                    released_owner = vacated.released_owner;
                }
                Ok(None) => return Ok(RosterOutcome::fail(RosterCode::OperationFailed)),
                Err(e) => return refund_failure(e, RosterCode::BalanceUpdateFailed),
            }
        }

        let new_balance = if req.with_balance {
            match ledger::debit(tx.as_mut(), user_id, game.price_cents).await {
                Ok(receipt) => Some(receipt.new_balance),
                Err(e) => return debit_failure(e),
            }
        } else {
            None
        };

        let team = match &replaced {
            Some(seat) => seat.team_number(),
            None => req.team.unwrap_or(0),
        };
        let mut player = RegularPlayer::new(match_id, user_id, team);
        player.has_entered_with_balance = req.with_balance;
        tx.insert_player(player).await?;

        let places = if replaced.is_some() {
            game.places_occupied
        } else {
            occupancy::apply(
                tx.as_mut(),
                &mut game,
                occupancy::compute_delta(RosterChange::Join),
            )
            .await?
        };
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;

        tracing::info!(%match_id, %user_id, team, with_balance = req.with_balance, "player joined");

        let mut outcome = RosterOutcome::ok(RosterCode::PlayerJoinedSuccessfully)
            .with("updated_places_occupied", places)
            .with("team", team);
        if let Some(balance) = new_balance {
            outcome = outcome.with("new_balance", balance);
        }
        if let Some(seat) = &replaced {
            outcome = outcome
                .with("replaced", seat.key())
                .with("refunded_cents", refunded_cents);
            if let Some(owner) = released_owner {
                outcome = outcome.with("released_friend_owner", owner);
            }
        }
        Ok(outcome)
    }

    /// Removes a regular player. Callers may remove themselves; removing
    /// someone else needs admin rights. Both honour the leave window.
    pub async fn leave_match(
        &self,
        caller_id: Uuid,
        match_id: Uuid,
        req: LeaveMatchRequest,
    ) -> AppResult<RosterOutcome> {
        let target_id = req.user_id.unwrap_or(caller_id);

        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }
        if target_id != caller_id {
            let perms = check_permission(tx.as_mut(), caller_id, match_id).await?;
            if !perms.has_permission {
                return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
            }
        }

        let Some(player) = tx.find_player(match_id, target_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::PlayerNotFound));
        };
        if game.starts_within(Utc::now(), self.policy.leave_cutoff_hours) {
            return Ok(RosterOutcome::fail(RosterCode::TooLateToLeave)
                .with("can_request_substitute", true));
        }

        let refunded_cents = match vacate(tx.as_mut(), &game, &Participant::Regular(player)).await
        {
            Ok(Some(vacated)) => vacated.refunded_cents,
            Ok(None) => return Ok(RosterOutcome::fail(RosterCode::PlayerNotFound)),
            Err(e) => return refund_failure(e, RosterCode::BalanceUpdateFailed),
        };

        let places = occupancy::apply(
            tx.as_mut(),
            &mut game,
            occupancy::compute_delta(RosterChange::Leave),
        )
        .await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, user_id = %target_id, %caller_id, refunded_cents, "player left");

        Ok(RosterOutcome::ok(RosterCode::PlayerLeftSuccessfully)
            .with("updated_places_occupied", places)
            .with("refunded_cents", refunded_cents))
    }

    /// Admin removal of any participant, regardless of the leave window.
    pub async fn admin_remove_player(
        &self,
        caller_id: Uuid,
        match_id: Uuid,
        player_id: Uuid,
        is_temporary: bool,
    ) -> AppResult<RosterOutcome> {
        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        let perms = check_permission(tx.as_mut(), caller_id, match_id).await?;
        if !perms.has_permission {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }

        let key = ParticipantKey::new(player_id, is_temporary);
        let Some(seat) = find_participant(tx.as_mut(), match_id, key).await? else {
            let code = if is_temporary {
                RosterCode::TemporaryPlayerNotFound
            } else {
                RosterCode::PlayerNotFound
            };
            return Ok(RosterOutcome::fail(code));
        };

        let vacated = match vacate(tx.as_mut(), &game, &seat).await {
            Ok(Some(vacated)) => vacated,
            Ok(None) => return Ok(RosterOutcome::fail(RosterCode::OperationFailed)),
            Err(e) => return refund_failure(e, RosterCode::BalanceUpdateFailed),
        };

        let change = if is_temporary {
            RosterChange::RemoveFriend
        } else {
            RosterChange::Leave
        };
        let places =
            occupancy::apply(tx.as_mut(), &mut game, occupancy::compute_delta(change)).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %player_id, is_temporary, %caller_id, "player removed by admin");

        Ok(RosterOutcome::ok(RosterCode::PlayerRemovedSuccessfully)
            .with("updated_places_occupied", places)
            .with("refunded_cents", vacated.refunded_cents))
    }
}
