use uuid::Uuid;

use super::{find_participant, save_participant, CacheEffect, RosterEngine};
use crate::error::AppResult;
use crate::models::{ParticipantKey, RosterCode, RosterOutcome, TargetPlayerRequest};
use crate::services::permissions::check_permission;

impl RosterEngine {
    pub async fn request_substitute(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: TargetPlayerRequest,
    ) -> AppResult<RosterOutcome> {
        self.set_substitute_flag(user_id, match_id, req, true).await
    }

    /// Clears a pending substitute request. Repeating it is harmless: the
    /// second call reports `NO_SUBSTITUTE_REQUESTED` and changes nothing.
    pub async fn cancel_substitution_request(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: TargetPlayerRequest,
    ) -> AppResult<RosterOutcome> {
        self.set_substitute_flag(user_id, match_id, req, false).await
    }

    async fn set_substitute_flag(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: TargetPlayerRequest,
        requested: bool,
    ) -> AppResult<RosterOutcome> {
        let key = match req.player_id {
            Some(id) => ParticipantKey::new(id, req.is_temporary),
            None if !req.is_temporary => ParticipantKey::Regular(user_id),
            None => {
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
            let code = if key.is_temporary() {
                RosterCode::TemporaryPlayerNotFound
            } else {
                RosterCode::PlayerNotFound
            };
            return Ok(RosterOutcome::fail(code));
        };

        // The seat holder (or a friend's owner) manages their own request.
        if participant.responsible_user() != user_id {
            let perms = check_permission(tx.as_mut(), user_id, match_id).await?;
            if !perms.has_permission {
                return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
            }
        }

        match (requested, participant.substitute_requested()) {
            (true, true) => return Ok(RosterOutcome::fail(RosterCode::SubstituteAlreadyRequested)),
            (false, false) => return Ok(RosterOutcome::fail(RosterCode::NoSubstituteRequested)),
            _ => {}
        }

        participant.set_substitute_requested(requested);
        save_participant(tx.as_mut(), participant).await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Keep).await;

        let code = if requested {
            RosterCode::SubstituteRequestedSuccessfully
        } else {
            RosterCode::SubstituteRequestCancelled
        };
        tracing::info!(%match_id, %user_id, ?key, ?code, "substitute flag updated");

        Ok(RosterOutcome::ok(code).with("player", key))
    }
}
