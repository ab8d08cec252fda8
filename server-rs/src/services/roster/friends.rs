use chrono::Utc;
use uuid::Uuid;

use super::{refund_failure, vacate, CacheEffect, RosterEngine};
use crate::error::AppResult;
use crate::models::{
    is_valid_team, AddFriendRequest, Participant, RosterCode, RosterOutcome, TemporaryPlayer,
};
use crate::services::occupancy::{self, RosterChange};

impl RosterEngine {
    pub async fn add_friend(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        req: AddFriendRequest,
    ) -> AppResult<RosterOutcome> {
        let name = req.name.trim();
        let phone = req.phone.trim();
        let team = req.team.unwrap_or(0);
        if name.is_empty() || phone.is_empty() {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("name and phone are required"));
        }
        if !is_valid_team(team) {
            return Ok(RosterOutcome::fail(RosterCode::BadRequest)
                .with_message("team must be 0, 1 or 2"));
        }

        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }
        if tx.find_user(user_id).await?.is_none() {
            return Ok(RosterOutcome::fail(RosterCode::UserNotFound));
        }
        if !game.has_free_place() {
            return Ok(RosterOutcome::fail(RosterCode::MatchFull));
        }

        let friend = TemporaryPlayer {
            id: Uuid::new_v4(),
            match_id,
            name: name.to_string(),
            phone: phone.to_string(),
            team_number: team,
            added_by: user_id,
            substitute_requested: false,
            created_at: Utc::now(),
        };
        let friend_id = friend.id;
        tx.insert_temporary(friend).await?;

        // The owner need not be on the roster to bring a friend.
        if let Some(mut owner_seat) = tx.find_player(match_id, user_id).await? {
            if !owner_seat.has_added_friend {
                owner_seat.has_added_friend = true;
                tx.save_player(owner_seat).await?;
            }
        }

        let places = occupancy::apply(
            tx.as_mut(),
            &mut game,
            occupancy::compute_delta(RosterChange::AddFriend),
        )
        .await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, %friend_id, "friend added");

        Ok(RosterOutcome::ok(RosterCode::FriendAddedSuccessfully)
            .with("temporary_player_id", friend_id)
            .with("team", team)
            .with("updated_places_occupied", places))
    }

    /// Owner-only removal of a friend, closed inside the friend removal window.
    pub async fn remove_friend(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> AppResult<RosterOutcome> {
        let mut tx = self.begin().await?;
        let Some(mut game) = tx.lock_match(match_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotFound));
        };
        if !game.is_active() {
            return Ok(RosterOutcome::fail(RosterCode::MatchNotActive));
        }

        let Some(friend) = tx.find_temporary(match_id, temp_id).await? else {
            return Ok(RosterOutcome::fail(RosterCode::TemporaryPlayerNotFound));
        };
        if friend.added_by != user_id {
            return Ok(RosterOutcome::fail(RosterCode::Unauthorized));
        }
        if game.starts_within(Utc::now(), self.policy.friend_removal_cutoff_hours) {
            return Ok(RosterOutcome::fail(RosterCode::TooLateToRemove)
                .with("can_request_substitute", true));
        }

        let vacated = match vacate(tx.as_mut(), &game, &Participant::Temporary(friend)).await {
            Ok(Some(vacated)) => vacated,
            Ok(None) => return Ok(RosterOutcome::fail(RosterCode::TemporaryPlayerNotFound)),
            Err(e) => return refund_failure(e, RosterCode::OperationFailed),
        };
        let remaining = tx.count_friends_of(match_id, user_id).await?;

        let places = occupancy::apply(
            tx.as_mut(),
            &mut game,
            occupancy::compute_delta(RosterChange::RemoveFriend),
        )
        .await?;
        tx.commit().await?;

        self.after_commit(match_id, CacheEffect::Invalidate).await;
        tracing::info!(%match_id, %user_id, friend_id = %temp_id, "friend removed");

        Ok(RosterOutcome::ok(RosterCode::FriendRemovedSuccessfully)
            .with("updated_places_occupied", places)
            .with("remaining_friends", remaining))
    }
}
