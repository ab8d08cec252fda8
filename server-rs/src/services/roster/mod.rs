//! Roster mutation engine.
//!
//! Every operation opens exactly one store transaction, locks the match row
//! first, and returns a [`RosterOutcome`]. Business-rule failures come back as
//! `Ok(outcome)` with `success == false` after dropping (rolling back) the
//! transaction; only infrastructure failures are `Err`. Cache and
//! revalidation side effects run after commit and never change the result.

mod friends;
mod lifecycle;
mod membership;
mod queries;
mod substitutes;
mod teams;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::RosterPolicy;
use crate::error::{AppError, AppResult};
use crate::models::{Match, Participant, ParticipantKey, RosterCode, RosterOutcome};
use crate::services::ledger::{self, LedgerError};
use crate::services::match_cache::MatchCache;
use crate::services::revalidation::Revalidator;
use crate::store::{RosterStore, RosterTx, StoreResult};

#[derive(Clone)]
pub struct RosterEngine {
    store: Arc<dyn RosterStore>,
    cache: MatchCache,
    revalidator: Revalidator,
    policy: RosterPolicy,
}

/// What the cache should do once a mutation has committed.
enum CacheEffect {
    Invalidate,
    /// The mutation touched nothing the snapshot carries.
    Keep,
}

/// A seat removed by [`vacate`].
struct Vacated {
    refunded_cents: i64,
    /// Set when a friend was removed and its owner has none left.
    released_owner: Option<Uuid>,
}

impl RosterEngine {
    pub fn new(
        store: Arc<dyn RosterStore>,
        cache: MatchCache,
        revalidator: Revalidator,
        policy: RosterPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            revalidator,
            policy,
        }
    }

    pub fn policy(&self) -> RosterPolicy {
        self.policy
    }

    async fn begin(&self) -> StoreResult<Box<dyn RosterTx>> {
        self.store.begin().await
    }

    /// Awaited before the response so one request's cache writes stay in
    /// order; every cache call is bounded and failures only log.
    async fn after_commit(&self, match_id: Uuid, effect: CacheEffect) {
        if let CacheEffect::Invalidate = effect {
            self.cache.invalidate(match_id).await;
        }
        self.revalidator.notify_match(match_id);
    }
}

/// Loads a participant by key without locking.
async fn find_participant(
    tx: &mut dyn RosterTx,
    match_id: Uuid,
    key: ParticipantKey,
) -> StoreResult<Option<Participant>> {
    Ok(match key {
        ParticipantKey::Regular(user_id) => tx
            .find_player(match_id, user_id)
            .await?
            .map(Participant::Regular),
        ParticipantKey::Temporary(id) => tx
            .find_temporary(match_id, id)
            .await?
            .map(Participant::Temporary),
    })
}

async fn save_participant(tx: &mut dyn RosterTx, participant: Participant) -> StoreResult<()> {
    match participant {
        Participant::Regular(p) => tx.save_player(p).await,
        Participant::Temporary(t) => tx.save_temporary(t).await,
    }
}

/// Clears `has_added_friend` on the owner's seat once their last friend is
/// gone. Returns how many friends the owner still has.
async fn release_friend_flag(
    tx: &mut dyn RosterTx,
    match_id: Uuid,
    owner: Uuid,
) -> StoreResult<i64> {
    let remaining = tx.count_friends_of(match_id, owner).await?;
    if remaining == 0 {
        if let Some(mut player) = tx.find_player(match_id, owner).await? {
            if player.has_added_friend {
                player.has_added_friend = false;
                tx.save_player(player).await?;
            }
        }
    }
    Ok(remaining)
}

/// Deletes a seat and refunds the match price when it was paid from balance.
/// Occupancy is left to the caller. `Ok(None)` means nothing was deleted.
async fn vacate(
    tx: &mut dyn RosterTx,
    game: &Match,
    seat: &Participant,
) -> Result<Option<Vacated>, LedgerError> {
    match seat {
        Participant::Regular(player) => {
            if !tx.delete_player(game.id, player.user_id).await? {
                return Ok(None);
            }
            let mut refunded_cents = 0;
            if player.has_entered_with_balance {
                ledger::credit(tx, player.user_id, game.price_cents).await?;
                refunded_cents = game.price_cents;
            }
            Ok(Some(Vacated {
                refunded_cents,
                released_owner: None,
            }))
        }
        Participant::Temporary(temp) => {
            if !tx.delete_temporary(game.id, temp.id).await? {
                return Ok(None);
            }
            let remaining = release_friend_flag(tx, game.id, temp.added_by).await?;
            Ok(Some(Vacated {
                refunded_cents: 0,
                released_owner: (remaining == 0).then_some(temp.added_by),
            }))
        }
    }
}

/// Turns a failed debit into an outcome. Store failures stay errors.
fn debit_failure(err: LedgerError) -> AppResult<RosterOutcome> {
    match err {
        LedgerError::InsufficientBalance { balance, amount } => {
            Ok(RosterOutcome::fail(RosterCode::InsufficientBalance)
                .with("balance", balance)
                .with("required", amount))
        }
        LedgerError::UserNotFound(_) => Ok(RosterOutcome::fail(RosterCode::UserNotFound)),
        LedgerError::InvalidAmount(amount) => Err(AppError::Internal(format!(
            "invalid match price {amount}"
        ))),
        LedgerError::Store(e) => Err(e.into()),
    }
}

/// Turns a failed refund into `code`. Store failures stay errors.
fn refund_failure(err: LedgerError, code: RosterCode) -> AppResult<RosterOutcome> {
    match err {
        LedgerError::Store(e) => Err(e.into()),
        other => {
            tracing::error!("Refund failed: {other}");
            Ok(RosterOutcome::fail(code))
        }
    }
}
