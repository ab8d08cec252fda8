//! Transactional access to the authoritative roster data.
//!
//! Every roster mutation opens one [`RosterTx`], locks the match row before
//! anything else, and either commits or drops the transaction. Dropping a
//! transaction without committing rolls back every write made through it.

pub mod memory;
pub mod postgres;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::models::{Match, Participant, RegularPlayer, TemporaryPlayer, UserAccount};

pub use memory::MemoryRosterStore;
pub use postgres::PgRosterStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by store backends regardless of the underlying database.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub trait RosterStore: Send + Sync {
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn RosterTx>>>;
    fn health_check(&self) -> BoxFuture<'_, StoreResult<()>>;
}

/// One open transaction. `lock_*` methods take row locks that are held until
/// commit or rollback; `find_*` methods are plain reads.
pub trait RosterTx: Send {
    fn find_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>>;
    fn lock_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>>;
    fn set_user_balance(&mut self, user_id: Uuid, balance_cents: i64)
        -> BoxFuture<'_, StoreResult<()>>;

    fn find_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>>;
    fn lock_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>>;
    fn insert_match(&mut self, m: Match) -> BoxFuture<'_, StoreResult<()>>;
    fn save_match(&mut self, m: Match) -> BoxFuture<'_, StoreResult<()>>;

    fn find_player(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<RegularPlayer>>>;
    fn insert_player(&mut self, player: RegularPlayer) -> BoxFuture<'_, StoreResult<()>>;
    fn save_player(&mut self, player: RegularPlayer) -> BoxFuture<'_, StoreResult<()>>;
    fn delete_player(&mut self, match_id: Uuid, user_id: Uuid) -> BoxFuture<'_, StoreResult<bool>>;

    fn find_temporary(
        &mut self,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<TemporaryPlayer>>>;
    fn insert_temporary(&mut self, temp: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>>;
    fn save_temporary(&mut self, temp: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>>;
    fn delete_temporary(&mut self, match_id: Uuid, temp_id: Uuid)
        -> BoxFuture<'_, StoreResult<bool>>;
    fn count_friends_of(&mut self, match_id: Uuid, owner: Uuid) -> BoxFuture<'_, StoreResult<i64>>;

    /// Regular players first (by join time), then temporary players.
    fn list_participants(&mut self, match_id: Uuid)
        -> BoxFuture<'_, StoreResult<Vec<Participant>>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>>;
}
