//! Process-local store for demos and tests.
//!
//! A transaction holds the single state lock for its whole lifetime and
//! works on a private copy, so transactions are fully serialized and a
//! dropped transaction leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{RosterStore, RosterTx, StoreResult};
use crate::models::{Match, Participant, RegularPlayer, TemporaryPlayer, UserAccount};

#[derive(Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserAccount>,
    matches: HashMap<Uuid, Match>,
    players: Vec<RegularPlayer>,
    temporaries: Vec<TemporaryPlayer>,
}

#[derive(Clone, Default)]
pub struct MemoryRosterStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, user: UserAccount) {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user);
    }

    pub async fn seed_match(&self, m: Match) {
        let mut state = self.state.lock().await;
        state.matches.insert(m.id, m);
    }

    pub async fn user(&self, user_id: Uuid) -> Option<UserAccount> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    pub async fn game(&self, match_id: Uuid) -> Option<Match> {
        self.state.lock().await.matches.get(&match_id).cloned()
    }

    pub async fn participants(&self, match_id: Uuid) -> Vec<Participant> {
        self.state.lock().await.participants(match_id)
    }
}

impl MemoryState {
    fn participants(&self, match_id: Uuid) -> Vec<Participant> {
        let mut players: Vec<&RegularPlayer> =
            self.players.iter().filter(|p| p.match_id == match_id).collect();
        players.sort_by_key(|p| (p.joined_at, p.user_id));
        let mut temps: Vec<&TemporaryPlayer> = self
            .temporaries
            .iter()
            .filter(|t| t.match_id == match_id)
            .collect();
        temps.sort_by_key(|t| (t.created_at, t.id));

        players
            .into_iter()
            .cloned()
            .map(Participant::Regular)
            .chain(temps.into_iter().cloned().map(Participant::Temporary))
            .collect()
    }
}

impl RosterStore for MemoryRosterStore {
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn RosterTx>>> {
        Box::pin(async move {
            let guard = self.state.clone().lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(MemoryTx { guard, working }) as Box<dyn RosterTx>)
        })
    }

    fn health_check(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl RosterTx for MemoryTx {
    fn find_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>> {
        let user = self.working.users.get(&user_id).cloned();
        Box::pin(async move { Ok(user) })
    }

    fn lock_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>> {
        self.find_user(user_id)
    }

    fn set_user_balance(
        &mut self,
        user_id: Uuid,
        balance_cents: i64,
    ) -> BoxFuture<'_, StoreResult<()>> {
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.balance_cents = balance_cents;
        }
        Box::pin(async { Ok(()) })
    }

    fn find_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>> {
        let m = self.working.matches.get(&match_id).cloned();
        Box::pin(async move { Ok(m) })
    }

    fn lock_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>> {
        self.find_match(match_id)
    }

    fn insert_match(&mut self, m: Match) -> BoxFuture<'_, StoreResult<()>> {
        self.working.matches.insert(m.id, m);
        Box::pin(async { Ok(()) })
    }

    fn save_match(&mut self, mut m: Match) -> BoxFuture<'_, StoreResult<()>> {
        m.places_occupied = m.places_occupied.max(0);
        self.working.matches.insert(m.id, m);
        Box::pin(async { Ok(()) })
    }

    fn find_player(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<RegularPlayer>>> {
        let player = self
            .working
            .players
            .iter()
            .find(|p| p.match_id == match_id && p.user_id == user_id)
            .cloned();
        Box::pin(async move { Ok(player) })
    }

    fn insert_player(&mut self, player: RegularPlayer) -> BoxFuture<'_, StoreResult<()>> {
        self.working.players.push(player);
        Box::pin(async { Ok(()) })
    }

    fn save_player(&mut self, player: RegularPlayer) -> BoxFuture<'_, StoreResult<()>> {
        if let Some(slot) = self
            .working
            .players
            .iter_mut()
            .find(|p| p.match_id == player.match_id && p.user_id == player.user_id)
        {
            *slot = player;
        }
        Box::pin(async { Ok(()) })
    }

    fn delete_player(&mut self, match_id: Uuid, user_id: Uuid) -> BoxFuture<'_, StoreResult<bool>> {
        let before = self.working.players.len();
        self.working
            .players
            .retain(|p| !(p.match_id == match_id && p.user_id == user_id));
        let removed = self.working.players.len() < before;
        Box::pin(async move { Ok(removed) })
    }

    fn find_temporary(
        &mut self,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<TemporaryPlayer>>> {
        let temp = self
            .working
            .temporaries
            .iter()
            .find(|t| t.match_id == match_id && t.id == temp_id)
            .cloned();
        Box::pin(async move { Ok(temp) })
    }

    fn insert_temporary(&mut self, temp: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>> {
        self.working.temporaries.push(temp);
        Box::pin(async { Ok(()) })
    }

    fn save_temporary(&mut self, temp: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>> {
        if let Some(slot) = self
            .working
            .temporaries
            .iter_mut()
            .find(|t| t.match_id == temp.match_id && t.id == temp.id)
        {
            slot.team_number = temp.team_number;
            slot.substitute_requested = temp.substitute_requested;
        }
        Box::pin(async { Ok(()) })
    }

    fn delete_temporary(
        &mut self,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<bool>> {
        let before = self.working.temporaries.len();
        self.working
            .temporaries
            .retain(|t| !(t.match_id == match_id && t.id == temp_id));
        let removed = self.working.temporaries.len() < before;
        Box::pin(async move { Ok(removed) })
    }

    fn count_friends_of(&mut self, match_id: Uuid, owner: Uuid) -> BoxFuture<'_, StoreResult<i64>> {
        let count = self
            .working
            .temporaries
            .iter()
            .filter(|t| t.match_id == match_id && t.added_by == owner)
            .count() as i64;
        Box::pin(async move { Ok(count) })
    }

    fn list_participants(
        &mut self,
        match_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Vec<Participant>>> {
        let participants = self.working.participants(match_id);
        Box::pin(async move { Ok(participants) })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Box::pin(async { Ok(()) })
    }
}
