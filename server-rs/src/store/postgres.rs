use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{RosterStore, RosterTx, StoreResult};
use crate::models::{Match, Participant, RegularPlayer, TemporaryPlayer, UserAccount};

#[derive(Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RosterStore for PgRosterStore {
    fn begin(&self) -> BoxFuture<'_, StoreResult<Box<dyn RosterTx>>> {
        Box::pin(async move {
            let tx = self.pool.begin().await?;
            Ok(Box::new(PgRosterTx { tx }) as Box<dyn RosterTx>)
        })
    }

    fn health_check(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(&self.pool)
                .await?;
            Ok(())
        })
    }
}

pub struct PgRosterTx {
    tx: Transaction<'static, Postgres>,
}

impl RosterTx for PgRosterTx {
    fn find_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>> {
        Box::pin(async move {
            let user = sqlx::query_as::<_, UserAccount>(
                "SELECT id, display_name, balance_cents, is_admin FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(user)
        })
    }

    fn lock_user(&mut self, user_id: Uuid) -> BoxFuture<'_, StoreResult<Option<UserAccount>>> {
        Box::pin(async move {
            let user = sqlx::query_as::<_, UserAccount>(
                "SELECT id, display_name, balance_cents, is_admin FROM users WHERE id = $1 FOR UPDATE",
            )
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(user)
        })
    }

    fn set_user_balance(
        &mut self,
        user_id: Uuid,
        balance_cents: i64,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("UPDATE users SET balance_cents = $1 WHERE id = $2")
                .bind(balance_cents)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
            Ok(())
        })
    }

    fn find_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>> {
        Box::pin(async move {
            let m = sqlx::query_as::<_, Match>(
                r#"SELECT id, location, starts_at, duration_minutes, price_cents, capacity_class, gender,
                    places_occupied, block_spots_team1, block_spots_team2, has_teams, status
                FROM matches WHERE id = $1"#,
            )
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(m)
        })
    }

    fn lock_match(&mut self, match_id: Uuid) -> BoxFuture<'_, StoreResult<Option<Match>>> {
        Box::pin(async move {
            let m = sqlx::query_as::<_, Match>(
                r#"SELECT id, location, starts_at, duration_minutes, price_cents, capacity_class, gender,
                    places_occupied, block_spots_team1, block_spots_team2, has_teams, status
                FROM matches WHERE id = $1 FOR UPDATE"#,
            )
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(m)
        })
    }

    fn insert_match(&mut self, m: Match) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"INSERT INTO matches (id, location, starts_at, duration_minutes, price_cents, capacity_class, gender,
                    places_occupied, block_spots_team1, block_spots_team2, has_teams, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())"#,
            )
            .bind(m.id)
            .bind(&m.location)
            .bind(m.starts_at)
            .bind(m.duration_minutes)
            .bind(m.price_cents)
            .bind(m.capacity_class)
            .bind(&m.gender)
            .bind(m.places_occupied)
            .bind(m.block_spots_team1)
            .bind(m.block_spots_team2)
            .bind(m.has_teams)
            .bind(m.status)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn save_match(&mut self, m: Match) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"UPDATE matches SET
                    places_occupied = GREATEST(0, $2),
                    block_spots_team1 = $3,
                    block_spots_team2 = $4,
                    has_teams = $5,
                    status = $6
                WHERE id = $1"#,
            )
            .bind(m.id)
            .bind(m.places_occupied)
            .bind(m.block_spots_team1)
            .bind(m.block_spots_team2)
            .bind(m.has_teams)
            .bind(m.status)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn find_player(
        &mut self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<RegularPlayer>>> {
        Box::pin(async move {
            let player = sqlx::query_as::<_, RegularPlayer>(
                r#"SELECT match_id, user_id, team_number, has_paid, has_discount, has_gratis,
                    has_entered_with_balance, has_match_admin, has_added_friend, substitute_requested, joined_at
                FROM match_players WHERE match_id = $1 AND user_id = $2"#,
            )
            .bind(match_id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(player)
        })
    }

    fn insert_player(&mut self, p: RegularPlayer) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"INSERT INTO match_players (match_id, user_id, team_number, has_paid, has_discount, has_gratis,
                    has_entered_with_balance, has_match_admin, has_added_friend, substitute_requested, joined_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
            )
            .bind(p.match_id)
            .bind(p.user_id)
            .bind(p.team_number)
            .bind(p.has_paid)
            .bind(p.has_discount)
            .bind(p.has_gratis)
            .bind(p.has_entered_with_balance)
            .bind(p.has_match_admin)
            .bind(p.has_added_friend)
            .bind(p.substitute_requested)
            .bind(p.joined_at)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn save_player(&mut self, p: RegularPlayer) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"UPDATE match_players SET
                    team_number = $3,
                    has_paid = $4,
                    has_discount = $5,
                    has_gratis = $6,
                    has_entered_with_balance = $7,
                    has_match_admin = $8,
                    has_added_friend = $9,
                    substitute_requested = $10
                WHERE match_id = $1 AND user_id = $2"#,
            )
            .bind(p.match_id)
            .bind(p.user_id)
            .bind(p.team_number)
            .bind(p.has_paid)
            .bind(p.has_discount)
            .bind(p.has_gratis)
            .bind(p.has_entered_with_balance)
            .bind(p.has_match_admin)
            .bind(p.has_added_friend)
            .bind(p.substitute_requested)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn delete_player(&mut self, match_id: Uuid, user_id: Uuid) -> BoxFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM match_players WHERE match_id = $1 AND user_id = $2")
                .bind(match_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn find_temporary(
        &mut self,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Option<TemporaryPlayer>>> {
        Box::pin(async move {
            let temp = sqlx::query_as::<_, TemporaryPlayer>(
                r#"SELECT id, match_id, name, phone, team_number, added_by, substitute_requested, created_at
                FROM temporary_players WHERE match_id = $1 AND id = $2"#,
            )
            .bind(match_id)
            .bind(temp_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(temp)
        })
    }

    fn insert_temporary(&mut self, t: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"INSERT INTO temporary_players (id, match_id, name, phone, team_number, added_by, substitute_requested, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(t.id)
            .bind(t.match_id)
            .bind(&t.name)
            .bind(&t.phone)
            .bind(t.team_number)
            .bind(t.added_by)
            .bind(t.substitute_requested)
            .bind(t.created_at)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn save_temporary(&mut self, t: TemporaryPlayer) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                "UPDATE temporary_players SET team_number = $3, substitute_requested = $4 WHERE match_id = $1 AND id = $2",
            )
            .bind(t.match_id)
            .bind(t.id)
            .bind(t.team_number)
            .bind(t.substitute_requested)
            .execute(&mut *self.tx)
            .await?;
            Ok(())
        })
    }

    fn delete_temporary(
        &mut self,
        match_id: Uuid,
        temp_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM temporary_players WHERE match_id = $1 AND id = $2")
                .bind(match_id)
                .bind(temp_id)
                .execute(&mut *self.tx)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn count_friends_of(&mut self, match_id: Uuid, owner: Uuid) -> BoxFuture<'_, StoreResult<i64>> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*)::bigint FROM temporary_players WHERE match_id = $1 AND added_by = $2",
            )
            .bind(match_id)
            .bind(owner)
            .fetch_one(&mut *self.tx)
            .await?;
            Ok(count)
        })
    }

    fn list_participants(
        &mut self,
        match_id: Uuid,
    ) -> BoxFuture<'_, StoreResult<Vec<Participant>>> {
        Box::pin(async move {
            let players = sqlx::query_as::<_, RegularPlayer>(
                r#"SELECT match_id, user_id, team_number, has_paid, has_discount, has_gratis,
                    has_entered_with_balance, has_match_admin, has_added_friend, substitute_requested, joined_at
                FROM match_players WHERE match_id = $1 ORDER BY joined_at, user_id"#,
            )
            .bind(match_id)
            .fetch_all(&mut *self.tx)
            .await?;

            let temps = sqlx::query_as::<_, TemporaryPlayer>(
                r#"SELECT id, match_id, name, phone, team_number, added_by, substitute_requested, created_at
                FROM temporary_players WHERE match_id = $1 ORDER BY created_at, id"#,
            )
            .bind(match_id)
            .fetch_all(&mut *self.tx)
            .await?;

            let mut participants: Vec<Participant> =
                players.into_iter().map(Participant::Regular).collect();
            participants.extend(temps.into_iter().map(Participant::Temporary));
            Ok(participants)
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, StoreResult<()>> {
        Box::pin(async move {
            self.tx.commit().await?;
            Ok(())
        })
    }
}
