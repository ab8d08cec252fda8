use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pitch format; fixes how many players fit on the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "capacity_class")]
pub enum CapacityClass {
    F7,
    F8,
    F11,
}

impl CapacityClass {
    pub fn max_players(self) -> i32 {
        match self {
            CapacityClass::F7 => 14,
            CapacityClass::F8 => 16,
            CapacityClass::F11 => 22,
        }
    }

    pub fn max_players_per_team(self) -> i32 {
        self.max_players() / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub capacity_class: CapacityClass,
    pub gender: String,
    pub places_occupied: i32,
    pub block_spots_team1: i32,
    pub block_spots_team2: i32,
    pub has_teams: bool,
    pub status: MatchStatus,
}

impl Match {
    pub fn capacity(&self) -> i32 {
        self.capacity_class.max_players()
    }

    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }

    pub fn has_free_place(&self) -> bool {
        self.places_occupied < self.capacity()
    }

    pub fn blocked_spots(&self, team: i32) -> i32 {
        match team {
            1 => self.block_spots_team1,
            2 => self.block_spots_team2,
            _ => 0,
        }
    }

    pub fn set_blocked_spots(&mut self, team: i32, count: i32) {
        match team {
            1 => self.block_spots_team1 = count,
            2 => self.block_spots_team2 = count,
            _ => {}
        }
    }

    /// True when kick-off is less than `hours` away from `now` (or already past).
    pub fn starts_within(&self, now: DateTime<Utc>, hours: i64) -> bool {
        self.starts_at - now < chrono::Duration::hours(hours)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub location: String,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: i32,
    #[serde(rename = "priceCents")]
    pub price_cents: i64,
    #[serde(rename = "capacityClass")]
    pub capacity_class: CapacityClass,
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinMatchRequest {
    pub team: Option<i32>,
    #[serde(rename = "withBalance", default)]
    pub with_balance: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct LeaveMatchRequest {
    /// Player to remove; defaults to the caller.
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddFriendRequest {
    pub team: Option<i32>,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct BlockSpotsRequest {
    pub team: i32,
    pub count: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct TargetPlayerRequest {
    /// User id for regular players, temporary player id otherwise.
    #[serde(rename = "playerId")]
    pub player_id: Option<Uuid>,
    #[serde(rename = "isTemporary", default)]
    pub is_temporary: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlayerFlagsRequest {
    #[serde(rename = "hasPaid")]
    pub has_paid: Option<bool>,
    #[serde(rename = "hasDiscount")]
    pub has_discount: Option<bool>,
    #[serde(rename = "hasGratis")]
    pub has_gratis: Option<bool>,
    #[serde(rename = "hasMatchAdmin")]
    pub has_match_admin: Option<bool>,
}

impl PlayerFlagsRequest {
    pub fn is_empty(&self) -> bool {
        self.has_paid.is_none()
            && self.has_discount.is_none()
            && self.has_gratis.is_none()
            && self.has_match_admin.is_none()
    }
}
