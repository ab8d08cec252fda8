use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user's seat on a match roster (`match_players`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegularPlayer {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub team_number: i32,
    pub has_paid: bool,
    pub has_discount: bool,
    pub has_gratis: bool,
    pub has_entered_with_balance: bool,
    pub has_match_admin: bool,
    pub has_added_friend: bool,
    pub substitute_requested: bool,
    pub joined_at: DateTime<Utc>,
}

impl RegularPlayer {
    pub fn new(match_id: Uuid, user_id: Uuid, team_number: i32) -> Self {
        Self {
            match_id,
            user_id,
            team_number,
            has_paid: false,
            has_discount: false,
            has_gratis: false,
            has_entered_with_balance: false,
            has_match_admin: false,
            has_added_friend: false,
            substitute_requested: false,
            joined_at: Utc::now(),
        }
    }
}

/// A guest ("friend") brought by a registered user (`temporary_players`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemporaryPlayer {
    pub id: Uuid,
    pub match_id: Uuid,
    pub name: String,
    pub phone: String,
    pub team_number: i32,
    pub added_by: Uuid,
    pub substitute_requested: bool,
    pub created_at: DateTime<Utc>,
}

/// Identifies one roster row regardless of which table holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ParticipantKey {
    Regular(Uuid),
    Temporary(Uuid),
}

impl ParticipantKey {
    pub fn new(id: Uuid, is_temporary: bool) -> Self {
        if is_temporary {
            ParticipantKey::Temporary(id)
        } else {
            ParticipantKey::Regular(id)
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ParticipantKey::Temporary(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Participant {
    Regular(RegularPlayer),
    Temporary(TemporaryPlayer),
}

impl Participant {
    pub fn key(&self) -> ParticipantKey {
        match self {
            Participant::Regular(p) => ParticipantKey::Regular(p.user_id),
            Participant::Temporary(t) => ParticipantKey::Temporary(t.id),
        }
    }

    pub fn team_number(&self) -> i32 {
        match self {
            Participant::Regular(p) => p.team_number,
            Participant::Temporary(t) => t.team_number,
        }
    }

    pub fn set_team_number(&mut self, team: i32) {
        match self {
            Participant::Regular(p) => p.team_number = team,
            Participant::Temporary(t) => t.team_number = team,
        }
    }

    pub fn substitute_requested(&self) -> bool {
        match self {
            Participant::Regular(p) => p.substitute_requested,
            Participant::Temporary(t) => t.substitute_requested,
        }
    }

    pub fn set_substitute_requested(&mut self, requested: bool) {
        match self {
            Participant::Regular(p) => p.substitute_requested = requested,
            Participant::Temporary(t) => t.substitute_requested = requested,
        }
    }

    /// The user responsible for this seat: the player, or the friend's owner.
    pub fn responsible_user(&self) -> Uuid {
        match self {
            Participant::Regular(p) => p.user_id,
            Participant::Temporary(t) => t.added_by,
        }
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        match self {
            Participant::Regular(p) => p.joined_at,
            Participant::Temporary(t) => t.created_at,
        }
    }
}

/// Team 0 is "unassigned"; 1 and 2 are the two sides.
pub fn is_valid_team(team: i32) -> bool {
    (0..=2).contains(&team)
}

/// Moves a player to the other side; unassigned players land on team 1.
pub fn opposite_team(team: i32) -> i32 {
    match team {
        1 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_team_toggles() {
        assert_eq!(opposite_team(1), 2);
        assert_eq!(opposite_team(2), 1);
        assert_eq!(opposite_team(0), 1);
    }

    #[test]
    fn temporary_players_answer_to_their_owner() {
        let owner = Uuid::new_v4();
        let friend = Participant::Temporary(TemporaryPlayer {
            id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            name: "Dani".into(),
            phone: "600000000".into(),
            team_number: 2,
            added_by: owner,
            substitute_requested: false,
            created_at: Utc::now(),
        });
        assert_eq!(friend.responsible_user(), owner);
        assert!(friend.key().is_temporary());
    }

    #[test]
    fn key_serializes_with_kind_tag() {
        let id = Uuid::nil();
        let json = serde_json::to_value(ParticipantKey::Regular(id)).unwrap();
        assert_eq!(json["kind"], "regular");
        assert_eq!(json["id"], id.to_string());
    }
}
