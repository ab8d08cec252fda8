use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable machine-readable result codes. The presentation layer maps these
/// to localized text, so variants must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RosterCode {
    PlayerJoinedSuccessfully,
    PlayerLeftSuccessfully,
    FriendAddedSuccessfully,
    FriendRemovedSuccessfully,
    TeamSwitchedSuccessfully,
    SpotsBlockedSuccessfully,
    TeamsSortedSuccessfully,
    SubstituteRequestedSuccessfully,
    SubstituteRequestCancelled,
    MatchCreatedSuccessfully,
    MatchCancelledSuccessfully,
    MatchFinishedSuccessfully,
    PlayerRemovedSuccessfully,
    PlayerUpdatedSuccessfully,
    MatchFetched,
    RosterFetched,
    PermissionResolved,

    Unauthorized,
    BadRequest,
    MatchIdInvalid,
    MatchNotFound,
    UserNotFound,
    TemporaryPlayerNotFound,
    PlayerNotFound,
    InsufficientBalance,
    TooLateToLeave,
    TooLateToRemove,
    PlayerAlreadyInMatch,
    NoSubstituteRequested,
    SubstituteAlreadyRequested,
    MatchFull,
    MatchNotActive,
    OperationFailed,
    BalanceUpdateFailed,
    UnexpectedError,
    InternalServerError,
}

impl RosterCode {
    pub fn default_message(&self) -> &'static str {
        match self {
            RosterCode::PlayerJoinedSuccessfully => "Player joined the match",
            RosterCode::PlayerLeftSuccessfully => "Player left the match",
            RosterCode::FriendAddedSuccessfully => "Friend added to the match",
            RosterCode::FriendRemovedSuccessfully => "Friend removed from the match",
            RosterCode::TeamSwitchedSuccessfully => "Team switched",
            RosterCode::SpotsBlockedSuccessfully => "Spots blocked",
            RosterCode::TeamsSortedSuccessfully => "Teams sorted",
            RosterCode::SubstituteRequestedSuccessfully => "Substitute requested",
            RosterCode::SubstituteRequestCancelled => "Substitute request cancelled",
            RosterCode::MatchCreatedSuccessfully => "Match created",
            RosterCode::MatchCancelledSuccessfully => "Match cancelled",
            RosterCode::MatchFinishedSuccessfully => "Match finished",
            RosterCode::PlayerRemovedSuccessfully => "Player removed from the match",
            RosterCode::PlayerUpdatedSuccessfully => "Player updated",
            RosterCode::MatchFetched => "Match loaded",
            RosterCode::RosterFetched => "Roster loaded",
            RosterCode::PermissionResolved => "Permissions resolved",
            RosterCode::Unauthorized => "You are not allowed to perform this action",
            RosterCode::BadRequest => "Invalid request",
            RosterCode::MatchIdInvalid => "Invalid match id",
            RosterCode::MatchNotFound => "Match not found",
            RosterCode::UserNotFound => "User not found",
            RosterCode::TemporaryPlayerNotFound => "Friend not found",
            RosterCode::PlayerNotFound => "Player not found",
            RosterCode::InsufficientBalance => "Insufficient balance",
            RosterCode::TooLateToLeave => "It is too late to leave this match",
            RosterCode::TooLateToRemove => "It is too late to remove this friend",
            RosterCode::PlayerAlreadyInMatch => "Player is already in this match",
            RosterCode::NoSubstituteRequested => "No substitute was requested",
            RosterCode::SubstituteAlreadyRequested => "A substitute was already requested",
            RosterCode::MatchFull => "Match is full",
            RosterCode::MatchNotActive => "Match is no longer open",
            RosterCode::OperationFailed => "Operation failed",
            RosterCode::BalanceUpdateFailed => "Balance could not be updated",
            RosterCode::UnexpectedError => "Unexpected error",
            RosterCode::InternalServerError => "Internal server error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RosterCode::Unauthorized => StatusCode::FORBIDDEN,
            RosterCode::BadRequest | RosterCode::MatchIdInvalid => StatusCode::BAD_REQUEST,
            RosterCode::MatchNotFound
            | RosterCode::UserNotFound
            | RosterCode::TemporaryPlayerNotFound
            | RosterCode::PlayerNotFound => StatusCode::NOT_FOUND,
            RosterCode::InsufficientBalance
            | RosterCode::TooLateToLeave
            | RosterCode::TooLateToRemove
            | RosterCode::PlayerAlreadyInMatch
            | RosterCode::NoSubstituteRequested
            | RosterCode::SubstituteAlreadyRequested
            | RosterCode::MatchFull
            | RosterCode::MatchNotActive => StatusCode::CONFLICT,
            RosterCode::OperationFailed
            | RosterCode::BalanceUpdateFailed
            | RosterCode::UnexpectedError
            | RosterCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            RosterCode::MatchCreatedSuccessfully => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }
}

/// Uniform response envelope: `{success, code, message?, metadata?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterOutcome {
    pub success: bool,
    pub code: RosterCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl RosterOutcome {
    pub fn ok(code: RosterCode) -> Self {
        Self {
            success: true,
            code,
            message: Some(code.default_message().to_string()),
            metadata: None,
        }
    }

    pub fn fail(code: RosterCode) -> Self {
        Self {
            success: false,
            code,
            message: Some(code.default_message().to_string()),
            metadata: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

impl IntoResponse for RosterOutcome {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_screaming_snake_case() {
        for (code, wire) in [
            (RosterCode::PlayerJoinedSuccessfully, "PLAYER_JOINED_SUCCESSFULLY"),
            (RosterCode::InsufficientBalance, "INSUFFICIENT_BALANCE"),
            (RosterCode::TooLateToLeave, "TOO_LATE_TO_LEAVE"),
            (RosterCode::MatchIdInvalid, "MATCH_ID_INVALID"),
            (RosterCode::UnexpectedError, "UNEXPECTED_ERROR"),
            (RosterCode::InternalServerError, "INTERNAL_SERVER_ERROR"),
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), wire);
            assert_eq!(serde_json::from_value::<RosterCode>(wire.into()).unwrap(), code);
        }
    }

    #[test]
    fn envelope_omits_empty_metadata() {
        let json = serde_json::to_value(RosterOutcome::fail(RosterCode::MatchFull)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "MATCH_FULL");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn metadata_accumulates() {
        let outcome = RosterOutcome::ok(RosterCode::PlayerLeftSuccessfully)
            .with("updated_places_occupied", 9)
            .with("refunded_cents", 500);
        assert_eq!(outcome.meta("updated_places_occupied"), Some(&Value::from(9)));
        assert_eq!(outcome.meta("refunded_cents"), Some(&Value::from(500)));
    }

    #[test]
    fn business_failures_map_to_conflict() {
        assert_eq!(RosterCode::MatchFull.status(), StatusCode::CONFLICT);
        assert_eq!(RosterCode::MatchNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RosterCode::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(RosterCode::PlayerJoinedSuccessfully.status(), StatusCode::OK);
    }
}
