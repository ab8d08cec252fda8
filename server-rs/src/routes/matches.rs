use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AddFriendRequest, BlockSpotsRequest, CreateMatchRequest, JoinMatchRequest,
    LeaveMatchRequest, PlayerFlagsRequest, RosterOutcome, TargetPlayerRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct RemovePlayerQuery {
    #[serde(default)]
    pub temporary: bool,
}

fn parse_match_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidMatchId(raw.to_string()))
}

fn player_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid player id: {raw}")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

pub async fn create_match(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    payload: Result<Json<CreateMatchRequest>, JsonRejection>,
) -> AppResult<RosterOutcome> {
    let req = body(payload)?;
    state.engine.create_match(user.id, req).await
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.get_match(parse_match_id(&id)?).await
}

pub async fn get_roster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.get_roster(parse_match_id(&id)?).await
}

pub async fn get_permissions(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.get_permissions(user.id, parse_match_id(&id)?).await
}

pub async fn join_match(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<JoinMatchRequest>, JsonRejection>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = body(payload)?;
    state.engine.join_match(user.id, match_id, req).await
}

/// Body is optional; without `userId` the caller leaves.
pub async fn leave_match(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<LeaveMatchRequest>>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = payload.map(|Json(v)| v).unwrap_or_default();
    state.engine.leave_match(user.id, match_id, req).await
}

pub async fn add_friend(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<AddFriendRequest>, JsonRejection>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = body(payload)?;
    state.engine.add_friend(user.id, match_id, req).await
}

pub async fn remove_friend(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path((id, temp_id)): Path<(String, String)>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let temp_id = player_id(&temp_id)?;
    state.engine.remove_friend(user.id, match_id, temp_id).await
}

pub async fn switch_team(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<TargetPlayerRequest>>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = payload.map(|Json(v)| v).unwrap_or_default();
    state.engine.switch_team(user.id, match_id, req).await
}

pub async fn block_spots(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<BlockSpotsRequest>, JsonRejection>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = body(payload)?;
    state.engine.block_spots(user.id, match_id, req).await
}

pub async fn request_substitute(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<TargetPlayerRequest>>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = payload.map(|Json(v)| v).unwrap_or_default();
    state.engine.request_substitute(user.id, match_id, req).await
}

pub async fn cancel_substitute(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<TargetPlayerRequest>>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let req = payload.map(|Json(v)| v).unwrap_or_default();
    state
        .engine
        .cancel_substitution_request(user.id, match_id, req)
        .await
}

pub async fn sort_teams(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.sort_teams(user.id, parse_match_id(&id)?).await
}

pub async fn cancel_match(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.cancel_match(user.id, parse_match_id(&id)?).await
}

pub async fn finish_match(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<RosterOutcome> {
    state.engine.finish_match(user.id, parse_match_id(&id)?).await
}

pub async fn remove_player(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path((id, target)): Path<(String, String)>,
    Query(query): Query<RemovePlayerQuery>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let target = player_id(&target)?;
    state
        .engine
        .admin_remove_player(user.id, match_id, target, query.temporary)
        .await
}

pub async fn update_player_flags(
    State(state): State<AppState>,
    user: Extension<AuthUser>,
    Path((id, target)): Path<(String, String)>,
    payload: Result<Json<PlayerFlagsRequest>, JsonRejection>,
) -> AppResult<RosterOutcome> {
    let match_id = parse_match_id(&id)?;
    let target = player_id(&target)?;
    let req = body(payload)?;
    state
        .engine
        .update_player_flags(user.id, match_id, target, req)
        .await
}
