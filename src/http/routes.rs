//! REST surface: user creation/lookup plus room create/join/leave.
//! Everything state-changing beyond this boundary, dealing, playing,
//! passing, only happens over the WebSocket in `ws::connection`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::room::service as room_service;
use crate::store::Store;
use crate::user;
use crate::ws::hub::Hub;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub hub: Arc<Hub>,
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = user::create_user(&state.store, req.name).await?;
    Ok(Json(serde_json::json!({ "user": user })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = user::get_user(&state.store, &user_id.to_string())
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(Json(serde_json::json!({ "user": user })))
}

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub max_players: Option<u8>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct CreateRoomResponse {
    pub room: crate::model::RoomView,
    pub player_id: Uuid,
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = room_service::create_room(
        &state.store,
        &req.user_id.to_string(),
        req.max_players,
        req.password,
    )
    .await?;
    Ok(Json(CreateRoomResponse { room: created.room, player_id: created.host_id }))
}

#[derive(Deserialize)]
pub struct JoinRoomRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct JoinRoomResponse {
    pub room: crate::model::RoomView,
    pub player_id: Uuid,
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let joined = room_service::join_room(
        &state.store,
        &code,
        &req.user_id.to_string(),
        req.password,
    )
    .await?;
    let payload = serde_json::json!({ "type": "room:update", "payload": { "room": joined.room } });
    state.hub.broadcast(&code.to_uppercase(), &payload);
    Ok(Json(JoinRoomResponse { room: joined.room, player_id: joined.player_id }))
}

#[derive(Deserialize)]
pub struct LeaveRoomRequest {
    pub player_id: Uuid,
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<LeaveRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let room = room_service::leave_room(&state.store, &code, req.player_id).await?;
    let payload = serde_json::json!({ "type": "room:update", "payload": { "room": room } });
    state.hub.broadcast(&code.to_uppercase(), &payload);
    Ok(Json(serde_json::json!({ "room": room })))
}
