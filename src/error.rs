//! Crate-wide error taxonomy. One enum serves two audiences: HTTP
//! handlers map it to a status + `{error}` body via `IntoResponse`; the
//! WS dispatcher maps it to a `{type:"error", payload:{message}}` frame
//! via `to_ws_payload` and keeps the connection open.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid password")]
    InvalidPassword,
    #[error("only the host may do this")]
    NotHost,

    #[error("room not found")]
    RoomNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("game not started")]
    GameNotStarted,
    #[error("player hand not found")]
    HandNotFound,

    #[error("room is full")]
    RoomFull,
    #[error("not your turn")]
    NotYourTurn,
    #[error("game already finished")]
    GameFinished,

    #[error("invalid combo: {0}")]
    InvalidCombo(String),
    #[error("move does not beat last play")]
    IllegalMove,
    #[error("cannot pass without a last play")]
    IllegalPass,
    #[error("cards not in hand")]
    CardsNotInHand,
    #[error("first play must include the 3 of spades")]
    MustLeadThreeSpades,
    #[error("not enough players to start")]
    NotEnoughPlayers,

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),
    #[error("store data corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    /// Status code for the REST surface.
    fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            InvalidPassword => StatusCode::FORBIDDEN,
            NotHost => StatusCode::FORBIDDEN,
            RoomNotFound | UserNotFound | PlayerNotFound | GameNotStarted | HandNotFound => {
                StatusCode::NOT_FOUND
            }
            RoomFull => StatusCode::CONFLICT,
            NotYourTurn | GameFinished => StatusCode::CONFLICT,
            InvalidCombo(_) | IllegalMove | IllegalPass | CardsNotInHand
            | MustLeadThreeSpades | NotEnoughPlayers => StatusCode::BAD_REQUEST,
            Store(_) | Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{type:"error", payload:{message}}`, ready to serialize onto a socket.
    pub fn to_ws_payload(&self) -> serde_json::Value {
        json!({ "type": "error", "payload": { "message": self.to_string() } })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
