//! Per-connection event loop: accepts the connection with no pre-auth
//! handshake, reads framed JSON `{type, payload}` events, dispatches to
//! the room/game services, and broadcasts the resulting state through
//! the hub. Handler errors are surfaced as `{type:"error",
//! payload:{message}}` on the offending socket; they never terminate the
//! loop.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::game::service as game_service;
use crate::http::routes::AppState;
use crate::room::service as room_service;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

#[derive(Debug, Deserialize)]
struct ClientEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Per-connection state: which room/player this socket has joined, if any.
struct ConnState {
    room_code: Option<String>,
    player_id: Option<Uuid>,
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let conn_id = state.hub.next_conn_id();

    // Forward hub-enqueued events to the socket; these are FIFO within
    // this connection by construction (single consumer of `rx`).
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if ws_tx.send(Message::Text(event.to_string())).await.is_err() {
                break;
            }
        }
    });

    let mut conn = ConnState { room_code: None, player_id: None };
    let mut graceful = false;

    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text(&state, &tx, &mut conn, conn_id, &text).await;
            }
            Some(Ok(Message::Close(_))) => {
                graceful = true;
                break;
            }
            Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_))) => {}
            Some(Err(_)) | None => break,
        }
    }

    // A client-sent close frame is a graceful leave: the finally path
    // removes the player from the room and broadcasts. A socket read
    // error or silent stream end is an abrupt disconnect; only the hub
    // entry is dropped, and the player stays in the store so a transient
    // drop doesn't cost them their seat or hand.
    if let (Some(code), Some(player_id)) = (conn.room_code.clone(), conn.player_id) {
        state.hub.disconnect(&code, Some(player_id), conn_id);
        if graceful {
            if let Ok(room) = room_service::remove_player(&state.store, &code, player_id).await {
                broadcast_room_update(&state, &code, room);
            }
        }
    } else if let Some(code) = conn.room_code.clone() {
        state.hub.disconnect(&code, None, conn_id);
    }

    send_task.abort();
}

async fn handle_text(state: &AppState, tx: &mpsc::UnboundedSender<Value>, conn: &mut ConnState, conn_id: u64, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(err) => {
            let _ = tx.send(AppError::Validation(format!("bad message: {err}")).to_ws_payload());
            return;
        }
    };

    let result = dispatch(state, tx, conn, conn_id, &event.kind, event.payload).await;
    if let Err(err) = result {
        let _ = tx.send(err.to_ws_payload());
    }
}

#[derive(Deserialize)]
struct RoomPayload {
    code: String,
    player_id: Uuid,
}

#[derive(Deserialize)]
struct PlayPayload {
    code: String,
    player_id: Uuid,
    cards: Vec<crate::model::Card>,
}

async fn dispatch(
    state: &AppState,
    tx: &mpsc::UnboundedSender<Value>,
    conn: &mut ConnState,
    conn_id: u64,
    kind: &str,
    payload: Value,
) -> Result<(), AppError> {
    match kind {
        "room:join" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let room = room_service::get_room_view(&state.store, &code).await?.ok_or(AppError::RoomNotFound)?;
            if !room.players.iter().any(|pl| pl.id == p.player_id) {
                return Err(AppError::PlayerNotFound);
            }
            state.hub.connect(&code, p.player_id, conn_id, tx.clone());
            conn.room_code = Some(code.clone());
            conn.player_id = Some(p.player_id);
            tracing::info!(room = %code, player = %p.player_id, "room:join");

            broadcast_room_update(state, &code, Some(room));
            if let Some(game_state) = game_service::get_game_state(&state.store, &code).await? {
                let payload = json!({ "type": "game:start", "payload": { "state": game_state } });
                state.hub.send_to_player(&code, p.player_id, &payload);
            }
            Ok(())
        }
        "room:leave" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let room = room_service::leave_room(&state.store, &code, p.player_id).await?;
            state.hub.disconnect(&code, Some(p.player_id), conn_id);
            conn.room_code = None;
            conn.player_id = None;
            broadcast_room_update(state, &code, room);
            Ok(())
        }
        "room:sync" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let room = room_service::get_room_view(&state.store, &code).await?;
            let payload = json!({ "type": "room:update", "payload": { "room": room } });
            state.hub.send_to_player(&code, p.player_id, &payload);
            if let Some(game_state) = game_service::get_game_state(&state.store, &code).await? {
                let payload = json!({ "type": "game:start", "payload": { "state": game_state } });
                state.hub.send_to_player(&code, p.player_id, &payload);
            }
            Ok(())
        }
        "hand:sync" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let hand = game_service::get_hand(&state.store, &code, p.player_id).await?;
            let payload = json!({ "type": "hand:update", "payload": { "cards": hand } });
            state.hub.send_to_player(&code, p.player_id, &payload);
            Ok(())
        }
        "game:start" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let room = room_service::get_room_view(&state.store, &code).await?.ok_or(AppError::RoomNotFound)?;
            if room.host_id != p.player_id {
                return Err(AppError::NotHost);
            }
            let game_state = game_service::start_game(&state.store, &code, None).await?;
            tracing::info!(room = %code, "game:start");
            let payload = json!({ "type": "game:start", "payload": { "state": game_state } });
            state.hub.broadcast(&code, &payload);
            for &pid in &game_state.players_order {
                if let Ok(hand) = game_service::get_hand(&state.store, &code, pid).await {
                    let hand_payload = json!({ "type": "hand:update", "payload": { "cards": hand } });
                    state.hub.send_to_player(&code, pid, &hand_payload);
                }
            }
            Ok(())
        }
        "turn:play" => {
            let p: PlayPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let game_state = game_service::play_turn(&state.store, &code, p.player_id, p.cards).await?;
            tracing::debug!(room = %code, player = %p.player_id, "turn:play");
            let payload = json!({ "type": "turn:play", "payload": { "state": game_state } });
            state.hub.broadcast(&code, &payload);

            if let Ok(hand) = game_service::get_hand(&state.store, &code, p.player_id).await {
                let hand_payload = json!({ "type": "hand:update", "payload": { "cards": hand } });
                state.hub.send_to_player(&code, p.player_id, &hand_payload);
            }

            if game_state.status == crate::model::GameStatus::Finished {
                let payload = json!({ "type": "game:end", "payload": { "state": game_state } });
                state.hub.broadcast(&code, &payload);

                let (next_state, series_over) = game_service::maybe_start_next_game(&state.store, &code).await?;
                if series_over {
                    let room = room_service::get_room_view(&state.store, &code).await?;
                    broadcast_room_update(state, &code, room);
                } else if let Some(next_state) = next_state {
                    let payload = json!({ "type": "game:start", "payload": { "state": next_state } });
                    state.hub.broadcast(&code, &payload);
                    for &pid in &next_state.players_order {
                        if let Ok(hand) = game_service::get_hand(&state.store, &code, pid).await {
                            let hand_payload = json!({ "type": "hand:update", "payload": { "cards": hand } });
                            state.hub.send_to_player(&code, pid, &hand_payload);
                        }
                    }
                }
            }
            Ok(())
        }
        "turn:pass" => {
            let p: RoomPayload = parse(payload)?;
            let code = p.code.to_uppercase();
            let game_state = game_service::pass_turn(&state.store, &code, p.player_id).await?;
            tracing::debug!(room = %code, player = %p.player_id, "turn:pass");
            let payload = json!({ "type": "turn:pass", "payload": { "state": game_state } });
            state.hub.broadcast(&code, &payload);
            Ok(())
        }
        other => Err(AppError::Validation(format!("unknown event type: {other}"))),
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload).map_err(|err| AppError::Validation(err.to_string()))
}

fn broadcast_room_update(state: &AppState, code: &str, room: Option<crate::model::RoomView>) {
    let payload = json!({ "type": "room:update", "payload": { "room": room } });
    state.hub.broadcast(code, &payload);
}
