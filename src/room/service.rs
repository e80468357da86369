//! CRUD over rooms and players: create, join, leave, remove, seat
//! assignment, host migration, password gate. Consumes the store
//! adapter only, no socket or hub knowledge lives here.

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{Player, PlayerStatus, Room, RoomStatus, RoomView};
use crate::store::Store;
use crate::user::{self, User};
use crate::util::id::new_room_code;

const MAX_CODE_ATTEMPTS: u32 = 64;

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct CreatedRoom {
    pub room: RoomView,
    pub host_id: Uuid,
}

pub async fn create_room(
    store: &Store,
    user_id: &str,
    max_players: Option<u8>,
    password: Option<String>,
) -> Result<CreatedRoom, AppError> {
    let user: User = user::get_user(store, user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    let max_players = max_players.unwrap_or(4);
    if !(2..=4).contains(&max_players) {
        return Err(AppError::Validation("max_players must be between 2 and 4".into()));
    }

    let mut code = new_room_code();
    for _ in 0..MAX_CODE_ATTEMPTS {
        if store.get_room(&code).await?.is_none() {
            break;
        }
        code = new_room_code();
    }

    let host_id = Uuid::new_v4();
    let password_hash = password.filter(|p| !p.is_empty()).map(|p| hash_password(&p));

    let room = Room {
        id: Uuid::new_v4(),
        code: code.clone(),
        password_hash,
        host_id,
        status: RoomStatus::Waiting,
        max_players,
        created_at: OffsetDateTime::now_utc(),
        games_played: 0,
        max_games: 1,
    };
    let host = Player {
        id: host_id,
        name: user.name.clone(),
        seat: 0,
        is_host: true,
        is_ready: false,
        hand_count: 0,
        score: 0,
        status: PlayerStatus::Active,
    };

    store.put_room(&room).await?;
    store.put_player(&code, &host).await?;

    Ok(CreatedRoom { room: room.public(vec![host]), host_id })
}

pub struct JoinedRoom {
    pub room: RoomView,
    pub player_id: Uuid,
}

pub async fn join_room(
    store: &Store,
    code: &str,
    user_id: &str,
    password: Option<String>,
) -> Result<JoinedRoom, AppError> {
    let code = code.to_uppercase();
    let room = store.get_room(&code).await?.ok_or(AppError::RoomNotFound)?;
    let user = user::get_user(store, user_id).await?.ok_or(AppError::UserNotFound)?;
    user::touch_user_on_join(store, user_id).await?;

    if let Some(expected) = &room.password_hash {
        let supplied = password.filter(|p| !p.is_empty()).map(|p| hash_password(&p));
        if supplied.as_deref() != Some(expected.as_str()) {
            return Err(AppError::InvalidPassword);
        }
    }

    let mut players = store.get_players(&code).await?;
    if players.len() >= room.max_players as usize {
        return Err(AppError::RoomFull);
    }

    let occupied: std::collections::HashSet<u8> = players.iter().map(|p| p.seat).collect();
    let seat = (0..room.max_players).find(|s| !occupied.contains(s)).unwrap_or(players.len() as u8);

    let player_id = Uuid::new_v4();
    let player = Player {
        id: player_id,
        name: user.name.clone(),
        seat,
        is_host: false,
        is_ready: false,
        hand_count: 0,
        score: 0,
        status: PlayerStatus::Active,
    };
    store.put_player(&code, &player).await?;
    store.put_room(&room).await?; // refresh TTL

    players.push(player);
    Ok(JoinedRoom { room: room.public(players), player_id })
}

/// Removes a player; promotes the lowest-seat remaining player to host if
/// the leaver was host; deletes the room entirely if the roster empties.
pub async fn remove_player(store: &Store, code: &str, player_id: Uuid) -> Result<Option<RoomView>, AppError> {
    let code = code.to_uppercase();
    let mut room = store.get_room(&code).await?.ok_or(AppError::RoomNotFound)?;
    let mut players = store.get_players(&code).await?;
    let Some(idx) = players.iter().position(|p| p.id == player_id) else {
        return Err(AppError::PlayerNotFound);
    };
    let leaver = players.remove(idx);
    store.remove_player(&code, &player_id).await?;

    if players.is_empty() {
        store.delete_room(&code).await?;
        return Ok(None);
    }

    if leaver.is_host {
        players.sort_by_key(|p| p.seat);
        let new_host = &mut players[0];
        new_host.is_host = true;
        room.host_id = new_host.id;
        store.put_player(&code, new_host).await?;
        store.put_room(&room).await?;
    }

    Ok(Some(room.public(players)))
}

pub async fn leave_room(store: &Store, code: &str, player_id: Uuid) -> Result<Option<RoomView>, AppError> {
    remove_player(store, code, player_id).await
}

pub async fn get_room_view(store: &Store, code: &str) -> Result<Option<RoomView>, AppError> {
    let code = code.to_uppercase();
    let Some(room) = store.get_room(&code).await? else { return Ok(None) };
    let players = store.get_players(&code).await?;
    Ok(Some(room.public(players)))
}

pub async fn update_player(store: &Store, code: &str, player: &Player) -> Result<(), AppError> {
    store.put_player(code, player).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_password_is_deterministic_unsalted_sha256() {
        let a = hash_password("correct horse battery staple");
        let b = hash_password("correct horse battery staple");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex-encoded SHA-256
        assert_ne!(a, hash_password("something else"));
    }

    #[test]
    fn room_code_alphabet_excludes_confusable_symbols() {
        let code = new_room_code();
        assert_eq!(code.len(), 6);
        for ch in code.chars() {
            assert!(!"01IO".contains(ch), "confusable symbol {ch} in generated code");
        }
    }
}
