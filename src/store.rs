//! Typed read/write of room metadata, roster, game state, hidden hands,
//! and user records against the key-value store. Values are JSON blobs;
//! hands are a hash-of-hashes. Every mutation batch refreshes the TTL of
//! the keys it touches so an active room never expires out from under
//! its players.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::AppError;
use crate::model::{Card, GameState, Hand, Player, Room};
use crate::user::User;

const ROOM_TTL_SECONDS: i64 = 24 * 60 * 60;
const USER_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const ROOMS_ACTIVE_KEY: &str = "rooms:active";

fn room_meta_key(code: &str) -> String {
    format!("room:{code}:meta")
}
fn room_players_key(code: &str) -> String {
    format!("room:{code}:players")
}
fn room_state_key(code: &str) -> String {
    format!("room:{code}:state")
}
fn room_hands_key(code: &str) -> String {
    format!("room:{code}:hands")
}
fn user_key(id: &str) -> String {
    format!("user:{id}")
}

/// Thin wrapper over a pooled Redis connection. Cheap to clone, shared
/// across handlers via `AppState`.
#[derive(Clone)]
pub struct Store {
    conn: ConnectionManager,
}

impl Store {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    // ---------- rooms ----------

    pub async fn get_room(&self, code: &str) -> Result<Option<Room>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(room_meta_key(code)).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn put_room(&self, room: &Room) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(room)?;
        redis::pipe()
            .atomic()
            .set(room_meta_key(&room.code), body)
            .expire(room_meta_key(&room.code), ROOM_TTL_SECONDS)
            .sadd(ROOMS_ACTIVE_KEY, &room.code)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete_room(&self, code: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(room_meta_key(code))
            .del(room_players_key(code))
            .del(room_state_key(code))
            .del(room_hands_key(code))
            .srem(ROOMS_ACTIVE_KEY, code)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    // ---------- players ----------

    pub async fn get_players(&self, code: &str) -> Result<Vec<Player>, AppError> {
        let mut conn = self.conn.clone();
        let raw: std::collections::HashMap<String, String> = conn.hgetall(room_players_key(code)).await?;
        raw.values().map(|s| Ok(serde_json::from_str(s)?)).collect()
    }

    pub async fn get_player(&self, code: &str, player_id: &uuid::Uuid) -> Result<Option<Player>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(room_players_key(code), player_id.to_string()).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn put_player(&self, code: &str, player: &Player) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(player)?;
        redis::pipe()
            .atomic()
            .hset(room_players_key(code), player.id.to_string(), body)
            .expire(room_players_key(code), ROOM_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn remove_player(&self, code: &str, player_id: &uuid::Uuid) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(room_players_key(code), player_id.to_string()).await?;
        Ok(())
    }

    // ---------- game state ----------

    pub async fn get_state(&self, code: &str) -> Result<Option<GameState>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(room_state_key(code)).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn put_state(&self, code: &str, state: &GameState) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(state)?;
        redis::pipe()
            .atomic()
            .set(room_state_key(code), body)
            .expire(room_state_key(code), ROOM_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete_state(&self, code: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(room_state_key(code)).await?;
        Ok(())
    }

    // ---------- hands ----------

    pub async fn get_hand(&self, code: &str, player_id: &uuid::Uuid) -> Result<Option<Hand>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(room_hands_key(code), player_id.to_string()).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str::<Vec<Card>>(&s)?),
            None => None,
        })
    }

    pub async fn put_hands(&self, code: &str, hands: &std::collections::HashMap<uuid::Uuid, Hand>) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (player_id, cards) in hands {
            let body = serde_json::to_string(cards)?;
            pipe.hset(room_hands_key(code), player_id.to_string(), body);
        }
        pipe.expire(room_hands_key(code), ROOM_TTL_SECONDS);
        pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn put_hand(&self, code: &str, player_id: &uuid::Uuid, cards: &Hand) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(cards)?;
        redis::pipe()
            .atomic()
            .hset(room_hands_key(code), player_id.to_string(), body)
            .expire(room_hands_key(code), ROOM_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete_hands(&self, code: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(room_hands_key(code)).await?;
        Ok(())
    }

    // ---------- users ----------

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(user_key(id)).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn put_user(&self, user: &User) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(user)?;
        redis::pipe()
            .atomic()
            .set(user_key(&user.id.to_string()), body)
            .expire(user_key(&user.id.to_string()), USER_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
