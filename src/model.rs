//! Wire types shared by the rule engine, the room/game services, and the
//! store adapter. Plain serde-derived structs and enums, no validation
//! layer; request bodies are validated at the HTTP/WS boundary in
//! `error.rs`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// `S < C < D < H`. Declaration order doubles as the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "S")]
    Spades,
    #[serde(rename = "C")]
    Clubs,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "H")]
    Hearts,
}

/// Rank 3..15. J=11, Q=12, K=13, A=14, 2=15.
pub type Rank = u8;

pub const RANK_THREE: Rank = 3;
pub const RANK_TWO: Rank = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn is_three_of_spades(&self) -> bool {
        self.rank == RANK_THREE && self.suit == Suit::Spades
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboType {
    Single,
    Pair,
    Triple,
    FourKind,
    Straight,
    ConsecutivePairs,
}

/// A classified, non-empty card set. Never stored, derived on demand by
/// `game::rules::evaluate_combo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combo {
    pub combo_type: ComboType,
    pub rank: Rank,
    pub length: usize,
    pub suit: Option<Suit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Disconnected,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        PlayerStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub seat: u8,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub hand_count: u8,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Ready,
    InGame,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub max_players: u8,
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default = "default_max_games")]
    pub max_games: u32,
}

fn default_max_games() -> u32 {
    1
}

/// Public view of a room: never carries `password_hash`. Broadcast and
/// HTTP responses use this, never `Room` directly.
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: Uuid,
    pub code: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub max_players: u8,
    pub created_at: OffsetDateTime,
    pub games_played: u32,
    pub max_games: u32,
    pub has_password: bool,
    pub players: Vec<Player>,
}

impl Room {
    pub fn public(&self, players: Vec<Player>) -> RoomView {
        RoomView {
            id: self.id,
            code: self.code.clone(),
            host_id: self.host_id,
            status: self.status,
            max_players: self.max_players,
            created_at: self.created_at,
            games_played: self.games_played,
            max_games: self.max_games,
            has_password: self.password_hash.is_some(),
            players,
        }
    }
}

pub type Hand = Vec<Card>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPlay {
    #[serde(rename = "type")]
    pub combo_type: ComboType,
    pub cards: Vec<Card>,
    pub by_player_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    Play { cards: Vec<Card>, by_player_id: Uuid },
    Pass { by_player_id: Uuid },
}

impl Move {
    pub fn by_player_id(&self) -> Uuid {
        match self {
            Move::Play { by_player_id, .. } => *by_player_id,
            Move::Pass { by_player_id } => *by_player_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: Uuid,
    pub status: GameStatus,
    pub players_order: Vec<Uuid>,
    pub current_turn: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_play: Option<LastPlay>,
    #[serde(default)]
    pub pass_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<Uuid>,
    pub first_game: bool,
    pub first_turn_required: bool,
}
