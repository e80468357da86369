//! Deal, play-turn, pass-turn, series lifecycle, and scoring. Consumes
//! the rule engine plus the store; never touches the hub or sockets
//! directly.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use uuid::Uuid;

use super::rules::{can_beat, evaluate_combo, validate_move};
use crate::error::AppError;
use crate::model::{Card, ComboType, GameState, GameStatus, Hand, LastPlay, Move, RoomStatus, Suit};
use crate::room::service as room_service;
use crate::store::Store;

const CARDS_PER_PLAYER: usize = 13;

fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for rank in 3..=15u8 {
        for suit in [Suit::Spades, Suit::Clubs, Suit::Diamonds, Suit::Hearts] {
            deck.push(Card { rank, suit });
        }
    }
    deck.shuffle(&mut rand::thread_rng());
    deck
}

/// Round-robin deal, at most `CARDS_PER_PLAYER` per player. Undealt
/// cards are discarded face-down, defensive against player counts < 4.
fn deal_hands(players: &[Uuid], deck: Vec<Card>) -> HashMap<Uuid, Hand> {
    let mut hands: HashMap<Uuid, Hand> = players.iter().map(|&p| (p, Vec::new())).collect();
    let mut index = 0;
    for card in deck {
        let pid = players[index];
        hands.get_mut(&pid).unwrap().push(card);
        index = (index + 1) % players.len();
        if hands.values().all(|h| h.len() >= CARDS_PER_PLAYER) {
            break;
        }
    }
    hands
}

fn find_start_player(players_order: &[Uuid], hands: &HashMap<Uuid, Hand>) -> Uuid {
    for &pid in players_order {
        if hands.get(&pid).map(|h| h.iter().any(|c| c.is_three_of_spades())).unwrap_or(false) {
            return pid;
        }
    }
    players_order[0]
}

fn next_player(players_order: &[Uuid], current: Uuid) -> Uuid {
    let idx = players_order.iter().position(|&p| p == current).expect("current_turn must be in players_order");
    players_order[(idx + 1) % players_order.len()]
}

pub async fn start_game(store: &Store, code: &str, max_games: Option<u32>) -> Result<GameState, AppError> {
    let code = code.to_uppercase();
    let mut room = store.get_room(&code).await?.ok_or(AppError::RoomNotFound)?;
    let mut players = store.get_players(&code).await?;
    if players.len() < 2 {
        return Err(AppError::NotEnoughPlayers);
    }

    if let Some(mg) = max_games {
        if mg >= 1 {
            room.max_games = mg;
        }
    }
    room.status = RoomStatus::InGame;

    players.sort_by_key(|p| p.seat);
    let players_order: Vec<Uuid> = players.iter().map(|p| p.id).collect();

    let deck = build_deck();
    let hands = deal_hands(&players_order, deck);
    let current_turn = find_start_player(&players_order, &hands);

    let first_game = room.games_played == 0;
    let state = GameState {
        room_id: room.id,
        status: GameStatus::Playing,
        players_order: players_order.clone(),
        current_turn,
        last_play: None,
        pass_count: 0,
        winner_id: None,
        first_game,
        first_turn_required: first_game,
    };

    room.games_played += 1;
    store.put_room(&room).await?;
    store.put_state(&code, &state).await?;
    store.put_hands(&code, &hands).await?;

    for player in players.iter_mut() {
        player.hand_count = hands.get(&player.id).map(|h| h.len()).unwrap_or(0) as u8;
        room_service::update_player(store, &code, player).await?;
    }

    Ok(state)
}

pub async fn get_game_state(store: &Store, code: &str) -> Result<Option<GameState>, AppError> {
    store.get_state(&code.to_uppercase()).await
}

pub async fn get_hand(store: &Store, code: &str, player_id: Uuid) -> Result<Hand, AppError> {
    store.get_hand(&code.to_uppercase(), &player_id).await?.ok_or(AppError::HandNotFound)
}

pub async fn play_turn(store: &Store, code: &str, player_id: Uuid, cards: Vec<Card>) -> Result<GameState, AppError> {
    let code = code.to_uppercase();
    let mut state = store.get_state(&code).await?.ok_or(AppError::GameNotStarted)?;
    if state.status == GameStatus::Finished {
        return Err(AppError::GameFinished);
    }
    if state.current_turn != player_id {
        return Err(AppError::NotYourTurn);
    }

    let hand = store.get_hand(&code, &player_id).await?.ok_or(AppError::HandNotFound)?;
    if !hand_contains(&hand, &cards) {
        return Err(AppError::CardsNotInHand);
    }

    if state.first_turn_required && !cards.iter().any(Card::is_three_of_spades) {
        return Err(AppError::MustLeadThreeSpades);
    }

    let mv = Move::Play { cards: cards.clone(), by_player_id: player_id };
    let new_last_play = validate_move(&mv, state.last_play.as_ref())?;

    if let Some(outgoing) = state.last_play.clone() {
        apply_chop_scoring(store, &code, &outgoing, &mv).await?;
    }

    let remaining = remove_cards(&hand, &cards);
    store.put_hand(&code, &player_id, &remaining).await?;

    state.last_play = new_last_play;
    state.pass_count = 0;
    if state.first_turn_required {
        state.first_turn_required = false;
    }
    let finished = remaining.is_empty();
    if finished {
        state.status = GameStatus::Finished;
        state.winner_id = Some(player_id);
    }
    state.current_turn = next_player(&state.players_order, player_id);
    store.put_state(&code, &state).await?;

    sync_hand_count(store, &code, player_id, remaining.len() as u8).await?;
    if finished {
        apply_end_game_scoring(store, &code).await?;
    }

    Ok(state)
}

pub async fn pass_turn(store: &Store, code: &str, player_id: Uuid) -> Result<GameState, AppError> {
    let code = code.to_uppercase();
    let mut state = store.get_state(&code).await?.ok_or(AppError::GameNotStarted)?;
    if state.current_turn != player_id {
        return Err(AppError::NotYourTurn);
    }
    let Some(last_play) = state.last_play.clone() else {
        return Err(AppError::IllegalPass);
    };

    state.pass_count += 1;
    if state.pass_count >= state.players_order.len() as u32 - 1 {
        state.pass_count = 0;
        state.current_turn = last_play.by_player_id;
        state.last_play = None;
    } else {
        state.current_turn = next_player(&state.players_order, player_id);
    }

    store.put_state(&code, &state).await?;
    Ok(state)
}

/// Returns `(Some(next_state), false)` when a new game started, or
/// `(None, true)` when the series is over and the room reset to waiting.
pub async fn maybe_start_next_game(store: &Store, code: &str) -> Result<(Option<GameState>, bool), AppError> {
    let code = code.to_uppercase();
    let Some(room) = store.get_room(&code).await? else { return Ok((None, false)) };
    let Some(state) = store.get_state(&code).await? else { return Ok((None, false)) };
    if state.status != GameStatus::Finished {
        return Ok((None, false));
    }

    if room.games_played >= room.max_games {
        let mut room = room;
        room.status = RoomStatus::Waiting;
        room.games_played = 0;
        reset_ready_status(store, &code).await?;
        store.put_room(&room).await?;
        store.delete_state(&code).await?;
        store.delete_hands(&code).await?;
        return Ok((None, true));
    }

    let next_state = start_game(store, &code, None).await?;
    Ok((Some(next_state), false))
}

fn hand_contains(hand: &[Card], desired: &[Card]) -> bool {
    let mut counts: HashMap<(u8, Suit), u32> = HashMap::new();
    for c in hand {
        *counts.entry((c.rank, c.suit)).or_insert(0) += 1;
    }
    for c in desired {
        let entry = counts.entry((c.rank, c.suit)).or_insert(0);
        if *entry == 0 {
            return false;
        }
        *entry -= 1;
    }
    true
}

fn remove_cards(hand: &[Card], to_remove: &[Card]) -> Vec<Card> {
    let mut remove_counts: HashMap<(u8, Suit), u32> = HashMap::new();
    for c in to_remove {
        *remove_counts.entry((c.rank, c.suit)).or_insert(0) += 1;
    }
    let mut remaining = Vec::with_capacity(hand.len());
    for c in hand {
        let key = (c.rank, c.suit);
        let count = remove_counts.entry(key).or_insert(0);
        if *count > 0 {
            *count -= 1;
        } else {
            remaining.push(*c);
        }
    }
    remaining
}

async fn sync_hand_count(store: &Store, code: &str, player_id: Uuid, count: u8) -> Result<(), AppError> {
    if let Some(mut player) = store.get_player(code, &player_id).await? {
        player.hand_count = count;
        store.put_player(code, &player).await?;
    }
    Ok(())
}

fn two_penalty(suit: Suit) -> i32 {
    match suit {
        Suit::Spades | Suit::Clubs => 1,
        Suit::Diamonds | Suit::Hearts => 2,
    }
}

/// Mid-trick chop penalty: the winner debits the previous holder
/// whenever the new play supersedes the old one via a special
/// cross-type or upgrade rule.
async fn apply_chop_scoring(store: &Store, code: &str, last_play: &LastPlay, mv: &Move) -> Result<(), AppError> {
    let Move::Play { cards, by_player_id: winner_id } = mv else { return Ok(()) };
    let last_combo = evaluate_combo(&last_play.cards)?;
    let candidate = evaluate_combo(cards)?;

    let delta: i32 = if last_combo.rank == 15 && matches!(last_combo.combo_type, ComboType::Single | ComboType::Pair) {
        if matches!(candidate.combo_type, ComboType::FourKind | ComboType::ConsecutivePairs) {
            last_play.cards.iter().map(|c| two_penalty(c.suit)).sum()
        } else {
            0
        }
    } else if last_combo.combo_type == ComboType::ConsecutivePairs && last_combo.length == 3 {
        if candidate.combo_type == ComboType::ConsecutivePairs && candidate.length == 4 { 2 } else { 0 }
    } else if last_combo.combo_type == ComboType::FourKind {
        if candidate.combo_type == ComboType::ConsecutivePairs && candidate.length == 4 { 2 } else { 0 }
    } else if last_combo.combo_type == ComboType::ConsecutivePairs && last_combo.length == 4 {
        if candidate.combo_type == ComboType::ConsecutivePairs
            && candidate.length == 4
            && can_beat(&candidate, &last_combo)
        {
            4
        } else {
            0
        }
    } else {
        0
    };

    if delta > 0 {
        apply_score_delta(store, code, *winner_id, last_play.by_player_id, delta).await?;
    }
    Ok(())
}

async fn apply_score_delta(store: &Store, code: &str, winner_id: Uuid, loser_id: Uuid, delta: i32) -> Result<(), AppError> {
    if let Some(mut winner) = store.get_player(code, &winner_id).await? {
        winner.score += delta;
        store.put_player(code, &winner).await?;
    }
    if let Some(mut loser) = store.get_player(code, &loser_id).await? {
        loser.score -= delta;
        store.put_player(code, &loser).await?;
    }
    Ok(())
}

/// End-of-hand placement scoring: order by ascending
/// `(remaining_hand_count, seat)`, apply a table-dependent constant sum.
async fn apply_end_game_scoring(store: &Store, code: &str) -> Result<(), AppError> {
    let mut players = store.get_players(code).await?;
    if players.is_empty() {
        return Ok(());
    }
    let mut with_hand_count: Vec<(u8, u8, Uuid)> = Vec::new();
    for p in &players {
        let hand_len = store.get_hand(code, &p.id).await?.map(|h| h.len() as u8).unwrap_or(0);
        with_hand_count.push((hand_len, p.seat, p.id));
    }
    with_hand_count.sort_by_key(|&(hand_len, seat, _)| (hand_len, seat));

    let score_table: &[i32] = match players.len() {
        2 => &[2, -2],
        3 => &[2, 1, -1],
        _ => &[2, 1, -1, -2],
    };

    for (idx, delta) in score_table.iter().enumerate() {
        let Some(&(_, _, pid)) = with_hand_count.get(idx) else { break };
        if let Some(player) = players.iter_mut().find(|p| p.id == pid) {
            player.score += delta;
            store.put_player(code, player).await?;
        }
    }
    Ok(())
}

async fn reset_ready_status(store: &Store, code: &str) -> Result<(), AppError> {
    let players = store.get_players(code).await?;
    for mut player in players {
        if player.is_ready {
            player.is_ready = false;
            store.put_player(code, &player).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Suit;

    fn card(rank: u8, suit: Suit) -> Card {
        Card { rank, suit }
    }

    #[test]
    fn deal_round_robin_caps_at_13_per_player() {
        let players: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let deck = build_deck();
        let hands = deal_hands(&players, deck);
        assert_eq!(hands.len(), 4);
        for hand in hands.values() {
            assert_eq!(hand.len(), CARDS_PER_PLAYER);
        }
        let total: usize = hands.values().map(|h| h.len()).sum();
        assert_eq!(total, 52);
    }

    #[test]
    fn deal_two_players_discards_rest() {
        let players: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let deck = build_deck();
        let hands = deal_hands(&players, deck);
        let total: usize = hands.values().map(|h| h.len()).sum();
        assert_eq!(total, 26);
    }

    #[test]
    fn start_player_holds_three_of_spades() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut hands = HashMap::new();
        hands.insert(a, vec![card(5, Suit::Hearts)]);
        hands.insert(b, vec![card(3, Suit::Spades)]);
        assert_eq!(find_start_player(&[a, b], &hands), b);
    }

    #[test]
    fn hand_contains_and_remove_cards_round_trip() {
        let hand = vec![card(3, Suit::Spades), card(3, Suit::Clubs), card(10, Suit::Hearts)];
        let play = vec![card(3, Suit::Spades)];
        assert!(hand_contains(&hand, &play));
        let remaining = remove_cards(&hand, &play);
        assert_eq!(remaining.len(), 2);
        assert!(!hand_contains(&remaining, &play));
    }

    #[test]
    fn end_game_score_table_sums_to_zero_for_four_players() {
        let table: &[i32] = &[2, 1, -1, -2];
        assert_eq!(table.iter().sum::<i32>(), 0);
    }
}
