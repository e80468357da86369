//! The combo rule engine: pure functions over cards, no I/O. Includes the
//! cross-type "special beat" table for bombing 2s and upgrading
//! consecutive-pair bombs.

use std::collections::HashMap;

use crate::error::AppError;
use crate::model::{Card, Combo, ComboType, LastPlay, Move, RANK_TWO};

/// Classify a non-empty card set. Rules are tried in order; the first
/// match wins.
pub fn evaluate_combo(cards: &[Card]) -> Result<Combo, AppError> {
    if cards.is_empty() {
        return Err(AppError::InvalidCombo("no cards provided".into()));
    }

    if cards.len() == 1 {
        let card = cards[0];
        return Ok(Combo { combo_type: ComboType::Single, rank: card.rank, length: 1, suit: Some(card.suit) });
    }

    let counts = rank_counts(cards);
    let mut unique_ranks: Vec<u8> = counts.keys().copied().collect();
    unique_ranks.sort_unstable();

    if cards.len() == 2 && counts.len() == 1 {
        return Ok(Combo { combo_type: ComboType::Pair, rank: unique_ranks[0], length: 2, suit: None });
    }
    if cards.len() == 3 && counts.len() == 1 {
        return Ok(Combo { combo_type: ComboType::Triple, rank: unique_ranks[0], length: 3, suit: None });
    }
    if cards.len() == 4 && counts.len() == 1 {
        return Ok(Combo { combo_type: ComboType::FourKind, rank: unique_ranks[0], length: 4, suit: None });
    }

    if is_consecutive_pairs(cards, &counts, &unique_ranks) {
        let high_rank = *unique_ranks.last().unwrap();
        return Ok(Combo { combo_type: ComboType::ConsecutivePairs, rank: high_rank, length: cards.len() / 2, suit: None });
    }

    if is_straight(&unique_ranks, cards.len()) {
        let high_rank = *unique_ranks.last().unwrap();
        return Ok(Combo { combo_type: ComboType::Straight, rank: high_rank, length: cards.len(), suit: None });
    }

    Err(AppError::InvalidCombo(format!("{} cards do not form a valid combo", cards.len())))
}

/// Same-type dominance only. Sequences must match length.
pub fn can_beat(candidate: &Combo, last: &Combo) -> bool {
    if candidate.combo_type != last.combo_type {
        return false;
    }
    if matches!(candidate.combo_type, ComboType::Straight | ComboType::ConsecutivePairs)
        && candidate.length != last.length
    {
        return false;
    }
    if candidate.rank != last.rank {
        return candidate.rank > last.rank;
    }
    if candidate.combo_type == ComboType::Single {
        if let (Some(c), Some(l)) = (candidate.suit, last.suit) {
            return c > l;
        }
    }
    false
}

/// Cross-type "chop" dominance: bombs against 2s, and consecutive-pair
/// upgrades against bombs/shorter consecutive-pair runs.
fn can_special_beat(candidate: &Combo, last: &Combo) -> bool {
    let is_single_two = last.combo_type == ComboType::Single && last.rank == RANK_TWO;
    let is_pair_two = last.combo_type == ComboType::Pair && last.rank == RANK_TWO;

    match candidate.combo_type {
        ComboType::FourKind => is_single_two || is_pair_two,
        ComboType::ConsecutivePairs if candidate.length == 3 => is_single_two,
        ComboType::ConsecutivePairs if candidate.length == 4 => {
            is_single_two || is_pair_two || last.combo_type == ComboType::FourKind
        }
        ComboType::ConsecutivePairs if candidate.length > 4 => is_single_two || is_pair_two,
        _ => false,
    }
}

/// Same-type special upgrade: a longer consecutive-pair run of higher
/// rank beats a length-3 run of the same type.
fn can_special_upgrade(candidate: &Combo, last: &Combo) -> bool {
    candidate.combo_type == ComboType::ConsecutivePairs
        && last.combo_type == ComboType::ConsecutivePairs
        && candidate.length == 4
        && last.length == 3
        && candidate.rank > last.rank
}

/// Validate a move against the current last play. Returns the new
/// `LastPlay` on a successful `play`, or `None` on a successful `pass`.
pub fn validate_move(mv: &Move, last_play: Option<&LastPlay>) -> Result<Option<LastPlay>, AppError> {
    match mv {
        Move::Pass { .. } => {
            if last_play.is_none() {
                return Err(AppError::IllegalPass);
            }
            Ok(None)
        }
        Move::Play { cards, by_player_id } => {
            if cards.is_empty() {
                return Err(AppError::InvalidCombo("play requires cards".into()));
            }
            let candidate = evaluate_combo(cards)?;
            if let Some(last) = last_play {
                let last_combo = evaluate_combo(&last.cards)?;
                let beats = if candidate.combo_type != last_combo.combo_type {
                    can_special_beat(&candidate, &last_combo)
                } else {
                    can_beat(&candidate, &last_combo) || can_special_upgrade(&candidate, &last_combo)
                };
                if !beats {
                    return Err(AppError::IllegalMove);
                }
            }
            Ok(Some(LastPlay { combo_type: candidate.combo_type, cards: cards.clone(), by_player_id: *by_player_id }))
        }
    }
}

fn rank_counts(cards: &[Card]) -> HashMap<u8, u32> {
    let mut counts = HashMap::new();
    for card in cards {
        *counts.entry(card.rank).or_insert(0) += 1;
    }
    counts
}

fn is_straight(unique_ranks: &[u8], total_cards: usize) -> bool {
    if total_cards < 3 || unique_ranks.len() != total_cards {
        return false;
    }
    if unique_ranks.contains(&RANK_TWO) {
        return false;
    }
    unique_ranks.windows(2).all(|w| w[1] - w[0] == 1)
}

fn is_consecutive_pairs(cards: &[Card], counts: &HashMap<u8, u32>, unique_ranks: &[u8]) -> bool {
    if cards.len() < 6 || cards.len() % 2 != 0 {
        return false;
    }
    if counts.values().any(|&c| c != 2) {
        return false;
    }
    if unique_ranks.contains(&RANK_TWO) {
        return false;
    }
    unique_ranks.windows(2).all(|w| w[1] - w[0] == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Suit;
    use uuid::Uuid;

    fn c(rank: u8, suit: Suit) -> Card {
        Card { rank, suit }
    }

    #[test]
    fn single_carries_suit() {
        let combo = evaluate_combo(&[c(10, Suit::Hearts)]).unwrap();
        assert_eq!(combo.combo_type, ComboType::Single);
        assert_eq!(combo.suit, Some(Suit::Hearts));
    }

    #[test]
    fn pair_triple_four_kind() {
        assert_eq!(evaluate_combo(&[c(5, Suit::Spades), c(5, Suit::Clubs)]).unwrap().combo_type, ComboType::Pair);
        assert_eq!(
            evaluate_combo(&[c(5, Suit::Spades), c(5, Suit::Clubs), c(5, Suit::Diamonds)]).unwrap().combo_type,
            ComboType::Triple
        );
        assert_eq!(
            evaluate_combo(&[c(5, Suit::Spades), c(5, Suit::Clubs), c(5, Suit::Diamonds), c(5, Suit::Hearts)])
                .unwrap()
                .combo_type,
            ComboType::FourKind
        );
    }

    #[test]
    fn straight_rejects_rank_15() {
        let cards = [c(13, Suit::Spades), c(14, Suit::Spades), c(15, Suit::Spades)];
        assert!(evaluate_combo(&cards).is_err());
    }

    #[test]
    fn straight_accepts_three_run() {
        let cards = [c(3, Suit::Spades), c(4, Suit::Clubs), c(5, Suit::Diamonds)];
        let combo = evaluate_combo(&cards).unwrap();
        assert_eq!(combo.combo_type, ComboType::Straight);
        assert_eq!(combo.rank, 5);
    }

    #[test]
    fn consecutive_pairs_rejects_rank_15() {
        let cards = [
            c(11, Suit::Spades), c(11, Suit::Clubs),
            c(12, Suit::Spades), c(12, Suit::Clubs),
            c(15, Suit::Spades), c(15, Suit::Clubs),
        ];
        assert!(evaluate_combo(&cards).is_err());
    }

    #[test]
    fn consecutive_pairs_needs_three_distinct_ranks() {
        let cards = [
            c(3, Suit::Spades), c(3, Suit::Clubs),
            c(4, Suit::Spades), c(4, Suit::Clubs),
        ];
        // only 4 cards: too short for consecutive_pairs, also not a straight (not distinct ranks)
        assert!(evaluate_combo(&cards).is_err());
    }

    #[test]
    fn single_suit_order_breaks_ties() {
        let candidate = evaluate_combo(&[c(10, Suit::Clubs)]).unwrap();
        let last = evaluate_combo(&[c(10, Suit::Spades)]).unwrap();
        assert!(can_beat(&candidate, &last));
        assert!(!can_beat(&last, &candidate));
    }

    #[test]
    fn sequence_length_mismatch_never_beats() {
        let candidate = evaluate_combo(&[c(5, Suit::Spades), c(6, Suit::Spades), c(7, Suit::Spades), c(8, Suit::Spades)]).unwrap();
        let last = evaluate_combo(&[c(3, Suit::Spades), c(4, Suit::Spades), c(5, Suit::Clubs)]).unwrap();
        assert!(!can_beat(&candidate, &last));
    }

    #[test]
    fn four_kind_bombs_single_two() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::Single, cards: vec![c(15, Suit::Hearts)], by_player_id: pid };
        let mv = Move::Play { cards: vec![c(6, Suit::Spades), c(6, Suit::Clubs), c(6, Suit::Diamonds), c(6, Suit::Hearts)], by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).unwrap().is_some());
    }

    #[test]
    fn four_kind_bombs_pair_two() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::Pair, cards: vec![c(15, Suit::Spades), c(15, Suit::Clubs)], by_player_id: pid };
        let mv = Move::Play { cards: vec![c(6, Suit::Spades), c(6, Suit::Clubs), c(6, Suit::Diamonds), c(6, Suit::Hearts)], by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).unwrap().is_some());
    }

    #[test]
    fn consecutive_pairs_len4_bombs_single_two() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::Single, cards: vec![c(15, Suit::Hearts)], by_player_id: pid };
        let cards = vec![
            c(3, Suit::Spades), c(3, Suit::Clubs),
            c(4, Suit::Spades), c(4, Suit::Clubs),
            c(5, Suit::Spades), c(5, Suit::Clubs),
            c(6, Suit::Spades), c(6, Suit::Clubs),
        ];
        let mv = Move::Play { cards, by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).unwrap().is_some());
    }

    #[test]
    fn consecutive_pairs_len5_does_not_bomb_four_kind() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::FourKind, cards: vec![c(9, Suit::Spades), c(9, Suit::Clubs), c(9, Suit::Diamonds), c(9, Suit::Hearts)], by_player_id: pid };
        let cards = vec![
            c(3, Suit::Spades), c(3, Suit::Clubs),
            c(4, Suit::Spades), c(4, Suit::Clubs),
            c(5, Suit::Spades), c(5, Suit::Clubs),
            c(6, Suit::Spades), c(6, Suit::Clubs),
            c(7, Suit::Spades), c(7, Suit::Clubs),
        ];
        let mv = Move::Play { cards, by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).is_err());
    }

    #[test]
    fn consecutive_pairs_len3_only_bombs_single_two_not_pair() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::Pair, cards: vec![c(15, Suit::Spades), c(15, Suit::Clubs)], by_player_id: pid };
        let cards = vec![
            c(3, Suit::Spades), c(3, Suit::Clubs),
            c(4, Suit::Spades), c(4, Suit::Clubs),
            c(5, Suit::Spades), c(5, Suit::Clubs),
        ];
        let mv = Move::Play { cards, by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).is_err());
    }

    #[test]
    fn consecutive_pairs_len4_beats_four_kind() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::FourKind, cards: vec![c(9, Suit::Spades), c(9, Suit::Clubs), c(9, Suit::Diamonds), c(9, Suit::Hearts)], by_player_id: pid };
        let cards = vec![
            c(3, Suit::Spades), c(3, Suit::Clubs),
            c(4, Suit::Spades), c(4, Suit::Clubs),
            c(5, Suit::Spades), c(5, Suit::Clubs),
            c(6, Suit::Spades), c(6, Suit::Clubs),
        ];
        let mv = Move::Play { cards, by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).unwrap().is_some());
    }

    #[test]
    fn consecutive_pairs_upgrade_len4_over_len3_higher_rank() {
        let pid = Uuid::new_v4();
        let last = LastPlay {
            combo_type: ComboType::ConsecutivePairs,
            cards: vec![c(3, Suit::Spades), c(3, Suit::Clubs), c(4, Suit::Spades), c(4, Suit::Clubs), c(5, Suit::Spades), c(5, Suit::Clubs)],
            by_player_id: pid,
        };
        let cards = vec![
            c(4, Suit::Diamonds), c(4, Suit::Hearts),
            c(5, Suit::Diamonds), c(5, Suit::Hearts),
            c(6, Suit::Spades), c(6, Suit::Clubs),
            c(7, Suit::Spades), c(7, Suit::Clubs),
        ];
        let mv = Move::Play { cards, by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, Some(&last)).unwrap().is_some());
    }

    #[test]
    fn pass_requires_last_play() {
        let mv = Move::Pass { by_player_id: Uuid::new_v4() };
        assert!(validate_move(&mv, None).is_err());
    }

    #[test]
    fn pass_with_last_play_returns_none() {
        let pid = Uuid::new_v4();
        let last = LastPlay { combo_type: ComboType::Single, cards: vec![c(8, Suit::Hearts)], by_player_id: pid };
        let mv = Move::Pass { by_player_id: Uuid::new_v4() };
        assert_eq!(validate_move(&mv, Some(&last)).unwrap(), None);
    }
}
