//! ID utilities (room codes).

use rand::Rng;

/// 32 unambiguous symbols: no I, O, 0, 1.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;

/// Generate a 6-character room code over the confusable-free alphabet.
/// Collisions are the caller's responsibility to detect and re-roll.
pub fn new_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}
