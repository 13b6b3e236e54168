//! Random identifiers for players and matches.

use rand::Rng;

const PLAYER_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MATCH_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated player ids.
pub const PLAYER_ID_LEN: usize = 12;

/// Length of generated match ids.
pub const MATCH_ID_LEN: usize = 8;

fn random_string(charset: &'static [u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Generates a lowercase alphanumeric player id.
pub fn generate_player_id() -> String {
    random_string(PLAYER_CHARSET, PLAYER_ID_LEN)
}

/// Generates an uppercase alphanumeric match id.
pub fn generate_match_id() -> String {
    random_string(MATCH_CHARSET, MATCH_ID_LEN)
}
