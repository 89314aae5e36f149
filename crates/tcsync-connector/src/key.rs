//! Client-side group key generation.

use rand::rngs::OsRng;
use rand::Rng;

/// Alphabet group keys are drawn from.
pub const GROUP_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated group key.
pub const GROUP_KEY_LEN: usize = 16;

/// Generate a random group key.
///
/// Uniqueness is not checked against the server; a collision surfaces as a
/// create conflict on the POST.
pub fn generate_group_key() -> String {
    (0..GROUP_KEY_LEN)
        .map(|_| {
            let idx = OsRng.gen_range(0..GROUP_KEY_ALPHABET.len());
            GROUP_KEY_ALPHABET[idx] as char
        })
        .collect()
}
