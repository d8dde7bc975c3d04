//! Prefixed short record identifiers (`br-`, `ld-`, `pl-`, `ah-`, `us-`).
//!
//! The alphabet drops the easily-confused `i`, `l`, `o`, `u` so ids stay
//! legible in logs and URLs.

use rand::Rng;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";
const ID_LEN: usize = 10;

/// Generate a fresh random id with the given prefix, e.g. `br-7k2m9qx04d`.
#[must_use]
pub fn generate(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(prefix.len() + 1 + ID_LEN);
    id.push_str(prefix);
    id.push('-');
    for _ in 0..ID_LEN {
        let index = rng.gen_range(0..ALPHABET.len());
        id.push(char::from(ALPHABET[index]));
    }
    id
}
