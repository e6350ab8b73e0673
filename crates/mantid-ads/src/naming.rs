//! Name validation and generation

use rand::Rng;

/// Body length used for hidden temporary names
pub const HIDDEN_NAME_LENGTH: usize = 9;

/// Prefix used for hidden temporary names
pub const HIDDEN_NAME_PREFIX: &str = mantid_store::HIDDEN_PREFIX;

/// Reason `name` is unacceptable given the `illegal` characters, if any
#[must_use]
pub fn validation_message(name: &str, illegal: &str) -> Option<String> {
    if illegal.is_empty() || !name.contains(|c: char| illegal.contains(c)) {
        return None;
    }
    Some(format!(
        "Invalid object name '{name}'. Names cannot contain any of the following characters: {illegal}"
    ))
}

/// Random lowercase ASCII string of `length` letters
pub fn random_body(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}
