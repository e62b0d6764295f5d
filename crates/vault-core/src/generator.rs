//! Random password generation for new credentials

use rand::{rngs::OsRng, Rng};

use crate::crypto::SecretString;

const ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%^&*-_=+?";

/// Shortest password the generator will produce
pub const MIN_GENERATED_LEN: usize = 12;

/// Generate a random password of `len` characters (at least
/// [`MIN_GENERATED_LEN`]) drawn uniformly from a printable alphabet.
pub fn generate_password(len: usize) -> SecretString {
    let len = len.max(MIN_GENERATED_LEN);
    let mut rng = OsRng;
    let password: String = (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    SecretString::new(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let password = generate_password(24);

        assert_eq!(password.expose().len(), 24);
        assert!(password.expose().bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_minimum_length_enforced() {
        assert_eq!(generate_password(4).expose().len(), MIN_GENERATED_LEN);
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(20), generate_password(20));
    }
}
