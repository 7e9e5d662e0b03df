//! Password generation for rotated credentials.
//!
//! Every password contains at least one uppercase letter, one lowercase
//! letter, one digit and one symbol. Characters are drawn from the operating
//! system CSPRNG; `Rng::gen_range` samples by rejection, so no index is
//! favoured when a character set size is not a power of two.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::SecretString;

/// One guaranteed character per class.
pub const MIN_PASSWORD_LENGTH: usize = 4;

pub const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// Characters that break connection URLs, shell quoting or SQL literals.
pub const DEFAULT_EXCLUDE_CHARACTERS: &str = "/@\"'\\`";

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Invalid password length {length}: must be at least {minimum}")]
    InvalidLength { length: usize, minimum: usize },

    #[error("Character class '{class}' is empty after exclusions")]
    EmptyCharacterClass { class: &'static str },
}

/// Length and character exclusions for generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub length: usize,
    pub exclude_characters: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_PASSWORD_LENGTH,
            exclude_characters: DEFAULT_EXCLUDE_CHARACTERS.to_string(),
        }
    }
}

impl PasswordPolicy {
    pub fn with_length(length: usize) -> Self {
        Self { length, ..Default::default() }
    }

    /// The four character classes with exclusions removed.
    fn classes(&self) -> Result<[(&'static str, Vec<char>); 4], PasswordError> {
        let filter = |set: &str| -> Vec<char> {
            set.chars().filter(|c| !self.exclude_characters.contains(*c)).collect()
        };

        let classes = [
            ("upper", filter(UPPERCASE)),
            ("lower", filter(LOWERCASE)),
            ("digit", filter(DIGITS)),
            ("symbol", filter(SYMBOLS)),
        ];

        if let Some((class, _)) = classes.iter().find(|(_, chars)| chars.is_empty()) {
            return Err(PasswordError::EmptyCharacterClass { class });
        }
        Ok(classes)
    }

    /// Checks that the policy can produce a password at all.
    pub fn validate(&self) -> Result<(), PasswordError> {
        if self.length < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::InvalidLength {
                length: self.length,
                minimum: MIN_PASSWORD_LENGTH,
            });
        }
        self.classes().map(|_| ())
    }

    /// Generates a password with the OS random source.
    pub fn generate(&self) -> Result<SecretString, PasswordError> {
        self.generate_with(&mut OsRng)
    }

    /// Generates a password with a caller-supplied cryptographic RNG.
    pub fn generate_with<R>(&self, rng: &mut R) -> Result<SecretString, PasswordError>
    where
        R: Rng + CryptoRng + ?Sized,
    {
        self.validate()?;

        let classes = self.classes()?;
        let union: Vec<char> = classes.iter().flat_map(|(_, chars)| chars.iter().copied()).collect();

        let mut buffer: Vec<char> = Vec::with_capacity(self.length);
        for (_, chars) in &classes {
            buffer.push(chars[rng.gen_range(0..chars.len())]);
        }
        while buffer.len() < self.length {
            buffer.push(union[rng.gen_range(0..union.len())]);
        }
        buffer.shuffle(rng);

        let password = SecretString::new(buffer.iter().collect::<String>());
        zeroize::Zeroize::zeroize(&mut buffer);
        Ok(password)
    }
}

/// Generates a password of `length` characters with the default exclusions.
pub fn generate(length: usize) -> Result<SecretString, PasswordError> {
    PasswordPolicy::with_length(length).generate()
}
