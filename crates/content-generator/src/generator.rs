//! Seeded word and text generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Alphabet used when none is supplied.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 15;

/// Error type for generator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// Alphabet has no characters to draw from
    #[error("Alphabet must not be empty")]
    EmptyAlphabet,

    /// Alphabet contains multi-byte characters
    #[error("Alphabet must be ASCII, got {0:?}")]
    NonAsciiAlphabet(String),

    /// Word length range would allow empty words
    #[error(
        "Word length variation ({variation}) must be smaller than the average word length ({average})"
    )]
    InvalidWordLength { average: usize, variation: usize },
}

/// Derive the RNG seed for one worker from the run's base seed.
///
/// Workers get independent streams while a run stays reproducible for a given
/// base seed and worker index.
pub fn seed_for_worker(base_seed: u64, worker_index: usize) -> u64 {
    base_seed.wrapping_add((worker_index as u64).wrapping_mul(0x9E3779B97F4A7C15))
}

/// Generator of pseudo-random words, text blocks and document ids.
pub struct TextGenerator {
    /// Characters words are built from
    alphabet: Vec<char>,
    /// Seeded random number generator for reproducibility
    rng: StdRng,
}

impl TextGenerator {
    /// Create a generator over the default alphabet.
    pub fn new(seed: u64) -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator over a custom alphabet.
    ///
    /// The alphabet must be non-empty ASCII so that text length in bytes
    /// matches its length in characters.
    pub fn with_alphabet(alphabet: &str, seed: u64) -> Result<Self, GeneratorError> {
        if alphabet.is_empty() {
            return Err(GeneratorError::EmptyAlphabet);
        }
        if !alphabet.is_ascii() {
            return Err(GeneratorError::NonAsciiAlphabet(alphabet.to_string()));
        }

        Ok(Self {
            alphabet: alphabet.chars().collect(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Get the alphabet as a string.
    pub fn alphabet(&self) -> String {
        self.alphabet.iter().collect()
    }

    /// Generate a word of exactly `length` characters.
    pub fn next_word(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| self.alphabet[self.rng.gen_range(0..self.alphabet.len())])
            .collect()
    }

    /// Build space-separated text of at least `length` bytes.
    ///
    /// Word lengths are drawn uniformly from
    /// `[average_word_length - variation, average_word_length + variation)`.
    /// The result overshoots `length` by at most one word.
    pub fn build_text(
        &mut self,
        length: usize,
        average_word_length: usize,
        variation: usize,
    ) -> Result<String, GeneratorError> {
        validate_word_length(average_word_length, variation)?;

        let mut text = String::with_capacity(length + average_word_length + variation);
        while text.len() < length {
            if !text.is_empty() {
                text.push(' ');
            }
            let word_length = self.word_length(average_word_length, variation);
            let word = self.next_word(word_length);
            text.push_str(&word);
        }

        Ok(text)
    }

    /// Generate a document id as 32 lowercase hex digits.
    ///
    /// Ids are UUID v4 values drawn from the seeded RNG, so they are unique
    /// in practice and reproducible for a given seed.
    pub fn next_id(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .simple()
            .to_string()
    }

    fn word_length(&mut self, average: usize, variation: usize) -> usize {
        if variation == 0 {
            average
        } else {
            self.rng.gen_range(average - variation..average + variation)
        }
    }
}

/// Check that a word length range never yields empty words.
pub fn validate_word_length(average: usize, variation: usize) -> Result<(), GeneratorError> {
    if variation >= average {
        return Err(GeneratorError::InvalidWordLength { average, variation });
    }
    Ok(())
}
