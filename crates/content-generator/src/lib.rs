//! Synthetic text generator for the search-throughput load generator.
//!
//! This crate provides the `TextGenerator` which produces pseudo-random text
//! blocks of a requested length. The generator uses a seeded RNG so the same
//! seed always produces the same words and document ids.
//!
//! # Architecture
//!
//! ```text
//!   seed ──► ┌─────────────────┐
//!            │  TextGenerator  │
//!            │                 │
//!            │  - alphabet     │
//!            │  - rng (StdRng) │
//!            └────────┬────────┘
//!                     │
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//!   build_text(len, w, v)    next_id()
//! ```
//!
//! A generator is not meant to be shared between threads. Each submission
//! worker owns its own instance, seeded with [`seed_for_worker`].
//!
//! # Example
//!
//! ```rust
//! use content_generator::TextGenerator;
//!
//! let mut generator = TextGenerator::new(42);
//! let text = generator.build_text(100, 10, 2).unwrap();
//! assert!(text.len() >= 100);
//! ```

pub mod generator;

// Re-exports for convenience
pub use generator::{
    seed_for_worker, validate_word_length, GeneratorError, TextGenerator, DEFAULT_ALPHABET,
    DEFAULT_SEED,
};
