//! Random string generation.
//!
//! Used by `coalesce-events` to mint subscription tokens, but usable on its
//! own wherever a short random identifier is needed.

mod string;

pub use string::{random_string, RandomStringConfig, RandomStringGenerator, DEFAULT_CHARSET};
