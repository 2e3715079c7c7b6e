use std::time::Duration;

use coalesce_core::CoalesceConfig;
use coalesce_random::RandomStringConfig;

use crate::token::RandomTokenGenerator;

/// Default coalescing window.
pub const DEFAULT_MAX_BATCH_TIME: Duration = Duration::from_millis(200);

/// Default length of generated subscription tokens.
pub const DEFAULT_TOKEN_LENGTH: usize = 16;

/// Tunables of an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Coalescing window and hard flush cap. Zero flushes on every publish.
    pub max_batch_time: Duration,
    /// Length of the random part of generated tokens.
    pub token_length: usize,
    pub token_prefix: Option<String>,
    pub token_suffix: Option<String>,
    /// Characters tokens are drawn from; alphanumeric when unset.
    pub token_charset: Option<String>,
}

impl BusConfig {
    pub fn new() -> Self {
        Self {
            max_batch_time: DEFAULT_MAX_BATCH_TIME,
            token_length: DEFAULT_TOKEN_LENGTH,
            token_prefix: None,
            token_suffix: None,
            token_charset: None,
        }
    }

    pub fn with_max_batch_time(mut self, max_batch_time: Duration) -> Self {
        self.max_batch_time = max_batch_time;
        self
    }

    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    pub fn with_token_prefix(mut self, prefix: &str) -> Self {
        self.token_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_token_suffix(mut self, suffix: &str) -> Self {
        self.token_suffix = Some(suffix.to_string());
        self
    }

    pub fn with_token_charset(mut self, charset: &str) -> Self {
        self.token_charset = Some(charset.to_string());
        self
    }

    /// Load from a [`CoalesceConfig`].
    ///
    /// Reads:
    /// - `bus.window.ms` (negative values are clamped to zero)
    /// - `bus.token.length`
    /// - `bus.token.prefix`, `bus.token.suffix`, `bus.token.charset`
    ///
    /// Missing or malformed keys keep their defaults.
    pub fn from_config(config: &CoalesceConfig) -> Self {
        let mut cfg = Self::new();
        if let Ok(ms) = config.get::<i64>("bus.window.ms") {
            cfg.max_batch_time = Duration::from_millis(ms.max(0) as u64);
        }
        if let Ok(length) = config.get::<usize>("bus.token.length") {
            cfg.token_length = length;
        }
        if let Ok(prefix) = config.get::<String>("bus.token.prefix") {
            cfg.token_prefix = Some(prefix);
        }
        if let Ok(suffix) = config.get::<String>("bus.token.suffix") {
            cfg.token_suffix = Some(suffix);
        }
        if let Ok(charset) = config.get::<String>("bus.token.charset") {
            cfg.token_charset = Some(charset);
        }
        cfg
    }

    pub(crate) fn token_generator(&self) -> RandomTokenGenerator {
        RandomTokenGenerator::new(
            RandomStringConfig {
                charset: self.token_charset.clone(),
                prefix: self.token_prefix.clone(),
                suffix: self.token_suffix.clone(),
            },
            self.token_length,
        )
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}
