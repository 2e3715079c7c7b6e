use tracing_subscriber::EnvFilter;

use crate::config::CoalesceConfig;

/// Filter used when neither `RUST_LOG` nor `log.filter` is set.
pub const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for [`init_tracing_with`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set.
    pub filter: String,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }

    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = filter.to_string();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Read `log.filter` and `log.format` (`pretty` | `json`).
    pub fn from_config(config: &CoalesceConfig) -> Self {
        let mut cfg = Self::new();
        if let Ok(filter) = config.get::<String>("log.filter") {
            cfg.filter = filter;
        }
        if let Ok(format) = config.get::<String>("log.format") {
            cfg.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }
        cfg
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a `tracing` subscriber with default settings.
///
/// Respects the `RUST_LOG` environment variable and falls back to `info`.
/// Call once at the start of `main`; later calls are ignored.
pub fn init_tracing() {
    init_tracing_with(&LogConfig::default());
}

/// Install a `tracing` subscriber configured by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing_with(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
