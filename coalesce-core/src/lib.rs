//! Shared runtime support for the Coalesce crates.
//!
//! - [`CoalesceConfig`]: layered key/value configuration (YAML files, `.env`
//!   files, `COALESCE_*` environment variables).
//! - [`init_tracing`] / [`init_tracing_with`]: install the `tracing`
//!   subscriber used by the bus and by applications embedding it.

pub mod config;
pub mod logging;

pub use config::{CoalesceConfig, ConfigError, ConfigValue, FromConfigValue};
pub use logging::{init_tracing, init_tracing_with, LogConfig, LogFormat};
