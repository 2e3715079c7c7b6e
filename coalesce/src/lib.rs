//! Coalesce: an in-process event bus that batches bursts of publishes.
//!
//! This facade crate re-exports the Coalesce sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use coalesce::prelude::*;
//!
//! coalesce::init_tracing();
//! let config = CoalesceConfig::load("dev")?;
//! let bus: EventBus = EventBus::with_config(BusConfig::from_config(&config));
//! ```
//!
//! # Feature flags
//!
//! | Feature  | Default | Crate             |
//! |----------|---------|-------------------|
//! | `events` | **yes** | `coalesce-events` |
//! | `random` | **yes** | `coalesce-random` |
//!
//! The features are independent: `events` alone does not re-export
//! `coalesce-random`.

pub use coalesce_core::*;

#[cfg(feature = "events")]
pub use coalesce_events;

#[cfg(feature = "random")]
pub use coalesce_random;

/// Unified prelude: `use coalesce::prelude::*`.
pub mod prelude {
    pub use coalesce_core::{init_tracing, CoalesceConfig, ConfigError, LogConfig};

    #[cfg(feature = "events")]
    pub use coalesce_events::prelude::*;

    #[cfg(feature = "random")]
    pub use coalesce_random::{RandomStringConfig, RandomStringGenerator};
}
