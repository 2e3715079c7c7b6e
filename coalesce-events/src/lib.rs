//! In-process topic event bus with time-windowed batched delivery.
//!
//! Subscribers register async handlers under string topics. Publishes made
//! within `max_batch_time` of each other are coalesced: only the latest
//! payload per topic is delivered, in one round, once the window closes.
//!
//! ```ignore
//! use std::sync::Arc;
//! use coalesce_events::EventBus;
//! use serde_json::{json, Value};
//!
//! let bus: EventBus = EventBus::new();
//! let token = bus.subscribe("orders", |order: Arc<Value>| async move {
//!     println!("order: {order}");
//! });
//! bus.publish("orders", json!({"id": 1}));
//! bus.publish("orders", json!({"id": 2})); // only this one is delivered
//! bus.unsubscribe("orders", &token);
//! ```

mod bus;
mod clock;
mod config;
mod error;
mod handler;
mod registry;
mod round;
mod token;
mod window;

pub use bus::{EventBus, EventBusBuilder};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{BusConfig, DEFAULT_MAX_BATCH_TIME, DEFAULT_TOKEN_LENGTH};
pub use error::HandlerError;
pub use handler::{BoxError, Handler, HandlerFuture, HandlerOutcome};
pub use token::{RandomTokenGenerator, TokenGenerator};

pub mod prelude {
    //! Re-exports of the most commonly used event types.
    pub use crate::{BusConfig, EventBus, Handler, HandlerError, TokenGenerator};
}
