use std::any::Any;
use std::sync::Arc;

use crate::handler::BoxError;

/// Failure of a single handler invocation, passed to the bus error reporter
/// together with the payload it was invoked with.
#[derive(Debug)]
pub enum HandlerError {
    /// The handler resolved to an `Err`.
    Failed { topic: Arc<str>, source: BoxError },
    /// The handler panicked.
    Panicked { topic: Arc<str>, message: String },
}

impl HandlerError {
    /// Topic the failing handler was subscribed to.
    pub fn topic(&self) -> &str {
        match self {
            HandlerError::Failed { topic, .. } | HandlerError::Panicked { topic, .. } => topic,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, HandlerError::Panicked { .. })
    }

    pub(crate) fn from_panic(topic: Arc<str>, panic: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HandlerError::Panicked { topic, message }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Failed { topic, source } => {
                write!(f, "handler for topic '{topic}' failed: {source}")
            }
            HandlerError::Panicked { topic, message } => {
                write!(f, "handler for topic '{topic}' panicked: {message}")
            }
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Failed { source, .. } => Some(source.as_ref()),
            HandlerError::Panicked { .. } => None,
        }
    }
}
