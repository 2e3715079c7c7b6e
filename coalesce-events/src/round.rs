use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::HandlerError;
use crate::registry::SharedHandler;

/// Sink for per-handler failures.
pub(crate) type ErrorReporter<P> = Arc<dyn Fn(&HandlerError, &P) + Send + Sync>;

/// One handler bound to one payload, waiting for the next round.
pub(crate) struct Invocation<P> {
    pub(crate) topic: Arc<str>,
    pub(crate) handler: SharedHandler<P>,
    pub(crate) payload: Arc<P>,
}

struct PendingTopic<P> {
    seq: u64,
    invocations: Vec<Invocation<P>>,
}

/// Invocations queued since the last round, per topic.
pub(crate) struct PendingQueue<P> {
    topics: HashMap<Arc<str>, PendingTopic<P>>,
}

impl<P> PendingQueue<P> {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Replace whatever was queued for `topic`. `seq` is the topic's
    /// registration order.
    pub(crate) fn replace(&mut self, topic: Arc<str>, seq: u64, invocations: Vec<Invocation<P>>) {
        self.topics.insert(topic, PendingTopic { seq, invocations });
    }

    /// Take every queued invocation, topics in registration order and
    /// subscribers in subscription order, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<Invocation<P>> {
        let mut topics: Vec<PendingTopic<P>> =
            std::mem::take(&mut self.topics).into_values().collect();
        topics.sort_by_key(|t| t.seq);
        topics.into_iter().flat_map(|t| t.invocations).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.topics.values().map(|t| t.invocations.len()).sum()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RoundSummary {
    pub(crate) dispatched: usize,
    pub(crate) failed: usize,
}

/// Run one round: spawn every invocation, then wait for all of them.
///
/// Each failure (error result or panic) is passed to `on_error` with the
/// payload of the failing invocation. A panicking reporter is logged and
/// otherwise ignored.
pub(crate) async fn dispatch<P>(invocations: Vec<Invocation<P>>, on_error: &ErrorReporter<P>) -> RoundSummary
where
    P: Send + Sync + 'static,
{
    let mut tasks = Vec::with_capacity(invocations.len());
    for Invocation {
        topic,
        handler,
        payload,
    } in invocations
    {
        let arg = payload.clone();
        let task = tokio::spawn(async move { handler.handle(arg).await });
        tasks.push((topic, payload, task));
    }

    let mut summary = RoundSummary {
        dispatched: tasks.len(),
        failed: 0,
    };
    for (topic, payload, task) in tasks {
        let error = match task.await {
            Ok(Ok(())) => continue,
            Ok(Err(source)) => HandlerError::Failed { topic, source },
            Err(join) if join.is_panic() => HandlerError::from_panic(topic, join.into_panic()),
            // Cancelled by runtime shutdown.
            Err(_) => continue,
        };
        summary.failed += 1;
        if catch_unwind(AssertUnwindSafe(|| on_error(&error, &payload))).is_err() {
            tracing::error!(topic = error.topic(), "publish error reporter panicked");
        }
    }
    summary
}
