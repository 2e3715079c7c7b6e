use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, TokioClock};
use crate::config::BusConfig;
use crate::error::HandlerError;
use crate::handler::{Handler, HandlerOutcome};
use crate::registry::{Inserted, Registry, SharedHandler};
use crate::round::{dispatch, ErrorReporter, Invocation, PendingQueue};
use crate::token::TokenGenerator;
use crate::window::{BatchWindow, WindowAction};

struct State<P> {
    registry: Registry<P>,
    pending: PendingQueue<P>,
    window: BatchWindow,
}

struct Shared<P> {
    state: Mutex<State<P>>,
    tokens: Arc<dyn TokenGenerator>,
    on_error: ErrorReporter<P>,
    clock: Arc<dyn Clock>,
    /// Trigger channel of the round scheduler, spawned on first use.
    rounds: Mutex<Option<mpsc::UnboundedSender<()>>>,
}

impl<P> Shared<P>
where
    P: Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, State<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the scheduler for a round, (re)spawning it if needed.
    fn trigger(self: &Arc<Self>) {
        let mut rounds = self.rounds.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = rounds.as_ref() {
            if tx.send(()).is_ok() {
                return;
            }
        }
        let tx = spawn_scheduler(Arc::downgrade(self));
        let _ = tx.send(());
        *rounds = Some(tx);
    }

    fn arm_timer(self: &Arc<Self>, epoch: u64, delay: Duration, cancel: CancellationToken) {
        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let Some(shared) = shared.upgrade() else {
                        return;
                    };
                    let fire = shared.lock().window.on_timer_fired(epoch);
                    if fire {
                        shared.trigger();
                    }
                }
            }
        });
    }
}

/// Runs rounds one after another until the bus is dropped.
fn spawn_scheduler<P>(shared: Weak<Shared<P>>) -> mpsc::UnboundedSender<()>
where
    P: Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        let mut round: u64 = 0;
        while rx.recv().await.is_some() {
            let Some(bus) = shared.upgrade() else {
                break;
            };
            let invocations = bus.lock().pending.drain();
            let on_error = bus.on_error.clone();
            drop(bus);

            if invocations.is_empty() {
                continue;
            }
            round += 1;
            let summary = dispatch(invocations, &on_error).await;
            tracing::debug!(
                round,
                dispatched = summary.dispatched,
                failed = summary.failed,
                "event round completed"
            );
        }
        tracing::trace!("event round scheduler stopped");
    });
    tx
}

/// In-process topic bus with time-windowed batched delivery.
///
/// Publishing never runs handlers inline. Each publish replaces the topic's
/// pending invocations (one per current subscriber) and either re-arms the
/// trailing flush timer or, once the window is older than
/// `max_batch_time`, triggers a round right away. Rounds run one at a time;
/// within a round every invocation is its own Tokio task.
///
/// `EventBus` is `Clone`; clones share the same registry and window.
pub struct EventBus<P = Value> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P> EventBus<P>
where
    P: Send + Sync + 'static,
{
    /// Create a bus with the default configuration: 200 ms window,
    /// 16-character random tokens, failures logged through `tracing`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EventBusBuilder<P> {
        EventBusBuilder::new()
    }

    pub fn max_batch_time(&self) -> Duration {
        self.shared.lock().window.max_batch_time()
    }

    /// Subscribe `handler` to `topic` and return its token.
    ///
    /// The handler receives the published payload as `Arc<P>` and may return
    /// `()` or `Result<(), E>`; errors and panics go to the bus error
    /// reporter.
    pub fn subscribe<F, Fut>(&self, topic: &str, handler: F) -> String
    where
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutcome,
    {
        self.subscribe_shared(topic, Arc::new(handler))
    }

    /// Subscribe an already shared handler. [`EventBus::handler`] hands back
    /// this same `Arc`.
    pub fn subscribe_shared(&self, topic: &str, handler: Arc<dyn Handler<P>>) -> String {
        let token = self.shared.tokens.generate();
        let inserted = self.shared.lock().registry.insert(topic, token.clone(), handler);
        if inserted == Inserted::Replaced {
            tracing::warn!(topic, token = %token, "subscription token collision, replacing existing handler");
        }
        token
    }

    /// Remove one subscription. Invocations already queued for it still run.
    pub fn unsubscribe(&self, topic: &str, token: &str) -> bool {
        self.shared.lock().registry.remove(topic, token)
    }

    /// Remove every subscription of `topic`.
    pub fn unsubscribe_all(&self, topic: &str) -> bool {
        self.shared.lock().registry.remove_topic(topic)
    }

    /// Clear the registry. An armed timer and queued invocations are kept.
    pub fn remove_all_topics(&self) {
        self.shared.lock().registry.clear();
    }

    /// Queue delivery of `payload` to the current subscribers of `topic`.
    ///
    /// A later publish to the same topic inside the window replaces this one.
    /// Publishing to a topic without subscribers does nothing.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like `tokio::spawn`.
    pub fn publish(&self, topic: &str, payload: P) {
        let action = {
            let mut guard = self.shared.lock();
            let State {
                registry,
                pending,
                window,
            } = &mut *guard;

            let Some(entry) = registry.get(topic) else {
                return;
            };
            let topic: Arc<str> = Arc::from(topic);
            let payload = Arc::new(payload);
            let invocations = entry
                .subscribers
                .iter()
                .map(|s| Invocation {
                    topic: topic.clone(),
                    handler: s.handler.clone(),
                    payload: payload.clone(),
                })
                .collect();
            pending.replace(topic, entry.seq, invocations);
            window.on_publish(self.shared.clock.now())
        };

        match action {
            WindowAction::Flush => self.shared.trigger(),
            WindowAction::Arm {
                epoch,
                delay,
                cancel,
            } => self.shared.arm_timer(epoch, delay, cancel),
        }
    }

    /// Topics with at least one subscriber, in registration order.
    pub fn active_topics(&self) -> Vec<String> {
        self.shared.lock().registry.active_topics()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared.lock().registry.subscriber_count(topic)
    }

    pub fn is_subscribed(&self, topic: &str, token: &str) -> bool {
        self.shared.lock().registry.handler(topic, token).is_some()
    }

    /// The handler stored under `(topic, token)`.
    pub fn handler(&self, topic: &str, token: &str) -> Option<SharedHandler<P>> {
        self.shared.lock().registry.handler(topic, token)
    }
}

impl EventBus<Value> {
    /// Serialize `payload` to JSON and publish it.
    pub fn publish_json<T>(&self, topic: &str, payload: &T) -> Result<(), serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)?;
        self.publish(topic, value);
        Ok(())
    }
}

impl<P> Default for EventBus<P>
where
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for EventBus<P>
where
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("max_batch_time", &self.max_batch_time())
            .field("active_topics", &self.active_topics())
            .finish()
    }
}

/// Builder for [`EventBus`].
///
/// ```ignore
/// let bus: EventBus = EventBus::builder()
///     .max_batch_time(Duration::from_millis(50))
///     .on_publish_error(|err, payload| eprintln!("{err}: {payload}"))
///     .build();
/// ```
pub struct EventBusBuilder<P = Value> {
    config: BusConfig,
    tokens: Option<Arc<dyn TokenGenerator>>,
    on_error: Option<ErrorReporter<P>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<P> EventBusBuilder<P>
where
    P: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            config: BusConfig::default(),
            tokens: None,
            on_error: None,
            clock: None,
        }
    }

    /// Replace the whole configuration. Call before
    /// [`max_batch_time`](Self::max_batch_time) if both are used.
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_batch_time(mut self, max_batch_time: Duration) -> Self {
        self.config.max_batch_time = max_batch_time;
        self
    }

    /// Mint tokens with `tokens` instead of the configured random generator.
    pub fn token_generator<G: TokenGenerator>(mut self, tokens: G) -> Self {
        self.tokens = Some(Arc::new(tokens));
        self
    }

    /// Called once per failed or panicked handler invocation, with the
    /// payload that invocation received.
    pub fn on_publish_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&HandlerError, &P) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Use the default reporter, but include the failing payload in the log
    /// event.
    pub fn log_failed_payloads(mut self) -> Self
    where
        P: Debug,
    {
        self.on_error = Some(payload_reporter());
        self
    }

    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> EventBus<P> {
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(self.config.token_generator()));
        let on_error = self.on_error.unwrap_or_else(default_reporter);
        let clock = self.clock.unwrap_or_else(|| Arc::new(TokioClock));

        EventBus {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    registry: Registry::new(),
                    pending: PendingQueue::new(),
                    window: BatchWindow::new(self.config.max_batch_time),
                }),
                tokens,
                on_error,
                clock,
                rounds: Mutex::new(None),
            }),
        }
    }
}

impl<P> Default for EventBusBuilder<P>
where
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Logs the failure and the payload type. Payloads themselves are only
/// logged by [`payload_reporter`], since `P` need not be `Debug`.
fn default_reporter<P: 'static>() -> ErrorReporter<P> {
    Arc::new(|err: &HandlerError, _: &P| {
        tracing::error!(
            topic = err.topic(),
            payload_type = std::any::type_name::<P>(),
            error = %err,
            "event handler failed"
        );
    })
}

fn payload_reporter<P: Debug + 'static>() -> ErrorReporter<P> {
    Arc::new(|err: &HandlerError, payload: &P| {
        tracing::error!(topic = err.topic(), payload = ?payload, error = %err, "event handler failed");
    })
}
