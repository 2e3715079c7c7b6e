use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed error returned by fallible handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Future produced by [`Handler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// A subscriber callback.
///
/// Implemented for every `Fn(Arc<P>) -> Fut` where `Fut` resolves to `()` or
/// to `Result<(), E>` with `E: Into<BoxError>`, so plain async closures can
/// be subscribed directly:
///
/// ```ignore
/// bus.subscribe("orders", |order: Arc<Value>| async move {
///     println!("{order}");
/// });
/// ```
pub trait Handler<P>: Send + Sync + 'static {
    fn handle(&self, payload: Arc<P>) -> HandlerFuture;
}

impl<P, F, Fut> Handler<P> for F
where
    P: Send + Sync + 'static,
    F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerOutcome,
{
    fn handle(&self, payload: Arc<P>) -> HandlerFuture {
        let fut = self(payload);
        Box::pin(async move { fut.await.into_result() })
    }
}

/// Values a handler future may resolve to. Only failure is observed; any
/// success value is discarded.
pub trait HandlerOutcome: Send + 'static {
    fn into_result(self) -> Result<(), BoxError>;
}

impl HandlerOutcome for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> HandlerOutcome for Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}
