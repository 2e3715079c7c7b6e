use coalesce_random::{RandomStringConfig, RandomStringGenerator};

/// Mints subscription tokens.
///
/// Tokens only need to be unique within a topic. Closures returning a
/// `String` implement this trait:
///
/// ```ignore
/// let bus: EventBus = EventBus::builder()
///     .token_generator(|| "fixed".to_string())
///     .build();
/// ```
pub trait TokenGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

impl<F> TokenGenerator for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Default generator: fixed-length random strings.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    generator: RandomStringGenerator,
    length: usize,
}

impl RandomTokenGenerator {
    pub fn new(config: RandomStringConfig, length: usize) -> Self {
        Self {
            generator: RandomStringGenerator::new(config),
            length,
        }
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        self.generator.generate(self.length)
    }
}
