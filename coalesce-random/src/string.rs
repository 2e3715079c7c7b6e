use rand::Rng;

/// Characters used when no charset is configured.
pub const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Settings for [`RandomStringGenerator`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct RandomStringConfig {
    /// Characters to draw from. `None` or empty means [`DEFAULT_CHARSET`].
    pub charset: Option<String>,
    /// Prepended to every generated string.
    pub prefix: Option<String>,
    /// Appended to every generated string.
    pub suffix: Option<String>,
}

impl RandomStringConfig {
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = Some(charset.to_string());
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }
}

/// Generates random strings of a requested length from a fixed charset,
/// wrapped in an optional prefix and suffix.
///
/// Uses the thread-local RNG; not suitable for secrets.
#[derive(Debug, Clone)]
pub struct RandomStringGenerator {
    charset: Vec<char>,
    prefix: String,
    suffix: String,
}

impl RandomStringGenerator {
    pub fn new(config: RandomStringConfig) -> Self {
        let charset = config
            .charset
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
        Self {
            charset: charset.chars().collect(),
            prefix: config.prefix.unwrap_or_default(),
            suffix: config.suffix.unwrap_or_default(),
        }
    }

    /// Generate `prefix + <length random chars> + suffix`.
    pub fn generate(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        let mut out =
            String::with_capacity(self.prefix.len() + length + self.suffix.len());
        out.push_str(&self.prefix);
        for _ in 0..length {
            out.push(self.charset[rng.gen_range(0..self.charset.len())]);
        }
        out.push_str(&self.suffix);
        out
    }

    pub fn charset(&self) -> &[char] {
        &self.charset
    }
}

impl Default for RandomStringGenerator {
    fn default() -> Self {
        Self::new(RandomStringConfig::default())
    }
}

/// Generate a random alphanumeric string of `length` characters.
pub fn random_string(length: usize) -> String {
    RandomStringGenerator::default().generate(length)
}
