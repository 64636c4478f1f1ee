//! Configuration for the chat client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ChatError, ChatResult};

/// Environment variable for the listening port.
pub const PORT_ENV: &str = "PARLEY_PORT";
/// Environment variable for the storage file.
pub const DB_PATH_ENV: &str = "PARLEY_DB_PATH";
/// Environment variable for the model identifier.
pub const MODEL_ENV: &str = "PARLEY_HF_MODEL";
/// Environment variable for the bearer token.
pub const TOKEN_ENV: &str = "PARLEY_HF_TOKEN";
/// Environment variable for the inference base URL.
pub const BASE_URL_ENV: &str = "PARLEY_HF_BASE_URL";
/// Environment variable for the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "PARLEY_REQUEST_TIMEOUT_SECS";
/// Environment variable for the static asset directory.
pub const STATIC_DIR_ENV: &str = "PARLEY_STATIC_DIR";

/// Storage path that selects the in-memory slot store.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Listening port on localhost.
    pub port: u16,
    /// `SQLite` file holding the conversation slot.
    pub db_path: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Inference endpoint settings.
    pub remote: RemoteConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: PathBuf::from("parley.sqlite"),
            static_dir: PathBuf::from("static"),
            remote: RemoteConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the process environment.
    ///
    /// # Errors
    /// Returns `Config` if a numeric variable does not parse.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, defaulting anything it does not return.
    ///
    /// # Errors
    /// Returns `Config` if a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup(PORT_ENV) {
            config.port = parse_var(PORT_ENV, &port)?;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(STATIC_DIR_ENV) {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.remote.model = model;
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            config.remote.token = token;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.remote.base_url = base_url;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            config.remote.request_timeout = Duration::from_secs(parse_var(TIMEOUT_ENV, &secs)?);
        }

        Ok(config)
    }

    /// Set the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the storage file.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the inference base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.remote.base_url = base_url.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.remote.token = token.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote.request_timeout = timeout;
        self
    }

    /// Whether storage should stay in memory.
    #[must_use]
    pub fn uses_in_memory_storage(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY_DB
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> ChatResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::Config(format!("{key} has an invalid value: {raw:?}")))
}

/// Inference endpoint configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; the model id is appended to it.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token; empty means unauthenticated.
    pub token: String,
    /// Upper bound for one completion call.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Generation parameters sent with every request.
    pub generation: GenerationConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models/".to_string(),
            model: "google/gemma-2b".to_string(),
            token: String::new(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            generation: GenerationConfig::default(),
        }
    }
}

/// Generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Token budget for one reply.
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whether the endpoint echoes the prompt.
    pub return_full_text: bool,
    /// Block until the model is loaded.
    pub wait_for_model: bool,
    /// Allow cached completions.
    pub use_cache: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.7,
            return_full_text: false,
            wait_for_model: true,
            use_cache: true,
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
