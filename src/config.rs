use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ComplianceError;

/// Main configuration structure for the compliance assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub groq: GroqConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    pub api_key: String,
    pub api_url: String,
    pub intent_model: String,
    pub chat_model: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Upper bound on the whole interpretation call, retries included
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: i32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5000,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// YAML or JSON supplier file; the built-in dataset is used when unset
    #[serde(default)]
    pub supplier_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub mcp_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            mcp_path: "/mcp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!(
                "No .env file found in any expected location - continuing with env vars only"
            );
        }

        let config_path = env::var("CA_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let config = serde_yaml::from_str::<Config>(contents)?;
        tracing::info!("Loaded configuration from YAML");
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("CA_SERVER_NAME") {
            self.server.name = name;
        }

        // Groq overrides
        if let Ok(api_key) = env::var("GROQ_API_KEY") {
            self.groq.api_key = api_key;
        }
        if let Ok(api_url) = env::var("GROQ_API_URL") {
            self.groq.api_url = api_url;
        }
        if let Ok(intent_model) = env::var("GROQ_INTENT_MODEL") {
            self.groq.intent_model = intent_model;
        }
        if let Ok(chat_model) = env::var("GROQ_CHAT_MODEL") {
            self.groq.chat_model = chat_model;
        }

        if let Ok(timeout) = env::var("CA_INTERPRET_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.interpreter.timeout_seconds = secs;
            }
        }

        if let Ok(jitter) = env::var("CA_RETRY_JITTER_FACTOR") {
            if let Ok(jitter_val) = jitter.parse() {
                self.retry.jitter_factor = jitter_val;
            }
        }

        if let Ok(file) = env::var("CA_SUPPLIER_FILE") {
            self.data.supplier_file = Some(file);
        }

        if let Ok(bind) = env::var("CA_HTTP_BIND") {
            self.http.bind = bind;
        }
        if let Ok(path) = env::var("CA_HTTP_PATH") {
            self.http.mcp_path = path;
        }
    }

    /// Validate configuration
    fn validate(&self) -> crate::error::Result<()> {
        if self.groq.api_key == "PLACEHOLDER_GROQ_API_KEY" || self.groq.api_key.is_empty() {
            return Err(ComplianceError::Config(
                "GROQ_API_KEY environment variable must be set".to_string(),
            ));
        }

        if self.interpreter.timeout_seconds == 0 {
            return Err(ComplianceError::Config(
                "interpreter.timeout_seconds cannot be 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ComplianceError::Config(
                "retry.max_attempts cannot be 0".to_string(),
            ));
        }
        if self.retry.jitter_factor < 0.0 || self.retry.jitter_factor > 1.0 {
            return Err(ComplianceError::Config(
                "Retry jitter factor must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Every attempt must be able to finish before the interpreter gives up
        let transport_budget =
            u64::from(self.retry.max_attempts) * self.groq.request_timeout_seconds;
        if transport_budget >= self.interpreter.timeout_seconds {
            return Err(ComplianceError::Config(format!(
                "retry.max_attempts x groq.request_timeout_seconds ({transport_budget}s) must be below interpreter.timeout_seconds ({}s)",
                self.interpreter.timeout_seconds
            )));
        }

        if !self.http.mcp_path.starts_with('/') {
            return Err(ComplianceError::Config(format!(
                "http.mcp_path '{}' must start with '/'",
                self.http.mcp_path
            )));
        }

        Ok(())
    }

    /// Interpretation deadline; a zero setting is clamped to one second.
    pub fn interpret_timeout(&self) -> Duration {
        Duration::from_secs(self.interpreter.timeout_seconds.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.groq.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "compliance-assistant".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            groq: GroqConfig {
                api_key: env::var("GROQ_API_KEY").unwrap_or_else(|_| {
                    tracing::warn!("GROQ_API_KEY not set, using placeholder");
                    "PLACEHOLDER_GROQ_API_KEY".to_string()
                }),
                api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                intent_model: "llama-3.1-8b-instant".to_string(),
                chat_model: "llama-3.3-70b-versatile".to_string(),
                request_timeout_seconds: 8,
            },
            interpreter: InterpreterConfig::default(),
            retry: RetryConfig::default(),
            data: DataConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
