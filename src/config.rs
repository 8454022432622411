//! Runtime configuration: the system-prompt file, the API credential and the
//! chat model settings.
//!
//! The prompt file is a YAML mapping read fresh on every compose call:
//!
//! ```yaml
//! writer_system_message: "You write LinkedIn posts..."
//! reviewer_system_message: "You pick the strongest post..."
//! ```
//!
//! Its path comes from `YML_CONFIG` (default `./config/system_prompts.yml`).
//! The credential comes from `OPENAI_KEY` and is held as a [`SecretString`].
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the prompt file location.
pub const PROMPTS_PATH_ENV: &str = "YML_CONFIG";

/// Prompt file location used when `YML_CONFIG` is unset.
pub const DEFAULT_PROMPTS_PATH: &str = "./config/system_prompts.yml";

/// Environment variable holding the chat service API key.
pub const API_KEY_ENV: &str = "OPENAI_KEY";

/// Chat service used when no `--api-base` is given.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Model identifier used when no `--model` is given.
pub const DEFAULT_MODEL: &str = "gpt-4o";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API key: set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error parsing YAML file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("The key `{key}` is missing in the configuration file {}", path.display())]
    MissingKey { key: &'static str, path: PathBuf },

    /// SEC-014: Prompt file exceeds maximum allowed size.
    #[error("Configuration file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Prompt loading
// ============================================================================

/// Which system instruction to read from the prompt file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    Writer,
    Reviewer,
}

impl PromptRole {
    pub fn key(self) -> &'static str {
        match self {
            PromptRole::Writer => "writer_system_message",
            PromptRole::Reviewer => "reviewer_system_message",
        }
    }
}

/// SEC-014: Maximum prompt file size (1 MB).
const MAX_FILE_SIZE: u64 = 1_048_576;

/// Resolves the prompt file path from `YML_CONFIG`, falling back to
/// [`DEFAULT_PROMPTS_PATH`].
pub fn prompts_path_from_env() -> PathBuf {
    std::env::var_os(PROMPTS_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_PATH))
}

/// Reads `OPENAI_KEY`. Blank values count as absent.
pub fn api_key_from_env() -> Option<SecretString> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Loads one system instruction from the YAML prompt file.
///
/// - Missing file → `ConfigError::NotFound`
/// - Invalid YAML (or a non-mapping document) → `ConfigError::Malformed`
/// - Key absent or blank → `ConfigError::MissingKey`
pub fn load_system_message(path: &Path, role: PromptRole) -> Result<String, ConfigError> {
    // SEC-014: Check file size before reading to prevent memory exhaustion
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > MAX_FILE_SIZE => {
            return Err(ConfigError::TooLarge(format!(
                "{} is {} bytes (max {} bytes)",
                path.display(),
                meta.len(),
                MAX_FILE_SIZE
            )));
        }
        Ok(meta) if !meta.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(path = %path.display(), "Configuration file not found");
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(ConfigError::Io(e)),
        Ok(_) => {}
    }

    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
        .build()
        .map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error parsing YAML file");
            ConfigError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

    let missing_key = || {
        tracing::error!(key = role.key(), path = %path.display(), "Missing system message in configuration file");
        ConfigError::MissingKey {
            key: role.key(),
            path: path.to_path_buf(),
        }
    };

    match settings.get_string(role.key()) {
        Ok(message) if !message.trim().is_empty() => {
            tracing::info!(key = role.key(), "System message loaded successfully");
            Ok(message)
        }
        Ok(_) | Err(::config::ConfigError::NotFound(_)) => Err(missing_key()),
        Err(e) => Err(ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

// ============================================================================
// Model settings
// ============================================================================

/// Everything a compose call needs besides the HTTP client.
///
/// SEC-015: Custom Debug impl masks `api_key` to prevent secret leakage
/// in logs, error messages, and debug output.
#[derive(Clone)]
pub struct ModelSettings {
    /// Base URL of the OpenAI-compatible chat service.
    pub api_base: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// YAML file holding the writer and reviewer system messages.
    pub prompts_path: PathBuf,
    /// API key; `None` makes every compose call fail before any request.
    pub api_key: Option<SecretString>,
}

impl ModelSettings {
    /// Settings from `OPENAI_KEY` and `YML_CONFIG` with the default service and model.
    pub fn from_env() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompts_path: prompts_path_from_env(),
            api_key: api_key_from_env(),
        }
    }
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("prompts_path", &self.prompts_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
