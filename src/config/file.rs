//! TOML configuration file loading
//!
//! Supports `~/.config/helpdesk/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HelpdeskConfigFile {
    /// Local model (Ollama) configuration
    #[serde(default)]
    pub local: LocalFileConfig,

    /// Hosted model configuration
    #[serde(default)]
    pub hosted: HostedFileConfig,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Local model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LocalFileConfig {
    /// Set to false to skip the local model entirely
    pub enabled: Option<bool>,

    /// Ollama base URL (e.g. "http://localhost:11434")
    pub host: Option<String>,

    /// Model identifier (e.g. "llama3.2", "mistral", "phi3")
    pub model: Option<String>,

    pub temperature: Option<f32>,
    pub top_p: Option<f32>,

    /// Per-request bound in seconds
    pub timeout_secs: Option<u64>,
}

/// Hosted model configuration
#[derive(Debug, Default, Deserialize)]
pub struct HostedFileConfig {
    pub api_key: Option<String>,

    /// API base URL (e.g. "https://api.openai.com/v1")
    pub api_base: Option<String>,

    /// Model identifier (e.g. "gpt-3.5-turbo")
    pub model: Option<String>,

    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Per-request bound in seconds
    pub timeout_secs: Option<u64>,
}

/// Retrieval configuration
#[derive(Debug, Default, Deserialize)]
pub struct RetrievalFileConfig {
    /// Number of ranked entries handed to the generator
    pub limit: Option<usize>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory holding the database
    pub data_dir: Option<String>,

    /// Directory with the chat web UI
    pub static_dir: Option<String>,

    /// Chat requests allowed per minute (unset = unlimited)
    pub rate_limit_per_minute: Option<u32>,
}

/// Parse a config file body
///
/// # Errors
///
/// Returns error if the TOML is invalid
pub fn parse_config_file(content: &str) -> crate::Result<HelpdeskConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `HelpdeskConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HelpdeskConfigFile {
    let Some(path) = config_file_path() else {
        return HelpdeskConfigFile::default();
    };

    if !path.exists() {
        return HelpdeskConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HelpdeskConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HelpdeskConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/helpdesk/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("helpdesk").join("config.toml"))
}
