//! Configuration management for the helpdesk gateway
//!
//! Every tunable resolves with precedence env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::knowledge::DEFAULT_RETRIEVAL_LIMIT;
use crate::{Error, Result};

use file::HelpdeskConfigFile;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default hosted API base
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Default bound on a local generation call
pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a hosted generation call
pub const DEFAULT_HOSTED_TIMEOUT: Duration = Duration::from_secs(8);

/// Helpdesk gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database)
    pub data_dir: PathBuf,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Response pipeline configuration
    pub pipeline: PipelineConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// API key for admin endpoints (from `HELPDESK_API_KEY` env)
    pub api_key: Option<SecretString>,

    /// Path to static files directory (chat web UI)
    pub static_dir: Option<PathBuf>,

    /// Chat requests allowed per minute; `None` disables rate limiting
    pub rate_limit_per_minute: Option<u32>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            api_key: None,
            static_dir: None,
            rate_limit_per_minute: None,
        }
    }
}

/// Response pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of ranked entries used as grounding context
    pub retrieval_limit: usize,

    /// Local model backend
    pub local: LocalModelConfig,

    /// Hosted model backend, present only when an API key is configured
    pub hosted: Option<HostedModelConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
            local: LocalModelConfig::default(),
            hosted: None,
        }
    }
}

/// Local (Ollama) model configuration
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    /// Whether the local model is part of the fallback chain
    pub enabled: bool,

    /// Ollama base URL
    pub host: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature (default 0.7)
    pub temperature: f32,

    /// Nucleus sampling (default 0.9)
    pub top_p: f32,

    /// Bound on a single generation call (default 5s)
    pub timeout: Duration,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            timeout: DEFAULT_LOCAL_TIMEOUT,
        }
    }
}

/// Hosted (OpenAI-compatible) model configuration
#[derive(Debug, Clone)]
pub struct HostedModelConfig {
    /// API base URL
    pub api_base: String,

    /// Bearer token
    pub api_key: SecretString,

    /// Model identifier
    pub model: String,

    /// Sampling temperature, kept low (default 0.5)
    pub temperature: f32,

    /// Completion length cap (default 300)
    pub max_tokens: u32,

    /// Bound on a single generation call (default 8s)
    pub timeout: Duration,
}

impl HostedModelConfig {
    /// Defaults for everything but the key
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            api_key: SecretString::from(api_key.into()),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            max_tokens: 300,
            timeout: DEFAULT_HOSTED_TIMEOUT,
        }
    }
}

/// Return the default data directory (`~/.local/share/helpdesk` on Linux)
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".helpdesk"), |d| d.data_dir().join("helpdesk"))
}

/// Parse an optional env value, naming the variable on failure
fn parse_env<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid value for {name}: {v}")))
        })
        .transpose()
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable holds an invalid value
    pub fn load() -> Result<Self> {
        let config = Self::from_sources(file::load_config_file(), |name| std::env::var(name).ok())?;

        if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
            tracing::warn!(
                path = %config.data_dir.display(),
                error = %e,
                "failed to create data directory"
            );
        }

        Ok(config)
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable holds an invalid value
    pub fn from_sources<F>(fc: HelpdeskConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LocalModelConfig::default();

        // Local model (env > toml > default)
        let local = LocalModelConfig {
            enabled: env("HELPDESK_LOCAL_ENABLED")
                .map(|v| parse_flag(&v))
                .or(fc.local.enabled)
                .unwrap_or(defaults.enabled),
            host: env("OLLAMA_HOST")
                .or(fc.local.host)
                .unwrap_or(defaults.host),
            model: env("OLLAMA_MODEL")
                .or(fc.local.model)
                .unwrap_or(defaults.model),
            temperature: fc.local.temperature.unwrap_or(defaults.temperature),
            top_p: fc.local.top_p.unwrap_or(defaults.top_p),
            timeout: parse_env::<u64>(
                "HELPDESK_LOCAL_TIMEOUT_SECS",
                env("HELPDESK_LOCAL_TIMEOUT_SECS"),
            )?
            .or(fc.local.timeout_secs)
            .map_or(defaults.timeout, Duration::from_secs),
        };

        // Hosted model only exists when a key is available
        let hosted_toml = fc.hosted;
        let hosted = match env("OPENAI_API_KEY").or(hosted_toml.api_key) {
            Some(key) if !key.trim().is_empty() => {
                let base = HostedModelConfig::with_api_key(key);
                Some(HostedModelConfig {
                    api_base: env("OPENAI_API_BASE")
                        .or(hosted_toml.api_base)
                        .unwrap_or(base.api_base),
                    model: env("OPENAI_MODEL")
                        .or(hosted_toml.model)
                        .unwrap_or(base.model),
                    temperature: hosted_toml.temperature.unwrap_or(base.temperature),
                    max_tokens: hosted_toml.max_tokens.unwrap_or(base.max_tokens),
                    timeout: parse_env::<u64>(
                        "HELPDESK_HOSTED_TIMEOUT_SECS",
                        env("HELPDESK_HOSTED_TIMEOUT_SECS"),
                    )?
                    .or(hosted_toml.timeout_secs)
                    .map_or(base.timeout, Duration::from_secs),
                    api_key: base.api_key,
                })
            }
            _ => None,
        };

        let retrieval_limit =
            parse_env::<usize>("HELPDESK_RETRIEVAL_LIMIT", env("HELPDESK_RETRIEVAL_LIMIT"))?
                .or(fc.retrieval.limit)
                .unwrap_or(DEFAULT_RETRIEVAL_LIMIT);
        if retrieval_limit == 0 {
            return Err(Error::Config("retrieval limit must be at least 1".to_string()));
        }

        // API server config (env > toml > default)
        let server_defaults = ApiServerConfig::default();
        let api_server = ApiServerConfig {
            port: parse_env::<u16>("HELPDESK_PORT", env("HELPDESK_PORT").or_else(|| env("PORT")))?
                .or(fc.server.port)
                .unwrap_or(server_defaults.port),
            api_key: env("HELPDESK_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from),
            static_dir: env("HELPDESK_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_per_minute: parse_env::<u32>(
                "HELPDESK_RATE_LIMIT",
                env("HELPDESK_RATE_LIMIT"),
            )?
            .or(fc.server.rate_limit_per_minute),
        };

        let data_dir = env("HELPDESK_DATA_DIR")
            .or(fc.server.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Ok(Self {
            data_dir,
            api_server,
            pipeline: PipelineConfig {
                retrieval_limit,
                local,
                hosted,
            },
        })
    }

    /// Path of the `SQLite` database inside the data directory
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("helpdesk.db")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(HelpdeskConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.pipeline.retrieval_limit, 5);
        assert!(config.pipeline.local.enabled);
        assert_eq!(config.pipeline.local.host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.pipeline.local.model, "llama3.2");
        assert_eq!(config.pipeline.local.timeout, DEFAULT_LOCAL_TIMEOUT);
        assert!(config.pipeline.hosted.is_none());
        assert_eq!(config.api_server.port, 3000);
        assert!(config.db_path().ends_with("helpdesk.db"));
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = file::parse_config_file(
            r#"
            [local]
            model = "mistral"
            host = "http://file-host:11434"
            "#,
        )
        .unwrap();

        let config =
            Config::from_sources(fc, env_from(&[("OLLAMA_MODEL", "phi3")])).unwrap();

        assert_eq!(config.pipeline.local.model, "phi3");
        assert_eq!(config.pipeline.local.host, "http://file-host:11434");
    }

    #[test]
    fn test_hosted_requires_api_key() {
        let fc = file::parse_config_file("[hosted]\nmodel = \"gpt-4o-mini\"").unwrap();
        let config = Config::from_sources(fc, env_from(&[])).unwrap();
        assert!(config.pipeline.hosted.is_none());

        let fc = file::parse_config_file("[hosted]\nmodel = \"gpt-4o-mini\"").unwrap();
        let config = Config::from_sources(
            fc,
            env_from(&[("OPENAI_API_KEY", "sk-live"), ("HELPDESK_HOSTED_TIMEOUT_SECS", "12")]),
        )
        .unwrap();
        let hosted = config.pipeline.hosted.unwrap();
        assert_eq!(hosted.model, "gpt-4o-mini");
        assert_eq!(hosted.api_key.expose_secret(), "sk-live");
        assert_eq!(hosted.timeout, Duration::from_secs(12));
        assert_eq!(hosted.max_tokens, 300);
    }

    #[test]
    fn test_blank_api_key_disables_hosted() {
        let config = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("OPENAI_API_KEY", "  ")]),
        )
        .unwrap();
        assert!(config.pipeline.hosted.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("HELPDESK_LOCAL_TIMEOUT_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("HELPDESK_LOCAL_TIMEOUT_SECS"));

        let err = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("HELPDESK_RETRIEVAL_LIMIT", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_local_can_be_disabled() {
        let config = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("HELPDESK_LOCAL_ENABLED", "false")]),
        )
        .unwrap();
        assert!(!config.pipeline.local.enabled);
    }

    #[test]
    fn test_api_keys_are_redacted_in_debug() {
        let config = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("OPENAI_API_KEY", "sk-secret"), ("HELPDESK_API_KEY", "admin-secret")]),
        )
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("admin-secret"));
        assert_eq!(
            config.api_server.api_key.as_ref().unwrap().expose_secret(),
            "admin-secret"
        );
    }

    #[test]
    fn test_blank_admin_key_leaves_admin_open() {
        let config = Config::from_sources(
            HelpdeskConfigFile::default(),
            env_from(&[("HELPDESK_API_KEY", "")]),
        )
        .unwrap();
        assert!(config.api_server.api_key.is_none());
    }
}
