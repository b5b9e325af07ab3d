//! Service configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`ServiceConfig`], falling back to defaults when the file is missing or
//! malformed. Secrets never live in the file: the engine API key and the
//! auth service key come from the environment only, wrapped in
//! [`SecretString`] so they cannot leak through Debug output or logs.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use presale_types::assistant::{AssistantCatalog, AssistantRole, AssistantSpec};
use presale_types::error::ConfigError;

/// Environment variable carrying the conversation-engine API key.
pub const ENGINE_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable carrying the auth-service anon key.
pub const AUTH_SERVICE_KEY_VAR: &str = "AUTH_SERVICE_KEY";

/// Version tag applied to both assistant descriptors.
const ASSISTANT_VERSION: &str = "2.0";
const ASSISTANT_TEMPERATURE: f64 = 0.9;
const ASSISTANT_MODEL: &str = "gpt-4o";

/// Service configuration, from `{data_dir}/config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Address the WebSocket server binds to.
    pub bind_addr: String,
    /// SQLite database URL.
    pub database_url: String,
    /// Base URL of the conversation-engine API.
    pub engine_base_url: String,
    /// Base URL of the identity provider.
    pub auth_base_url: String,
    /// Directory holding the assistant instruction files.
    pub assistants_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: default_database_url(),
            engine_base_url: "https://api.openai.com".to_string(),
            auth_base_url: "http://localhost:9999".to_string(),
            assistants_dir: PathBuf::from("assistants"),
        }
    }
}

/// Load the service configuration from `{data_dir}/config.toml`.
///
/// A missing file is the normal first-run case and yields the defaults; a
/// malformed file logs a warning and also yields the defaults. Startup
/// never fails on configuration.
pub async fn load_config(data_dir: &Path) -> ServiceConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return ServiceConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return ServiceConfig::default();
        }
    };

    match toml::from_str::<ServiceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("failed to parse {}: {err}, using defaults", config_path.display());
            ServiceConfig::default()
        }
    }
}

/// Default database URL: `{PRESALE_DATA_DIR}/presale.db`, falling back to
/// `~/.presale/presale.db`.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("PRESALE_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.presale")
    });
    format!("sqlite://{data_dir}/presale.db?mode=rwc")
}

/// The conversation-engine API key, from the environment.
pub fn engine_api_key() -> Result<SecretString, ConfigError> {
    secret_from_env(ENGINE_API_KEY_VAR)
}

/// The auth-service anon key, from the environment.
pub fn auth_service_key() -> Result<SecretString, ConfigError> {
    secret_from_env(AUTH_SERVICE_KEY_VAR)
}

fn secret_from_env(var: &str) -> Result<SecretString, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(ConfigError::Invalid(format!("environment variable {var} is not set"))),
    }
}

/// Build the assistant catalog, resolving each role's instruction file
/// under the configured directory into text.
pub async fn load_catalog(assistants_dir: &Path) -> Result<AssistantCatalog, ConfigError> {
    let mut specs = Vec::with_capacity(AssistantRole::ALL.len());
    for role in AssistantRole::ALL {
        let path = assistants_dir.join(format!("{role}.txt"));
        let instructions =
            tokio::fs::read_to_string(&path).await.map_err(|err| {
                ConfigError::MissingInstructions {
                    role: role.to_string(),
                    source_error: format!("{}: {err}", path.display()),
                }
            })?;
        specs.push(AssistantSpec {
            role,
            display_name: display_name(role).to_string(),
            version: ASSISTANT_VERSION.to_string(),
            temperature: ASSISTANT_TEMPERATURE,
            model: ASSISTANT_MODEL.to_string(),
            instructions,
        });
    }
    AssistantCatalog::new(specs)
}

fn display_name(role: AssistantRole) -> &'static str {
    match role {
        AssistantRole::Manager => "Manager Assistant",
        AssistantRole::Parser => "Parser Assistant",
    }
}
