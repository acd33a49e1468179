//! Configuration types and YAML loading.
//!
//! Everything has a default, so a missing or minimal config file still
//! yields a working setup pointed at a local API. The Gemini API key is
//! resolved at client construction time from the config or an environment
//! variable and is never baked into the source tree.

use crate::errors::ClientError;
use crate::session::FileSessionStore;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_CONFIG_FILE: &str = "tarea.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TareaConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub auth: GeminiAuth,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            auth: GeminiAuth::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeminiAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

impl GeminiConfig {
    /// Resolution order: inline key, then the named environment variable,
    /// then `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String, ClientError> {
        match &self.auth.api_key {
            Some(key) => Ok(key.clone()),
            None => match &self.auth.api_key_env {
                Some(env_var) => env::var(env_var).map_err(|_| {
                    ClientError::ConfigError(format!(
                        "Environment variable {} not found for Gemini API key",
                        env_var
                    ))
                }),
                None => env::var("GEMINI_API_KEY").map_err(|_| {
                    ClientError::ConfigError(
                        "No API key found for Gemini. Set GEMINI_API_KEY or provide gemini.auth.api_key in the config".to_string(),
                    )
                }),
            },
        }
    }
}

impl TareaConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(ClientError::ConfigError(
                "gemini.model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Where the access token lives on disk: configured path, or the
    /// per-user default.
    pub fn token_path(&self) -> Result<PathBuf, ClientError> {
        match &self.session.token_path {
            Some(path) => Ok(path.clone()),
            None => FileSessionStore::default_path(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the config file, falling back to full defaults when it does
    /// not exist.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<TareaConfig, ClientError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(TareaConfig::default());
        }
        Self::from_file(path).await
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<TareaConfig, ClientError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            ClientError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<TareaConfig, ClientError> {
        let config: TareaConfig = serde_yaml::from_str(content)
            .map_err(|e| ClientError::ConfigError(format!("Failed to parse YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = TareaConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert!(config.session.token_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let config = ConfigLoader::from_str("api:\n  base_url: https://tasks.example.com\n").unwrap();
        assert_eq!(config.api.base_url, "https://tasks.example.com");
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let err = ConfigLoader::from_str("api:\n  base_url: \"\"\n").unwrap_err();
        assert!(matches!(err, ClientError::ConfigError(_)));
    }

    #[test]
    fn test_inline_api_key_wins_over_env() {
        env::set_var("TAREA_TEST_KEY_INLINE", "from-env");
        let config = ConfigLoader::from_str(
            "gemini:\n  auth:\n    api_key: inline-key\n    api_key_env: TAREA_TEST_KEY_INLINE\n",
        )
        .unwrap();
        assert_eq!(config.gemini.resolve_api_key().unwrap(), "inline-key");
        env::remove_var("TAREA_TEST_KEY_INLINE");
    }

    #[test]
    fn test_api_key_env_indirection() {
        env::set_var("TAREA_TEST_KEY_INDIRECT", "from-env");
        let config =
            ConfigLoader::from_str("gemini:\n  auth:\n    api_key_env: TAREA_TEST_KEY_INDIRECT\n")
                .unwrap();
        assert_eq!(config.gemini.resolve_api_key().unwrap(), "from-env");
        env::remove_var("TAREA_TEST_KEY_INDIRECT");
    }

    #[test]
    fn test_missing_api_key_env_is_a_config_error() {
        let config =
            ConfigLoader::from_str("gemini:\n  auth:\n    api_key_env: TAREA_TEST_KEY_ABSENT\n")
                .unwrap();
        assert!(matches!(
            config.gemini.resolve_api_key(),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_load_or_default_with_missing_file() {
        let config = ConfigLoader::load_or_default("/definitely/not/here.yaml")
            .await
            .unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tarea.yaml");
        std::fs::write(
            &path,
            "api:\n  base_url: https://tasks.example.com\nsession:\n  token_path: /tmp/tok\n",
        )
        .unwrap();

        let config = ConfigLoader::from_file(&path).await.unwrap();
        assert_eq!(config.api.base_url, "https://tasks.example.com");
        assert_eq!(config.token_path().unwrap(), PathBuf::from("/tmp/tok"));
    }
}
