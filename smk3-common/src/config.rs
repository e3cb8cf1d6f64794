//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup; it is logged and
//! treated as empty.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP bind address for smk3-audit
pub const DEFAULT_BIND: &str = "127.0.0.1:5740";

/// Bearer tokens stay valid for 7 days unless configured otherwise
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 7;

/// OpenAI-compatible endpoint of the Gemini API
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Model used for clause analysis
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

/// Upper bound on one analysis round-trip
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

pub const ENV_ROOT_FOLDER: &str = "SMK3_ROOT_FOLDER";
pub const ENV_BIND: &str = "SMK3_BIND";
pub const ENV_TOKEN_SECRET: &str = "SMK3_TOKEN_SECRET";
pub const ENV_CORS_ORIGINS: &str = "SMK3_CORS_ORIGINS";
pub const ENV_LLM_BASE_URL: &str = "SMK3_LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "SMK3_LLM_MODEL";
pub const ENV_LLM_API_KEY: &str = "SMK3_LLM_API_KEY";

/// Contents of `config.toml`
///
/// Every field is optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding `smk3.db` and the `evidence/` blob store
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP bind address, e.g. `0.0.0.0:5740`
    #[serde(default)]
    pub bind: Option<String>,

    /// Secret used to sign bearer tokens
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Bearer token lifetime in minutes
    #[serde(default)]
    pub token_ttl_minutes: Option<i64>,

    /// Allowed CORS origins (`["*"]` allows any)
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmToml,
}

/// `[llm]` table of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmToml {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Parse a config file, failing on I/O or syntax errors
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the explicit file if given, else the first platform config file found
    ///
    /// Never fails: problems are logged and an empty config is returned.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => config_file_candidates().into_iter().find(|p| p.exists()),
        };

        let Some(path) = path else {
            info!("No config file found, using environment and compiled defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Config file locations searched when `--config` is not given
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("smk3").join("config.toml"));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc/smk3/config.toml"));
    }
    candidates
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("smk3"))
        .unwrap_or_else(|| PathBuf::from("./smk3_data"))
}

/// Resolve the root folder: CLI, then `env_var_name`, then TOML, then default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = env_value(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Non-empty value of an environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// LLM provider settings after resolution
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    /// `None` means "use the secret persisted in the settings table"
    pub token_secret: Option<String>,
    pub token_ttl: chrono::Duration,
    pub cors_origins: Vec<String>,
    pub llm: LlmConfig,
}

impl ServiceConfig {
    /// Merge command-line values, environment and TOML into one config
    pub fn resolve(
        cli_root_folder: Option<&Path>,
        cli_bind: Option<&str>,
        toml_config: &TomlConfig,
    ) -> Self {
        let root_folder = resolve_root_folder(cli_root_folder, ENV_ROOT_FOLDER, toml_config);

        let bind = cli_bind
            .map(str::to_string)
            .or_else(|| env_value(ENV_BIND))
            .or_else(|| toml_config.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let token_secret = env_value(ENV_TOKEN_SECRET).or_else(|| toml_config.token_secret.clone());

        let ttl_minutes = toml_config
            .token_ttl_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);

        let cors_origins = env_value(ENV_CORS_ORIGINS)
            .map(|v| split_origins(&v))
            .or_else(|| toml_config.cors_origins.clone())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let llm = LlmConfig {
            base_url: env_value(ENV_LLM_BASE_URL)
                .or_else(|| toml_config.llm.base_url.clone())
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env_value(ENV_LLM_MODEL)
                .or_else(|| toml_config.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: env_value(ENV_LLM_API_KEY).or_else(|| toml_config.llm.api_key.clone()),
            timeout: Duration::from_secs(
                toml_config.llm.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            ),
        };

        Self {
            root_folder,
            bind,
            token_secret,
            token_ttl: chrono::Duration::minutes(ttl_minutes),
            cors_origins,
            llm,
        }
    }
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder and the evidence blob folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(self.evidence_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("smk3.db")
    }

    pub fn evidence_path(&self) -> PathBuf {
        self.root_folder.join("evidence")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_only_overrides_named_fields() {
        let config: TomlConfig = toml::from_str(
            r#"
            bind = "0.0.0.0:8080"

            [llm]
            model = "gemini-1.5-pro"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.llm.model.as_deref(), Some("gemini-1.5-pro"));
        assert!(config.root_folder.is_none());
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_cli_root_folder_wins() {
        let toml_config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = resolve_root_folder(
            Some(Path::new("/from/cli")),
            "SMK3_TEST_UNSET_VARIABLE",
            &toml_config,
        );
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_toml_root_folder_used_without_cli_or_env() {
        let toml_config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = resolve_root_folder(None, "SMK3_TEST_UNSET_VARIABLE", &toml_config);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn test_split_origins_drops_blanks() {
        assert_eq!(
            split_origins("http://a.test, ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_initializer_layout() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/smk3"));
        assert_eq!(init.database_path(), PathBuf::from("/srv/smk3/smk3.db"));
        assert_eq!(init.evidence_path(), PathBuf::from("/srv/smk3/evidence"));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind = [unterminated").unwrap();

        assert!(matches!(TomlConfig::load(&path), Err(Error::Config(_))));
        // Graceful path falls back to an empty config
        assert!(TomlConfig::load_or_default(Some(&path)).bind.is_none());
    }
}
