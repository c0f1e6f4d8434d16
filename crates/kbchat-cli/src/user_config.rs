//! User configuration: where the service lives, how long to wait for it, and who is signed in.
//!
//! Sources, later ones winning: built-in defaults, `<config dir>/kbchat/config.toml`, then
//! `KBCHAT_*` environment variables (a `.env` file is read first by the binary).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kbchat_api::{ClientConfig, Credential, Theme};
use kbchat_core::UserRole;
use kbchat_error::{ResultExt as _, TracingPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const ENV_PREFIX: &str = "KBCHAT";

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: UserRole,
    pub theme: Theme,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: kbchat_api::REQUEST_TIMEOUT_SECS,
            token: None,
            username: None,
            role: UserRole::default(),
            theme: Theme::default(),
        }
    }
}

impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("role", &self.role)
            .field("theme", &self.theme)
            .finish()
    }
}

/// `<config dir>/kbchat/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kbchat").join("config.toml"))
}

impl UserConfig {
    /// Loads from the default file and the environment. Invalid configuration falls back to
    /// defaults with a warning.
    pub fn load() -> Self {
        let path = default_config_path();
        Self::load_from(path.as_deref())
            .map_err(|e| kbchat_error::Error::Config(e.to_string()))
            .emit_warning(&TracingPolicy)
            .unwrap_or_default()
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<UserConfig>()
    }

    /// Save the configuration to the specified path.
    /// The token is dropped unless `keep_token` is set.
    pub fn save_to_path(&self, path: &Path, keep_token: bool) -> color_eyre::Result<()> {
        let to_write = if keep_token {
            self.clone()
        } else {
            Self {
                token: None,
                ..self.clone()
            }
        };
        let toml_str = toml::to_string_pretty(&to_write)?;
        let dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        use std::io::Write as _;
        tmp.write_all(toml_str.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    /// The credential to sign in with, if a token is configured.
    pub fn credential(&self) -> Option<Credential> {
        let token = self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let username = self.username.as_deref().unwrap_or("user");
        Some(Credential::new(token, username, self.role))
    }
}
