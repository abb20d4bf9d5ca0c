use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{olog_debug, Error, Result};

/// Bot configuration, loaded once at startup and passed by reference into
/// the transport layer and command sessions. No ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram bot token. Overridable with OPSBOT_TOKEN.
    #[serde(default)]
    pub bot_token: String,
    /// Telegram user id of the single authorized operator.
    /// Overridable with OPSBOT_OPERATOR_ID.
    #[serde(default)]
    pub operator_id: u64,
    /// Directory incoming documents are saved to. Defaults to ~/.opsbot/uploads.
    pub upload_dir: Option<String>,
    /// Shell used for /run. Defaults to `sh`.
    pub shell: Option<String>,
}

impl Config {
    pub fn opsbot_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".opsbot"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::opsbot_dir()?.join("opsbot.toml"))
    }

    pub fn upload_dir(&self) -> Result<PathBuf> {
        match &self.upload_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Ok(Self::opsbot_dir()?.join("uploads")),
        }
    }

    pub fn effective_shell(&self) -> &str {
        self.shell.as_deref().unwrap_or("sh")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        olog_debug!("Config::load path={}", path.display());
        let mut config: Self = if path.exists() {
            toml::from_str(&fs::read_to_string(path)?)?
        } else {
            olog_debug!("Config file not found, using defaults");
            Self::default()
        };

        if let Ok(token) = std::env::var("OPSBOT_TOKEN") {
            config.bot_token = token;
        }
        if let Ok(id) = std::env::var("OPSBOT_OPERATOR_ID") {
            config.operator_id = id
                .parse()
                .map_err(|_| Error::Validation(format!("OPSBOT_OPERATOR_ID not a user id: {id}")))?;
        }
        olog_debug!(
            "Config loaded: operator_id={}, upload_dir={:?}, shell={:?}",
            config.operator_id,
            config.upload_dir,
            config.shell
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::opsbot_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        olog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Refuse to start without a token and an operator id, matching the
    /// single-trusted-operator model.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            return Err(Error::Validation(
                "bot_token must be set (opsbot.toml or OPSBOT_TOKEN)".to_string(),
            ));
        }
        if self.operator_id == 0 {
            return Err(Error::Validation(
                "operator_id must be set (opsbot.toml or OPSBOT_OPERATOR_ID)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        let dir = Self::opsbot_dir()?;
        let upload_dir = self.upload_dir()?;
        if !dir.exists() {
            olog_debug!("Creating opsbot directory: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        if !upload_dir.exists() {
            olog_debug!("Creating upload directory: {}", upload_dir.display());
            fs::create_dir_all(&upload_dir)?;
        }
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
