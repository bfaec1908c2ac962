use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::SessionFilter;

const QUALIFIER: &str = "com";
const ORG: &str = "manimatic";
const APP: &str = "client";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub generation_timeout_ms: u64,
    pub notice_ttl_ms: u64,
    pub session_filter: SessionFilter,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: manimatic_config::DEFAULT_API_BASE_URL.to_string(),
            generation_timeout_ms: manimatic_config::DEFAULT_GENERATION_TIMEOUT_MS,
            notice_ttl_ms: manimatic_config::DEFAULT_NOTICE_TTL_MS,
            session_filter: SessionFilter::default(),
        }
    }
}

impl ClientSettings {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(manimatic_config::clamp_timeout_ms(
            self.generation_timeout_ms,
        ))
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    /// Apply `MANIMATIC_API_BASE_URL` when it is set and non-blank.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(manimatic_config::API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }
}

/// `settings.json` in the platform config directory.
pub struct SettingsStore {
    dir: Option<PathBuf>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self { dir: None }
    }

    /// Store rooted at an explicit directory instead of the platform default.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    fn config_dir(&self) -> Result<PathBuf> {
        let dir = match &self.dir {
            Some(d) => d.clone(),
            None => ProjectDirs::from(QUALIFIER, ORG, APP)
                .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
                .config_dir()
                .to_path_buf(),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(dir)
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("settings.json"))
    }

    /// Missing file yields defaults. Env overrides are not applied here.
    pub fn load(&self) -> Result<ClientSettings> {
        let path = self.settings_path()?;
        if !path.exists() {
            return Ok(ClientSettings::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read settings")?;
        let settings: ClientSettings =
            serde_json::from_str(&content).context("Failed to parse settings")?;
        Ok(settings)
    }

    pub fn save(&self, settings: &ClientSettings) -> Result<()> {
        let path = self.settings_path()?;
        let json = serde_json::to_string_pretty(settings)?;
        atomic_write(&path, json.as_bytes()).context("Failed to write settings")?;
        Ok(())
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    };

    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file {}", tmp_path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write temp file {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {}", tmp_path.display()))?;
    drop(file);

    match fs::rename(&tmp_path, path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(path).ok();
            fs::rename(&tmp_path, path)
                .with_context(|| format!("Failed to replace {}", path.display()))?;
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "Failed to rename {} to {}",
                    tmp_path.display(),
                    path.display()
                )
            });
        }
    }

    Ok(())
}
