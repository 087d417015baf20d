//! Layered settings for the piphos binary
//!
//! Precedence, lowest first: `config.json`, environment, command-line flags.
//! The system hostname is used only when nothing else names this machine.

use piphos_core::{Error, PiphosConfig, Result};
use std::path::{Path, PathBuf};

/// Directory under the user config dir holding piphos files
pub const APP_DIR: &str = "piphos";

/// Settings file name
pub const CONFIG_FILE: &str = "config.json";

/// Record id state file name
pub const STATE_FILE: &str = "state.json";

/// Everything `main` needs to build a [`piphos_core::Piphos`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub config: PiphosConfig,
    pub state_path: Option<PathBuf>,
    pub tender_base_url: Option<String>,
    pub dry_run: bool,
    pub log_level: Option<String>,
}

/// `<config dir>/piphos/<file>`, if the platform has a config dir
pub fn default_path(file: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(file))
}

/// Load `config.json`; a missing file yields defaults
pub fn load_file(path: &Path) -> Result<PiphosConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}", path.display());
        return Ok(PiphosConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
}

impl Settings {
    /// Start from a loaded config file
    pub fn from_config(config: PiphosConfig) -> Self {
        Self {
            state_path: default_path(STATE_FILE),
            config,
            ..Default::default()
        }
    }

    /// Apply environment overrides; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PIPHOS_HOSTNAME") {
            self.config.hostname = v;
        }
        if let Some(v) = get("PIPHOS_BEACON") {
            self.config.beacon = v;
        }
        if let Some(v) = get("PIPHOS_TENDER") {
            self.config.tender = v;
        }
        if let Some(v) = get("PIPHOS_GITHUB_TOKEN").or_else(|| get("GITHUB_TOKEN")) {
            self.config.token = v;
        }
        if let Some(v) = get("PIPHOS_RECORD_ID") {
            self.config.record_id = v;
        }
        if let Some(v) = get("PIPHOS_STATE_PATH") {
            self.state_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PIPHOS_TENDER_URL") {
            self.tender_base_url = Some(v);
        }
        if let Some(v) = get("PIPHOS_LOG_LEVEL") {
            self.log_level = Some(v);
        }
        if get("PIPHOS_MODE").is_some_and(|m| m.eq_ignore_ascii_case("dry-run")) {
            self.dry_run = true;
        }
    }

    /// Fill the hostname from the system when still unset
    pub fn fill_hostname<F>(&mut self, system: F)
    where
        F: FnOnce() -> Option<String>,
    {
        if self.config.hostname.trim().is_empty()
            && let Some(name) = system()
        {
            tracing::debug!("Using system hostname {:?}", name);
            self.config.hostname = name;
        }
    }
}

/// The machine's hostname, if readable as UTF-8
pub fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
}
