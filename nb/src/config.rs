use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Persistent settings, overridden by command-line flags
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub date_format: Option<String>,
}

impl CliConfig {
    pub fn path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("noticeboard").join("cli.json")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn reset() -> Result<()> {
        let path = Self::path();
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config = serde_json::from_str(&data).context("parse cli config")?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize cli config")?;
        fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Sets one setting by name. An empty value clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.trim()).filter(|v| !v.is_empty());
        match key {
            "url" => self.url = value.map(ToString::to_string),
            "token_file" | "token-file" => self.token_file = value.map(PathBuf::from),
            "date_format" | "date-format" => self.date_format = value.map(ToString::to_string),
            other => anyhow::bail!("unknown setting '{other}' (expected url, token_file or date_format)"),
        }
        Ok(())
    }
}
