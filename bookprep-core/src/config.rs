//! Configuration management for bookprep

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::selector::SelectorList;

pub const DEFAULT_WRAP_WIDTH: usize = 60;
pub const DEFAULT_BREAK_MARKER: &str = "<br/>➥ ";
pub const DEFAULT_TOC_SELECTORS: &str = ".preface h1,.chapter h1,.chapter h2,.appendix h1";
pub const DEFAULT_INSERT_ID: &str = "insert-toc";
pub const DEFAULT_CODE_SELECTOR: &str = "code pre";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub toc: TocConfig,
    pub wrap: WrapConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    pub enabled: bool,
    /// Comma-separated selectors for TOC-eligible headings
    pub selectors: String,
    /// Entries seen while exactly one top-level heading has been counted
    /// are styled as preface entries
    pub has_preface: bool,
    /// Id of the element the entries are appended to
    pub insert_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapConfig {
    pub enabled: bool,
    /// Maximum characters per code line before a break marker is inserted
    pub width: usize,
    /// Markup inserted at each wrap point
    pub break_marker: String,
    pub code_selector: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selectors: DEFAULT_TOC_SELECTORS.to_string(),
            has_preface: true,
            insert_id: DEFAULT_INSERT_ID.to_string(),
        }
    }
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: DEFAULT_WRAP_WIDTH,
            break_marker: DEFAULT_BREAK_MARKER.to_string(),
            code_selector: DEFAULT_CODE_SELECTOR.to_string(),
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bookprep")
            .map(|proj_dirs| proj_dirs.config_dir().join("bookprep.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            let perms = metadata.permissions();
            if perms.mode() & 0o002 != 0 {
                bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check values that serde cannot: selector syntax and a usable width
    pub fn validate(&self) -> Result<()> {
        if self.wrap.width == 0 {
            bail!("wrap.width must be greater than zero");
        }
        if self.toc.insert_id.is_empty() {
            bail!("toc.insert_id must not be empty");
        }
        SelectorList::parse(&self.toc.selectors).context("Invalid toc.selectors")?;
        SelectorList::parse(&self.wrap.code_selector).context("Invalid wrap.code_selector")?;
        Ok(())
    }
}
