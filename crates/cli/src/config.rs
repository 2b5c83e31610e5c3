// Configuration file for ghtasks.
//
// Global config: `~/.ghtasks/config.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ghtasks_common::settings::{validate_sections, SettingsError, SyncSettings};
use ghtasks_common::types::{default_sections, Category, SectionSpec};

use crate::credentials::{ensure_owner_only_dir, ensure_owner_only_file};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_NOTE: &str = "GitHub Tasks";

/// Root directory for ghtasks state: `~/.ghtasks/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".ghtasks"))
}

/// Path to the config file: `~/.ghtasks/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// `--config` when given, the global path otherwise.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => global_config_path().ok_or(ConfigError::NoHomeDir),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Markdown note that receives the tasks. `.md` is appended when missing.
    pub note: String,
    pub api_url: String,
    /// Plaintext token. Prefer `ghtasks auth login`, which uses the OS keychain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Minutes between refreshes in `watch` when `--every` is absent (0 = no default).
    pub refresh_interval_min: u32,
    pub sync: SyncSettings,
    /// Managed sections in assembly order.
    pub sections: Vec<SectionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            note: DEFAULT_NOTE.into(),
            api_url: DEFAULT_API_URL.into(),
            token: None,
            refresh_interval_min: 0,
            sync: SyncSettings::default(),
            sections: default_sections().into_iter().map(SectionConfig::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    pub category: Category,
    /// Overrides the category's default heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl From<SectionSpec> for SectionConfig {
    fn from(spec: SectionSpec) -> Self {
        let header = (spec.header != spec.category.default_header()).then_some(spec.header);
        Self { category: spec.category, header }
    }
}

impl SectionConfig {
    pub fn to_spec(&self) -> SectionSpec {
        let spec = SectionSpec::new(self.category);
        match &self.header {
            Some(header) => spec.with_header(header.clone()),
            None => spec,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Save to `path` (creates parent directories, owner-only permissions).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
            ensure_owner_only_dir(parent)
                .map_err(|error| io_err(std::io::Error::other(error.to_string())))?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(io_err)?;
        ensure_owner_only_file(path).map_err(|error| io_err(std::io::Error::other(error.to_string())))
    }

    pub fn section_specs(&self) -> Vec<SectionSpec> {
        self.sections.iter().map(SectionConfig::to_spec).collect()
    }

    /// Reject settings the sync engine would refuse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        validate_sections(&self.section_specs())?;
        Ok(())
    }

    /// Absolute path of the tasks note. `~/` expands to the home directory,
    /// relative paths resolve against `base`.
    pub fn note_path(&self, base: &Path) -> PathBuf {
        let raw = self.note.trim();
        let mut path = match raw.strip_prefix("~/").zip(dirs::home_dir()) {
            Some((rest, home)) => home.join(rest),
            None => PathBuf::from(raw),
        };
        if path.extension().is_none() {
            let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            name.push(".md");
            path.set_file_name(name);
        }
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("config I/O error at `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error in `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config serialize error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] SettingsError),
}
