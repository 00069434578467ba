//! # Shim Configuration
//!
//! The shim's own settings cannot come from the command line, which belongs to
//! the wrapped tool. They are layered instead:
//!
//! 1. built-in defaults ([`ShimConfig::default`]);
//! 2. an optional TOML file, named by `NERDCTL_SHIM_CONFIG` or found at
//!    `config.toml` in the user's configuration directory;
//! 3. `NERDCTL_SHIM_*` environment variable overrides.
//!
//! ```toml
//! tool_path = "/usr/local/bin/nerdctl"
//! mount_root = "/mnt"
//! working_dir = 'C:\Users\me\project'
//! log_level = "debug"
//! log_to_file = true
//! describe = false
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "NERDCTL_SHIM_CONFIG";
pub const ENV_TOOL: &str = "NERDCTL_SHIM_TOOL";
pub const ENV_MOUNT_ROOT: &str = "NERDCTL_SHIM_MOUNT_ROOT";
pub const ENV_WORKDIR: &str = "NERDCTL_SHIM_WORKDIR";
pub const ENV_LOG_LEVEL: &str = "NERDCTL_SHIM_LOG_LEVEL";
pub const ENV_LOG_TO_STDERR: &str = "NERDCTL_SHIM_LOG_TO_STDERR";
pub const ENV_DESCRIBE: &str = "NERDCTL_SHIM_DESCRIBE";

pub const DEFAULT_TOOL_PATH: &str = "/usr/local/bin/nerdctl";
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings of the shim itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShimConfig {
    /// The wrapped tool's executable.
    pub tool_path: PathBuf,
    /// Where host drives are mounted in the tool's environment.
    pub mount_root: String,
    /// Host directory relative paths are resolved against. Relative paths are
    /// passed through when unset.
    pub working_dir: Option<String>,
    pub log_level: String,
    /// Log to a daily rolling file instead of stderr.
    pub log_to_file: bool,
    /// Log the full command tree at startup.
    pub describe: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from(DEFAULT_TOOL_PATH),
            mount_root: DEFAULT_MOUNT_ROOT.to_string(),
            working_dir: None,
            log_level: "info".to_string(),
            log_to_file: true,
            describe: false,
        }
    }
}

impl ShimConfig {
    /// Loads the configuration from the file layer and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(ENV_CONFIG) {
            Some(path) => Self::load_from_file(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `NERDCTL_SHIM_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tool) = lookup(ENV_TOOL).filter(|v| !v.trim().is_empty()) {
            self.tool_path = PathBuf::from(tool);
        }
        if let Some(root) = lookup(ENV_MOUNT_ROOT).filter(|v| !v.trim().is_empty()) {
            self.mount_root = root;
        }
        if let Some(dir) = lookup(ENV_WORKDIR).filter(|v| !v.trim().is_empty()) {
            self.working_dir = Some(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(value) = lookup(ENV_LOG_TO_STDERR) {
            self.log_to_file = !flag_enabled(&value);
        }
        if let Some(value) = lookup(ENV_DESCRIBE) {
            self.describe = flag_enabled(&value);
        }
    }
}

/// `config.toml` in the user's configuration directory, if one can be
/// determined.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "NerdctlShim", "nerdctl_shim")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn flag_enabled(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
