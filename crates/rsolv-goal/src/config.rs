//! Resolution settings.
//!
//! Settings are merged from three sources, later ones winning:
//! 1. Built-in defaults
//! 2. The JSON config file (`rsolv.json`)
//! 3. `RSOLV_*` environment variables
//!
//! Keys are kebab-case in the file; the environment variable of a key is its
//! upper-cased snake-case form, so `installonly-limit` becomes `RSOLV_INSTALLONLY_LIMIT`.
//! List values are comma-separated in the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GoalError, Result};
use crate::job::JobFlags;
use crate::universe::Universe;

/// Default config file name
pub const CONFIG_FILE: &str = "rsolv.json";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "RSOLV_";

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    File(PathBuf),
    Environment(String),
}

impl ConfigSource {
    pub fn as_str(&self) -> String {
        match self {
            ConfigSource::Default => "default".to_string(),
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Environment(var) => var.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GoalConfig {
    /// Names (or provides) of packages several versions of which may be installed
    #[serde(default = "default_installonlypkgs")]
    pub installonlypkgs: Vec<String>,

    /// Number of install-only versions kept, 0 = unlimited
    #[serde(default = "default_installonly_limit")]
    pub installonly_limit: u32,

    #[serde(default)]
    pub protected_packages: Vec<String>,

    /// Only accept the best candidate of every request
    #[serde(default)]
    pub best: bool,

    /// Erasing a package also erases the dependencies only it needed
    #[serde(default)]
    pub clean_requirements_on_remove: bool,

    #[serde(default = "default_true")]
    pub allow_vendor_change: bool,

    /// Release of the running kernel, detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_release: Option<String>,

    /// Dump every solver run into this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_solver_dir: Option<PathBuf>,
}

fn default_installonlypkgs() -> Vec<String> {
    [
        "kernel",
        "kernel-PAE",
        "installonlypkg(kernel)",
        "installonlypkg(kernel-module)",
        "installonlypkg(vm)",
        "multiversion(kernel)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_installonly_limit() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            installonlypkgs: default_installonlypkgs(),
            installonly_limit: default_installonly_limit(),
            protected_packages: Vec::new(),
            best: false,
            clean_requirements_on_remove: false,
            allow_vendor_change: true,
            kernel_release: None,
            debug_solver_dir: None,
        }
    }
}

impl GoalConfig {
    /// Configure install-only policy and the running kernel of `universe`
    pub fn apply(&self, universe: &mut Universe) {
        universe.set_installonly(self.installonlypkgs.clone(), self.installonly_limit);
        let release = self
            .kernel_release
            .clone()
            .or_else(Universe::detect_kernel_release);
        universe.set_kernel_release(release);
    }

    /// Flags for erase requests
    pub fn erase_flags(&self) -> JobFlags {
        if self.clean_requirements_on_remove {
            JobFlags::CLEANDEPS
        } else {
            JobFlags::empty()
        }
    }
}

/// Loads [`GoalConfig`] from its sources
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Defaults, overridden by `dir/rsolv.json`, overridden by the environment
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Result<GoalConfig> {
        let mut config = self.load_config_file(dir.as_ref().join(CONFIG_FILE))?;
        self.apply_env(&mut config)?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<GoalConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(GoalConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| GoalError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: GoalConfig = serde_json::from_str(&contents)
            .map_err(|e| GoalError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override `config` with `RSOLV_*` variables
    pub fn apply_env(&self, config: &mut GoalConfig) -> Result<()> {
        if let Some(list) = self.get_env_list("installonlypkgs") {
            config.installonlypkgs = list;
        }
        if let Some(value) = self.get_env_config("installonly-limit") {
            config.installonly_limit = value.parse().map_err(|_| {
                GoalError::Config(format!("{}INSTALLONLY_LIMIT is not a number: {}", ENV_PREFIX, value))
            })?;
        }
        if let Some(list) = self.get_env_list("protected-packages") {
            config.protected_packages = list;
        }
        if let Some(best) = self.get_env_bool("best") {
            config.best = best;
        }
        if let Some(clean) = self.get_env_bool("clean-requirements-on-remove") {
            config.clean_requirements_on_remove = clean;
        }
        if let Some(allow) = self.get_env_bool("allow-vendor-change") {
            config.allow_vendor_change = allow;
        }
        if let Some(release) = self.get_env_config("kernel-release") {
            config.kernel_release = Some(release);
        }
        if let Some(dir) = self.get_env_config("debug-solver-dir") {
            config.debug_solver_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Where `key` would be read from
    pub fn source_of<P: AsRef<Path>>(&self, key: &str, dir: P) -> ConfigSource {
        let var = env_var_name(key);
        if self.get_rsolv_env(&var).is_some() {
            return ConfigSource::Environment(var);
        }

        let path = dir.as_ref().join(CONFIG_FILE);
        let in_file = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str::<serde_json::Value>(&contents).ok())
            .is_some_and(|value| value.get(key).is_some());
        if in_file {
            ConfigSource::File(path)
        } else {
            ConfigSource::Default
        }
    }

    fn get_rsolv_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Converts "foo-bar" to "RSOLV_FOO_BAR"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_rsolv_env(&env_var_name(key))
    }

    pub fn get_env_bool(&self, key: &str) -> Option<bool> {
        self.get_env_config(key)
            .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no"))
    }

    pub fn get_env_list(&self, key: &str) -> Option<Vec<String>> {
        self.get_env_config(key).map(|val| {
            val.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.replace('-', "_").to_uppercase())
}
