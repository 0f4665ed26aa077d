//! Configuration loader built on figment.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. Profile config file (`veranda.{profile}.toml`)
//! 3. Main config file (`veranda.toml`)
//! 4. Environment variables (`VERANDA_*`, `__` as the section separator:
//!    `VERANDA_SERVER__PORT=8080` sets `server.port`)
//! 5. Programmatic overrides
//!
//! ```rust,ignore
//! use veranda_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("config/veranda.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::debug;

use super::error::ConfigResult;
use super::schema::VerandaConfig;

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// The profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads the profile from `VERANDA_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("VERANDA_PROFILE")
            .map(|p| match p.to_lowercase().as_str() {
                "production" | "prod" => Self::Production,
                "development" | "dev" => Self::Development,
                other => Self::Custom(other.to_string()),
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    files: Vec<PathBuf>,
    profile: Profile,
    with_env: bool,
    overrides: Option<VerandaConfig>,
}

impl ConfigLoader {
    /// Creates a loader that searches the current directory.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            profile: Profile::from_env(),
            with_env: true,
            overrides: None,
        }
    }

    /// Adds a specific config file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets the profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        let name = profile.into();
        self.profile = match name.as_str() {
            "production" | "prod" => Profile::Production,
            "development" | "dev" => Profile::Development,
            _ => Profile::Custom(name),
        };
        self
    }

    /// Disables environment variable overrides.
    pub fn without_env(mut self) -> Self {
        self.with_env = false;
        self
    }

    /// Merges a programmatic override layer on top of everything else.
    pub fn merge(mut self, config: VerandaConfig) -> Self {
        self.overrides = Some(config);
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<VerandaConfig> {
        let mut figment = Figment::from(Serialized::defaults(VerandaConfig::default()));

        // Profile file first so the main file can override it.
        let profile_file = format!("veranda.{}.toml", self.profile);
        if Path::new(&profile_file).exists() {
            debug!(file = %profile_file, "loading profile configuration");
            figment = figment.merge(Toml::file(&profile_file));
        }

        if self.files.is_empty() {
            if Path::new("veranda.toml").exists() {
                figment = figment.merge(Toml::file("veranda.toml"));
            }
        } else {
            for file in &self.files {
                debug!(file = %file.display(), "loading configuration file");
                figment = figment.merge(Toml::file(file));
            }
        }

        if self.with_env {
            figment = figment.merge(Env::prefixed("VERANDA_").split("__"));
        }

        if let Some(overrides) = self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: VerandaConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
