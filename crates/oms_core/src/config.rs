//! Service settings.
//!
//! # Responsibility
//! - Deserialize per-profile TOML settings files.
//! - Apply defaults and validate bounds before anything else starts.
//!
//! # Invariants
//! - A returned `OmsSettings` has passed `validate()`.
//! - Without an explicit `jwt_secret`, each process signs with a fresh
//!   random secret, so tokens do not survive restarts.

use crate::auth::DEFAULT_COST;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Environment variable selecting the settings profile.
pub const PROFILE_ENV: &str = "OMS_PROFILE";
pub const DEFAULT_PROFILE: &str = "local";

const MIN_PASSWORD_HASH_COST: u32 = 4;
const MAX_PASSWORD_HASH_COST: u32 = 31;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid settings file: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime settings of the OMS service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OmsSettings {
    pub profile: String,
    pub service_name: String,
    pub service_acronym: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off if unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// SQLite file; a private in-memory database when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub recreate_db_tables: bool,
    #[serde(default = "random_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    #[serde(default = "default_jwt_expiration_mins")]
    pub jwt_expiration_mins: i64,
    /// bcrypt work factor, `4..=31`.
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl OmsSettings {
    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads `<dir>/<profile>.toml`.
    pub fn load_profile(dir: impl AsRef<Path>, profile: &str) -> ConfigResult<Self> {
        let path = dir.as_ref().join(format!("{profile}.toml"));
        Self::load_file(path)
    }

    /// Reads the profile named by `OMS_PROFILE` (default `local`) from `dir`.
    pub fn load_from_env(dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
        Self::load_profile(dir, &profile)
    }

    pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.profile.trim().is_empty() {
            return Err(ConfigError::Invalid("profile cannot be empty".to_string()));
        }
        if self.service_acronym.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service_acronym cannot be empty".to_string(),
            ));
        }
        if self.jwt_expiration_mins < 1 {
            return Err(ConfigError::Invalid(format!(
                "jwt_expiration_mins must be >= 1, got {}",
                self.jwt_expiration_mins
            )));
        }
        if !(MIN_PASSWORD_HASH_COST..=MAX_PASSWORD_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ConfigError::Invalid(format!(
                "password_hash_cost must be between {MIN_PASSWORD_HASH_COST} and {MAX_PASSWORD_HASH_COST}, got {}",
                self.password_hash_cost
            )));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("jwt_secret cannot be empty".to_string()));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_jwt_expiration_mins() -> i64 {
    120
}

fn default_password_hash_cost() -> u32 {
    DEFAULT_COST
}

fn random_jwt_secret() -> String {
    format!(
        "ORG_MGT_{}_SECRET_{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}
