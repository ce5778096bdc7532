use crate::error::WeaverError;
use clap::Parser;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Parser)]
pub struct StartArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config_path: String,

    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    #[arg(short, long, default_value = "3001")]
    pub port: u16,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The portal title for the front end
    pub title: Option<String>,

    /// Domain set on session cookies
    pub cookie_domain: Option<String>,

    /// Enables the admin back-office when present
    pub admin: Option<AdminConfig>,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, WeaverError> {
        let config = fs::read_to_string(path)?;
        Self::parse(&config)
    }

    pub fn parse(config: &str) -> Result<Self, WeaverError> {
        let config: Self = serde_json::from_str(config)?;
        config.session.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Argon2 PHC string of the admin password
    #[serde(alias = "password_hash")]
    pub pw_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_learner_hours")]
    pub learner_hours: i64,

    #[serde(default = "default_admin_hours")]
    pub admin_hours: i64,
}

/// Longest session a config may ask for, one year.
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

impl SessionConfig {
    pub fn validate(&self) -> Result<(), WeaverError> {
        for (name, hours) in [
            ("learner_hours", self.learner_hours),
            ("admin_hours", self.admin_hours),
        ] {
            if !(1..=MAX_SESSION_HOURS).contains(&hours) {
                return Err(WeaverError::Validation(format!(
                    "session.{name} must be between 1 and {MAX_SESSION_HOURS}, got {hours}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            learner_hours: default_learner_hours(),
            admin_hours: default_admin_hours(),
        }
    }
}

fn default_learner_hours() -> i64 {
    24
}

fn default_admin_hours() -> i64 {
    1
}
