//! Application configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! register_commands = true
//! text_prefix = "!"
//!
//! [messages]
//! invocation_failed = "Something broke."
//! ```
//!
//! Environment variables override file values when
//! [`Config::with_env_overrides`] is applied.

use serde::{Deserialize, Serialize};
use std::path::Path;
use switchboard_dispatch::Messages;

use crate::setup::SetupError;

pub const ENV_REGISTER_COMMANDS: &str = "SWITCHBOARD_REGISTER_COMMANDS";
pub const ENV_TEXT_PREFIX: &str = "SWITCHBOARD_TEXT_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upload the slash-command payload at startup.
    pub register_commands: bool,
    /// Prefix that marks a plain message as a text command.
    pub text_prefix: String,
    pub messages: Messages,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            register_commands: true,
            text_prefix: "!".to_string(),
            messages: Messages::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, SetupError> {
        let config: Config = toml::from_str(source)?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Applies `SWITCHBOARD_REGISTER_COMMANDS` and `SWITCHBOARD_TEXT_PREFIX`.
    pub fn with_env_overrides(mut self) -> Result<Self, SetupError> {
        if let Ok(value) = std::env::var(ENV_REGISTER_COMMANDS) {
            self.register_commands = parse_bool(&value).ok_or_else(|| {
                SetupError::Config(format!(
                    "{} must be a boolean, found '{}'",
                    ENV_REGISTER_COMMANDS, value
                ))
            })?;
        }
        if let Ok(prefix) = std::env::var(ENV_TEXT_PREFIX) {
            self.text_prefix = prefix;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, SetupError> {
        if self.text_prefix.trim().is_empty() {
            return Err(SetupError::Config("text_prefix cannot be empty".into()));
        }
        Ok(self)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
