#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Variable read by [`Environment::from_env`].
pub const ENV_VAR: &str = "FIRMA_ENV";

/// Deployment environment, resolved once at startup and passed down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Error returned when parsing an [`Environment`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid environment: {input:?} (expected production, prod, development, dev or test)")]
pub struct EnvironmentParseError {
    pub input: String,
}

impl FromStr for Environment {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "test" => Ok(Self::Development),
            _ => Err(EnvironmentParseError { input: s.to_owned() }),
        }
    }
}

impl Environment {
    /// Read `FIRMA_ENV`; development when unset.
    pub fn from_env() -> Result<Self, EnvironmentParseError> {
        Self::from_value(std::env::var(ENV_VAR).ok().as_deref())
    }

    /// Resolve an optional raw setting the way [`from_env`](Self::from_env) does.
    pub fn from_value(value: Option<&str>) -> Result<Self, EnvironmentParseError> {
        let env = match value {
            Some(raw) => raw.parse()?,
            None => Self::default(),
        };
        log::debug!("environment resolved to {env}");
        Ok(env)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
