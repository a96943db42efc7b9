//! Credential references in `config.toml`.
//!
//! `source.api_key` and `discord.token` may point outside the file:
//! `pass::discord/bot` reads the first line of a password-store entry and
//! `env::DISCORD_TOKEN` reads an environment variable. Any other value is
//! the credential itself.

use std::fmt;
use std::process::Command;

use thiserror::Error;

const PASS_PREFIX: &str = "pass::";
const ENV_PREFIX: &str = "env::";

/// Why a credential reference could not be turned into a value.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("could not start `pass`: {0}")]
    PassUnavailable(#[source] std::io::Error),

    #[error("password-store entry `{entry}` is unreadable: {detail}")]
    PassEntry { entry: String, detail: String },

    #[error("${0} is not set")]
    EnvMissing(String),

    #[error("${0} is set but empty")]
    EnvEmpty(String),
}

/// A credential as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// Password-store entry name.
    Pass(&'a str),
    /// Environment variable name.
    Env(&'a str),
    Literal(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if let Some(entry) = raw.strip_prefix(PASS_PREFIX) {
            Self::Pass(entry)
        } else if let Some(var) = raw.strip_prefix(ENV_PREFIX) {
            Self::Env(var)
        } else {
            Self::Literal(raw)
        }
    }

    /// Reads the credential the reference points at.
    pub fn resolve(self) -> Result<String, SecretError> {
        match self {
            Self::Literal(value) => Ok(value.to_owned()),
            Self::Env(var) => match std::env::var(var) {
                Ok(value) if value.is_empty() => Err(SecretError::EnvEmpty(var.to_owned())),
                Ok(value) => Ok(value),
                Err(_) => Err(SecretError::EnvMissing(var.to_owned())),
            },
            Self::Pass(entry) => read_pass_entry(entry),
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

/// Literals print masked; references print as written.
impl fmt::Display for SecretRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(entry) => write!(f, "{}{}", PASS_PREFIX, entry),
            Self::Env(var) => write!(f, "{}{}", ENV_PREFIX, var),
            Self::Literal(_) => f.write_str("********"),
        }
    }
}

/// Shorthand for `SecretRef::parse(raw).resolve()`.
pub fn resolve(raw: &str) -> Result<String, SecretError> {
    SecretRef::parse(raw).resolve()
}

/// Display form of a configured credential.
pub fn mask(raw: &str) -> String {
    SecretRef::parse(raw).to_string()
}

fn read_pass_entry(entry: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(SecretError::PassUnavailable)?;

    let entry_error = |detail: String| SecretError::PassEntry {
        entry: entry.to_owned(),
        detail,
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(entry_error(format!("{} ({})", stderr.trim(), output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.lines().next() {
        Some(first) if !first.is_empty() => Ok(first.to_owned()),
        _ => Err(entry_error("first line is empty".to_owned())),
    }
}
