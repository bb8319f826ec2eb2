// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that Twig keeps for each issue
//! repository, and locate the external editor to use for issue editing.
//!
//! # Settings File
//!
//! Settings live at `$gitdir/twig.toml`, outside of any branch, so every issue
//! branch agrees on them. The file is written once by `twig init`. A missing
//! file, or any missing entry, falls back to the defaults of
//! [`TrackerSettings`].

use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    path::Path,
    str::FromStr,
};
use tracing::debug;

/// Name of settings file inside gitdir.
pub const SETTINGS_FILE: &str = "twig.toml";

/// Environment variables checked for an editor command, in order.
pub const EDITOR_VARS: [&str; 2] = ["EDITOR", "VISUAL"];

/// Per-repository tracker settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Branch acting as the resting state when no issue is open.
    pub main_branch: String,

    /// Prefix of every issue branch.
    pub branch_prefix: String,

    /// Name of record file at the top-level of the working tree.
    pub record_filename: String,

    /// Check out main branch after each successful save.
    pub save_returns_to_main: bool,

    /// Refuse to switch issues while uncommitted changes exist.
    pub require_clean_checkout: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            main_branch: "main".into(),
            branch_prefix: "issue/".into(),
            record_filename: "issue".into(),
            save_returns_to_main: false,
            require_clean_checkout: true,
        }
    }
}

impl TrackerSettings {
    /// Load settings from file.
    ///
    /// Returns the defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file is not valid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => data.parse(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(ConfigError::Read {
                path: path.display().to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Write settings to file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Serialize`] if settings cannot be serialized.
    /// - Return [`ConfigError::Write`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = toml::ser::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        write(path, data).map_err(|error| ConfigError::Write {
            path: path.display().to_string(),
            message: error.to_string(),
        })
    }
}

impl FromStr for TrackerSettings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let settings: TrackerSettings =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Branch names must be distinguishable from each other.
        if settings.main_branch.is_empty() || settings.branch_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "main_branch and branch_prefix must not be empty".into(),
            ));
        }

        if settings.main_branch.starts_with(settings.branch_prefix.as_str()) {
            return Err(ConfigError::Invalid(
                "main_branch must not start with branch_prefix".into(),
            ));
        }

        if settings.record_filename.is_empty() {
            return Err(ConfigError::Invalid("record_filename must not be empty".into()));
        }

        Ok(settings)
    }
}

impl Display for TrackerSettings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Determine editor command from environment.
///
/// Checks [`EDITOR_VARS`] in order, and takes the first one that is set to a
/// non-blank value.
///
/// # Errors
///
/// - Return [`ConfigError::EditorMissing`] if no editor is configured.
pub fn editor_from_env() -> Result<String> {
    EDITOR_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .ok_or(ConfigError::EditorMissing)
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Configuration deserialized, but holds unusable values.
    #[error("invalid settings: {0}")]
    Invalid(String),

    /// Settings file exists, but cannot be read.
    #[error("cannot read settings at {path:?}: {message}")]
    Read { path: String, message: String },

    /// Settings file cannot be written.
    #[error("cannot write settings at {path:?}: {message}")]
    Write { path: String, message: String },

    /// No editor command is configured.
    #[error("EDITOR or VISUAL environment variable must be set")]
    EditorMissing,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
