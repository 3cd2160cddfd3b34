// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the __stage definition__ file that rootstage uses to
//! decide what gets archived, where the archive goes, and what happens
//! afterwards. File I/O is left to the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Placeholder remote URL written by [`StageDefinition::template`].
pub const REMOTE_PLACEHOLDER: &str = "<put xrootd url to remote archive here>";

/// Stage definition layout.
///
/// A stage definition replaces every literal of a hand-written staging
/// script: the directory to collect files from, the glob patterns that select
/// them, the name of the archive, the remote URL to copy the archive to, and
/// the directory to finish in.
///
/// # General Layout
///
/// The definition is split into four tables: `[source]`, `[archive]`,
/// `[remote]`, and `[finish]`. Only `[finish]` may be omitted entirely.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct StageDefinition {
    /// Where source files live, and how to select them.
    pub source: SourceSettings,

    /// How to name and compress the archive.
    pub archive: ArchiveSettings,

    /// Where to copy the archive to.
    pub remote: RemoteSettings,

    /// What to do once the archive has been copied.
    #[serde(default)]
    pub finish: FinishSettings,
}

impl StageDefinition {
    /// Starter definition written out by `rootstage init`.
    ///
    /// Selects the preselection and QCD smoothing ROOT files of a TW analysis
    /// area. The remote URL is a placeholder, so the template must be edited
    /// before it parses.
    pub fn template() -> Self {
        Self {
            source: SourceSettings {
                dir: PathBuf::from("$HOME/TWprime/rootfiles"),
                patterns: vec![
                    "TWpreselection*.root".into(),
                    "TWpreselection*_*.root".into(),
                    "smooth_QCD_*.root".into(),
                ],
            },
            archive: ArchiveSettings {
                name: "rootfiles.tgz".into(),
                compression: None,
            },
            remote: RemoteSettings {
                url: RemoteUrl::new(REMOTE_PLACEHOLDER),
                program: default_program(),
                args: Vec::new(),
                force: true,
            },
            finish: FinishSettings {
                dir: Some(PathBuf::from("$HOME/TWprime")),
                cleanup: CleanupPolicy::default(),
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.remote.url.as_str().trim().is_empty() {
            return Err(ConfigError::Remote("remote url is empty".into()));
        }

        if self.remote.url.as_str() == REMOTE_PLACEHOLDER {
            return Err(ConfigError::Remote(
                "remote url still holds the template placeholder".into(),
            ));
        }

        let name = self.archive.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::ArchiveName(self.archive.name.clone()));
        }

        if let Some(level) = self.archive.compression {
            if level > 9 {
                return Err(ConfigError::Compression(level));
            }
        }

        Ok(())
    }
}

impl FromStr for StageDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: StageDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every directory field.
        definition.source.dir = expand_path(&definition.source.dir)?;
        if let Some(dir) = definition.finish.dir.as_ref() {
            definition.finish.dir = Some(expand_path(dir)?);
        }

        definition.validate()?;

        Ok(definition)
    }
}

impl Display for StageDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Source file settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SourceSettings {
    /// Directory to collect source files from.
    pub dir: PathBuf,

    /// Glob patterns, relative to source directory, selecting files to archive.
    pub patterns: Vec<String>,
}

/// Archive settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ArchiveSettings {
    /// File name of archive created inside the source directory.
    pub name: String,

    /// Gzip compression level from 0 to 9.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<u32>,
}

impl ArchiveSettings {
    /// Compression level to use, falling back to gzip's default of 6.
    pub fn level(&self) -> u32 {
        self.compression.unwrap_or(6)
    }
}

/// Remote transfer settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RemoteSettings {
    /// URL of the remote object to overwrite with the archive.
    pub url: RemoteUrl,

    /// Copy tool to invoke.
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments handed to copy tool before the source and destination.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Overwrite existing remote object.
    #[serde(default = "default_force")]
    pub force: bool,
}

fn default_program() -> String {
    "xrdcp".into()
}

fn default_force() -> bool {
    true
}

/// Settings applied once the archive has been copied.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct FinishSettings {
    /// Directory to change into at the very end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// When to delete the local archive.
    #[serde(default)]
    pub cleanup: CleanupPolicy,
}

/// Policy deciding whether the local archive is deleted.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Delete the archive only once the copy tool reported success.
    #[default]
    OnSuccess,

    /// Delete the archive no matter how the copy went.
    Always,

    /// Never delete the archive.
    Never,
}

impl FromStr for CleanupPolicy {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "on-success" => Ok(Self::OnSuccess),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(ConfigError::CleanupPolicy(other.into())),
        }
    }
}

impl Display for CleanupPolicy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::OnSuccess => fmt.write_str("on-success"),
            Self::Always => fmt.write_str("always"),
            Self::Never => fmt.write_str("never"),
        }
    }
}

/// URL of remote object, e.g., `root://cmseos.fnal.gov//store/user/foo/bar.tgz`.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RemoteUrl(String);

impl RemoteUrl {
    /// Construct new remote URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Treat remote URL as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// URL scheme, or `None` if the remote is a plain path.
    pub fn scheme(&self) -> Option<&str> {
        self.0
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }
}

impl Display for RemoteUrl {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

fn expand_path(path: &std::path::Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
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

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Remote URL cannot be used.
    #[error("invalid remote: {0}")]
    Remote(String),

    /// Archive name is not a bare file name.
    #[error("archive name {0:?} must be a bare file name")]
    ArchiveName(String),

    /// Compression level out of range.
    #[error("compression level {0} is not within 0..=9")]
    Compression(u32),

    /// Unknown cleanup policy.
    #[error("unknown cleanup policy {0:?}, expected on-success, always, or never")]
    CleanupPolicy(String),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
