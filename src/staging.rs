// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Sequential file staging.
//!
//! A __stage__ moves a glob selected set of local files into one compressed
//! archive, copies that archive to a remote destination, and removes the
//! local copy once it is no longer needed.
//!
//! # Stage Steps
//!
//! Each stage runs the exact same five steps in the exact same order:
//!
//! 1. __stage__: enter the source directory.
//! 2. __archive__: select source files by glob pattern, and bundle them into
//!    an archive inside the source directory.
//! 3. __upload__: copy the archive to its remote URL, overwriting whatever
//!    remote object was there before.
//! 4. __cleanup__: delete the local archive.
//! 5. __relocate__: enter the finish directory, if one was given.
//!
//! Steps never run concurrently, and a failing step stops the stage right
//! there. The one exception is cleanup, which follows the [`CleanupPolicy`]
//! of the stage definition when the upload fails.
//!
//! # Working Directory
//!
//! Stage and relocate change the working directory of the whole process.
//! Relative paths in the finish directory thus resolve against the source
//! directory, just like a sequence of `cd` commands would.
//!
//! # See Also
//!
//! 1. [`StageDefinition`]
//! 2. [`select`]
//! 3. [`archive`]
//! 4. [`transfer`]

pub mod archive;
pub mod select;
pub mod transfer;

use crate::{
    config::{CleanupPolicy, StageDefinition},
    staging::{
        archive::{ArchiveSummary, ArchiveWriter},
        transfer::{CopyTool, Transfer},
    },
};

use std::{
    env::{current_dir, set_current_dir},
    fs::remove_file,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Run stage steps for a stage definition.
#[derive(Debug)]
pub struct Stager<T = CopyTool>
where
    T: Transfer,
{
    pub(crate) definition: StageDefinition,
    pub(crate) transfer: T,
}

impl Stager<CopyTool> {
    /// Construct new stager that copies through the copy tool of the stage
    /// definition.
    pub fn from_definition(definition: StageDefinition) -> Self {
        let transfer = CopyTool::from_settings(&definition.remote);
        Self::new(definition, transfer)
    }
}

impl<T> Stager<T>
where
    T: Transfer,
{
    /// Construct new stager.
    pub fn new(definition: StageDefinition, transfer: T) -> Self {
        Self {
            definition,
            transfer,
        }
    }

    /// Stage definition being run.
    pub fn definition(&self) -> &StageDefinition {
        &self.definition
    }

    /// Override cleanup policy of stage definition.
    pub fn cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
        self.definition.finish.cleanup = policy;
        self
    }

    /// Enter source directory.
    ///
    /// Returns canonical path of source directory.
    ///
    /// # Errors
    ///
    /// - Return [`StagingError::EnterDir`] if source directory cannot be
    ///   entered.
    #[instrument(skip(self), level = "debug")]
    pub fn stage(&self) -> Result<PathBuf> {
        let dir = &self.definition.source.dir;
        enter_dir(dir)?;
        let source_dir = current_dir().map_err(|err| StagingError::EnterDir {
            source: err,
            path: dir.clone(),
        })?;
        info!("stage from {:?}", source_dir.display());

        Ok(source_dir)
    }

    /// Bundle files matching patterns into archive inside source directory.
    ///
    /// # Errors
    ///
    /// - Return [`StagingError::Select`] if source files cannot be selected.
    /// - Return [`StagingError::Archive`] if archive cannot be written.
    #[instrument(skip(self, source_dir, patterns), level = "debug")]
    pub fn archive(
        &self,
        source_dir: &Path,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<ArchiveSummary> {
        let files = select::select(source_dir, patterns)?;
        if files.is_empty() {
            warn!("no files in {:?} match, archive will be empty", source_dir.display());
        }

        let summary = ArchiveWriter::new(source_dir.join(&self.definition.archive.name))
            .compression(self.definition.archive.level())
            .write(source_dir, &files)?;

        Ok(summary)
    }

    /// Copy archive to remote URL of stage definition.
    ///
    /// # Errors
    ///
    /// - Return [`StagingError::Transfer`] if copy fails.
    #[instrument(skip(self, archive), level = "debug")]
    pub fn upload(&self, archive: &Path) -> Result<()> {
        self.transfer.upload(archive, &self.definition.remote.url)?;
        info!("uploaded to {}", self.definition.remote.url);

        Ok(())
    }

    /// Delete local archive.
    ///
    /// An archive that is already gone counts as cleaned up.
    ///
    /// # Errors
    ///
    /// - Return [`StagingError::Cleanup`] if archive cannot be deleted.
    #[instrument(skip(self, archive), level = "debug")]
    pub fn cleanup(&self, archive: &Path) -> Result<()> {
        match remove_file(archive) {
            Ok(()) => {
                debug!("removed {:?}", archive.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("archive {:?} already gone", archive.display());
                Ok(())
            }
            Err(err) => Err(StagingError::Cleanup {
                source: err,
                path: archive.to_path_buf(),
            }),
        }
    }

    /// Enter finish directory, if stage definition has one.
    ///
    /// Returns the working directory the stage ends in.
    ///
    /// # Errors
    ///
    /// - Return [`StagingError::EnterDir`] if finish directory cannot be
    ///   entered.
    #[instrument(skip(self), level = "debug")]
    pub fn relocate(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.definition.finish.dir {
            enter_dir(dir)?;
        }

        let dir = current_dir().map_err(|err| StagingError::EnterDir {
            source: err,
            path: PathBuf::from("."),
        })?;
        debug!("finish in {:?}", dir.display());

        Ok(dir)
    }

    /// Run every stage step in order.
    ///
    /// # Errors
    ///
    /// - Return first error of any failing step. When the upload fails the
    ///   archive is still removed under [`CleanupPolicy::Always`].
    pub fn run(&self) -> Result<StageReport> {
        let source_dir = self.stage()?;
        let summary = self.archive(&source_dir, &self.definition.source.patterns)?;

        let policy = self.definition.finish.cleanup;
        if let Err(error) = self.upload(&summary.path) {
            match policy {
                CleanupPolicy::Always => {
                    warn!("upload failed, removing {:?} anyway", summary.path.display());
                    if let Err(cleanup) = self.cleanup(&summary.path) {
                        warn!("{cleanup:?}");
                    }
                }
                CleanupPolicy::OnSuccess | CleanupPolicy::Never => {
                    warn!("upload failed, keeping {:?}", summary.path.display());
                }
            }

            return Err(error);
        }

        let cleaned = match policy {
            CleanupPolicy::Never => {
                info!("keeping {:?}", summary.path.display());
                false
            }
            CleanupPolicy::OnSuccess | CleanupPolicy::Always => {
                self.cleanup(&summary.path)?;
                true
            }
        };

        let final_dir = self.relocate()?;

        Ok(StageReport {
            source_dir,
            archive: summary.path,
            files: summary.entries,
            remote: self.definition.remote.url.to_string(),
            cleaned,
            final_dir,
        })
    }
}

/// Outcome of a full stage run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Canonical source directory.
    pub source_dir: PathBuf,

    /// Path the archive was written to.
    pub archive: PathBuf,

    /// Files bundled into archive, relative to source directory.
    pub files: Vec<PathBuf>,

    /// Remote URL archive was copied to.
    pub remote: String,

    /// Whether local archive was deleted.
    pub cleaned: bool,

    /// Working directory the stage ended in.
    pub final_dir: PathBuf,
}

fn enter_dir(dir: &Path) -> Result<()> {
    set_current_dir(dir).map_err(|err| StagingError::EnterDir {
        source: err,
        path: dir.to_path_buf(),
    })
}

/// All possible error types for a stage run.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Directory cannot be entered.
    #[error("failed to enter directory {:?}", path.display())]
    EnterDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source files cannot be selected.
    #[error(transparent)]
    Select(#[from] crate::staging::select::Error),

    /// Archive cannot be written.
    #[error(transparent)]
    Archive(#[from] crate::staging::archive::Error),

    /// Archive cannot be copied to remote.
    #[error(transparent)]
    Transfer(#[from] crate::staging::transfer::Error),

    /// Local archive cannot be deleted.
    #[error("failed to remove archive {:?}", path.display())]
    Cleanup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StagingError> = std::result::Result<T, E>;
