// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Gzip compressed tarball handling.
//!
//! Bundle selected source files into one `.tgz` archive, and read the entry
//! listing of an existing archive back out.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Write gzip compressed tarballs.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    path: PathBuf,
    level: u32,
}

impl ArchiveWriter {
    /// Construct new archive writer targeting given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            level: 6,
        }
    }

    /// Set gzip compression level.
    pub fn compression(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Write archive holding files relative to source directory.
    ///
    /// Each entry is named by its path relative to the source directory.
    /// Directories are added recursively. An existing file at the archive
    /// path is overwritten. The archive never includes itself, even when it
    /// is part of the given file listing. An empty listing still produces a
    /// valid, empty archive.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Create`] if archive file cannot be created.
    /// - Return [`Error::Append`] if a source file cannot be added.
    /// - Return [`Error::Finish`] if archive cannot be flushed to disk.
    #[instrument(skip(self, source_dir, files), level = "debug")]
    pub fn write(
        &self,
        source_dir: impl AsRef<Path>,
        files: &[PathBuf],
    ) -> Result<ArchiveSummary> {
        let source_dir = source_dir.as_ref();
        if self.path.exists() {
            debug!("overwrite existing archive {:?}", self.path.display());
        }

        let file = File::create(&self.path).map_err(|err| Error::Create {
            source: err,
            path: self.path.clone(),
        })?;
        let encoder = GzEncoder::new(file, Compression::new(self.level));
        let mut builder = tar::Builder::new(encoder);

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let full_path = source_dir.join(file);
            if full_path == self.path {
                warn!("skip {:?}, it is the archive itself", file.display());
                continue;
            }

            debug!("append {:?}", file.display());
            let appended = if full_path.is_dir() {
                builder.append_dir_all(file, &full_path)
            } else {
                builder.append_path_with_name(&full_path, file)
            };
            appended.map_err(|err| Error::Append {
                source: err,
                path: full_path.clone(),
            })?;

            entries.push(file.clone());
        }

        let finish = |err| Error::Finish {
            source: err,
            path: self.path.clone(),
        };
        let file = builder.into_inner().map_err(finish)?.finish().map_err(finish)?;
        file.sync_all().map_err(finish)?;
        let bytes = file.metadata().map_err(finish)?.len();

        info!(
            "wrote {} entries ({bytes} bytes) to {:?}",
            entries.len(),
            self.path.display()
        );

        Ok(ArchiveSummary {
            path: self.path.clone(),
            entries,
            bytes,
        })
    }
}

/// What was written into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Path to archive file.
    pub path: PathBuf,

    /// Top-level entries added, relative to source directory.
    pub entries: Vec<PathBuf>,

    /// Size of compressed archive on disk.
    pub bytes: u64,
}

/// List entry paths of gzip compressed tarball.
///
/// # Errors
///
/// - Return [`Error::Read`] if archive cannot be opened or decoded.
pub fn list_entries(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let read = |err| Error::Read {
        source: err,
        path: path.to_path_buf(),
    };

    let file = File::open(path).map_err(read)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut listing = Vec::new();
    for entry in archive.entries().map_err(read)? {
        let entry = entry.map_err(read)?;
        listing.push(entry.path().map_err(read)?.into_owned());
    }

    Ok(listing)
}

/// Archive error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Archive file cannot be created.
    #[error("failed to create archive at {:?}", path.display())]
    Create {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source file cannot be added to archive.
    #[error("failed to add {:?} to archive", path.display())]
    Append {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive cannot be completed.
    #[error("failed to finish archive at {:?}", path.display())]
    Finish {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Archive cannot be read back.
    #[error("failed to read archive at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
