// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Stage ROOT data files to remote storage.
//!
//! Rootstage collects a glob selected set of files from a source directory
//! into one gzip compressed tarball, copies that tarball to a remote storage
//! endpoint through an external copy tool like `xrdcp`, and removes the local
//! tarball afterwards. Everything that would otherwise be hard coded in a
//! staging script lives in a __stage definition__ file.
//!
//! # See Also
//!
//! 1. [`StageDefinition`]
//! 2. [`Stager`]

pub mod config;
pub mod path;
pub mod staging;

pub use config::{CleanupPolicy, StageDefinition};
pub use staging::{StageReport, Stager};
