// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod cli;

use anyhow::Result;
use std::{
    fs::{create_dir_all, write},
    path::{Path, PathBuf},
};
use tempfile::{tempdir, TempDir};

/// Analysis area with a source directory, a finish directory, and a local
/// directory standing in for remote storage.
pub(crate) struct AreaFixture {
    root: TempDir,
}

impl AreaFixture {
    pub(crate) fn new() -> Result<Self> {
        let root = tempdir()?;
        create_dir_all(root.path().join("rootfiles"))?;
        create_dir_all(root.path().join("analysis"))?;
        create_dir_all(root.path().join("eos"))?;

        Ok(Self { root })
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn source_dir(&self) -> PathBuf {
        self.root.path().join("rootfiles")
    }

    pub(crate) fn finish_dir(&self) -> PathBuf {
        self.root.path().join("analysis")
    }

    pub(crate) fn remote(&self) -> PathBuf {
        self.root.path().join("eos").join("rootfiles.tgz")
    }

    pub(crate) fn add_files(&self, files: &[&str]) -> Result<()> {
        for file in files {
            let path = self.source_dir().join(file);
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            write(path, format!("contents of {file}"))?;
        }

        Ok(())
    }

    /// Stage definition that copies through `cp` into local "remote".
    pub(crate) fn definition(&self, program: &str, cleanup: &str) -> String {
        format!(
            r#"
            [source]
            dir = "{source}"
            patterns = ["TWpreselection*.root", "TWpreselection*_*.root", "smooth_QCD_*.root"]

            [archive]
            name = "rootfiles.tgz"

            [remote]
            url = "{remote}"
            program = "{program}"

            [finish]
            dir = "{finish}"
            cleanup = "{cleanup}"
            "#,
            source = display(&self.source_dir()),
            remote = display(&self.remote()),
            finish = display(&self.finish_dir()),
        )
    }

    /// Write stage definition into the area, returning its path.
    pub(crate) fn write_definition(&self, program: &str, cleanup: &str) -> Result<PathBuf> {
        let path = self.root().join("stage.toml");
        write(&path, self.definition(program, cleanup))?;

        Ok(path)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
