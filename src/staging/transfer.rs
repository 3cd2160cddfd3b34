// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote transfer logic.
//!
//! Rootstage does not speak any remote storage protocol itself. Copying the
//! archive to its remote destination is offloaded to an external copy tool,
//! which is `xrdcp` from XRootD by default. The copy tool is invoked as:
//!
//! ```text
//! <program> [-f] [args...] <archive> <remote>
//! ```
//!
//! where `-f` asks the tool to overwrite any existing remote object.

use crate::config::{RemoteSettings, RemoteUrl};

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Command,
    time::Duration,
};
use tracing::{debug, info, instrument};

/// Copy a local archive to a remote destination.
pub trait Transfer {
    /// Copy archive to remote URL, overwriting whatever is already there.
    ///
    /// Returns any output the transfer produced.
    fn upload(&self, archive: &Path, remote: &RemoteUrl) -> Result<String>;
}

/// Transfer through an external copy tool.
#[derive(Debug, Clone)]
pub struct CopyTool {
    program: OsString,
    args: Vec<OsString>,
    force: bool,
    bar: ProgressBar,
}

impl CopyTool {
    /// Construct new copy tool transfer around given program.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            force: true,
            bar: ProgressBar::hidden(),
        }
    }

    /// Construct copy tool transfer from remote settings of stage definition.
    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(settings.program.as_str())
            .args(settings.args.iter())
            .force(settings.force)
    }

    /// Extra arguments to place before source and destination.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Ask copy tool to overwrite existing remote object.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Show spinner on given progress bar while copy tool runs.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Full argument listing handed to copy tool.
    pub fn command_args(&self, archive: &Path, remote: &RemoteUrl) -> Vec<OsString> {
        let mut bin_args: Vec<OsString> = Vec::new();
        if self.force {
            bin_args.push("-f".into());
        }
        bin_args.extend(self.args.iter().cloned());
        bin_args.push(archive.as_os_str().to_os_string());
        bin_args.push(remote.as_str().into());

        bin_args
    }
}

impl Transfer for CopyTool {
    #[instrument(skip(self, archive, remote), level = "debug")]
    fn upload(&self, archive: &Path, remote: &RemoteUrl) -> Result<String> {
        let style = ProgressStyle::with_template("{elapsed_precise:.green}  {spinner:.yellow} {msg}")?;
        self.bar.set_style(style);
        self.bar.set_message(format!("copy to {remote}"));
        self.bar.enable_steady_tick(Duration::from_millis(100));

        info!("copy {:?} to {remote}", archive.display());
        debug!("remote scheme: {:?}", remote.scheme());
        let result = syscall_non_interactive(&self.program, self.command_args(archive, remote));
        self.bar.finish_and_clear();

        let output = result?;
        if !output.is_empty() {
            debug!("{output}");
        }

        Ok(output)
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .output()
        .map_err(|err| Error::Spawn {
            source: err,
            program: cmd.as_ref().to_os_string(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(Error::Failed {
            program: cmd.as_ref().to_os_string(),
            status: output.status.code(),
            message,
        });
    }

    Ok(message)
}

/// Transfer error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Copy tool cannot be started.
    #[error("failed to run copy tool {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Copy tool exited with failure.
    #[error("copy tool {program:?} failed with exit code {status:?}:\n{message}")]
    Failed {
        program: OsString,
        status: Option<i32>,
        message: String,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    ProgressStyle(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
