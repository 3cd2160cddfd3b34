// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use rootstage::{
    config::{CleanupPolicy, StageDefinition},
    path::default_definition_path,
    staging::{archive::list_entries, select::select, transfer::CopyTool, Stager},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::PathBuf,
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "rootstage [options] <rootstage-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to stage definition file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Run(opts) => run_stage(self.config, opts),
            Command::Init(opts) => run_init(self.config, opts),
            Command::List => run_list(self.config),
            Command::Inspect(opts) => run_inspect(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Archive source files, copy archive to remote, and clean up.
    #[command(override_usage = "rootstage run [options]")]
    Run(RunOptions),

    /// Write starter stage definition.
    #[command(override_usage = "rootstage init [options]")]
    Init(InitOptions),

    /// List source files that would be archived.
    #[command(override_usage = "rootstage list [options]")]
    List,

    /// List entries of existing archive.
    #[command(override_usage = "rootstage inspect <archive>")]
    Inspect(InspectOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RunOptions {
    /// When to delete the local archive: on-success, always, or never.
    #[arg(long, value_name = "policy")]
    pub cleanup: Option<CleanupPolicy>,

    /// Print the directory the stage finishes in to stdout.
    #[arg(short, long)]
    pub print_dir: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Overwrite existing stage definition.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InspectOptions {
    /// Path to gzip compressed tarball.
    #[arg(required = true, value_name = "archive")]
    pub archive: PathBuf,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn definition_path(config: Option<PathBuf>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => Ok(default_definition_path()?),
    }
}

fn load_definition(config: Option<PathBuf>) -> Result<StageDefinition> {
    let path = definition_path(config)?;
    let data = read_to_string(&path)
        .with_context(|| format!("failed to read stage definition {:?}", path.display()))?;
    let definition: StageDefinition = data
        .parse()
        .with_context(|| format!("invalid stage definition {:?}", path.display()))?;

    Ok(definition)
}

fn run_stage(config: Option<PathBuf>, opts: RunOptions) -> Result<()> {
    let definition = load_definition(config)?;
    let transfer = CopyTool::from_settings(&definition.remote).with_progress(ProgressBar::new_spinner());
    let mut stager = Stager::new(definition, transfer);
    if let Some(policy) = opts.cleanup {
        stager = stager.cleanup_policy(policy);
    }

    let report = stager.run()?;
    info!(
        "staged {} file(s) from {:?} to {}",
        report.files.len(),
        report.source_dir.display(),
        report.remote
    );

    if opts.print_dir {
        println!("{}", report.final_dir.display());
    }

    Ok(())
}

fn run_init(config: Option<PathBuf>, opts: InitOptions) -> Result<()> {
    let path = definition_path(config)?;
    if path.exists() && !opts.force {
        bail!(
            "stage definition {:?} already exists, use --force to overwrite it",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent.display()))?;
    }

    let contents = StageDefinition::template().to_string();
    write(&path, contents.as_bytes())
        .with_context(|| format!("failed to write stage definition {:?}", path.display()))?;
    info!("wrote stage definition to {:?}, edit it before running", path.display());

    Ok(())
}

fn run_list(config: Option<PathBuf>) -> Result<()> {
    let definition = load_definition(config)?;
    for file in select(&definition.source.dir, &definition.source.patterns)? {
        println!("{}", file.display());
    }

    Ok(())
}

fn run_inspect(opts: InspectOptions) -> Result<()> {
    for entry in list_entries(&opts.archive)? {
        println!("{}", entry.display());
    }

    Ok(())
}
