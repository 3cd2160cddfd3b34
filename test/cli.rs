// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::AreaFixture;

use anyhow::Result;
use pretty_assertions::assert_eq;
use rootstage::staging::archive::list_entries;
use std::{
    ffi::OsString,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn rootstage(config: &Path, args: &[&str]) -> Result<Output> {
    let mut bin_args: Vec<OsString> = vec!["--config".into(), config.as_os_str().into()];
    bin_args.extend(args.iter().map(OsString::from));

    Ok(Command::new(env!("CARGO_BIN_EXE_rootstage"))
        .args(bin_args)
        .env("RUST_LOG", "debug")
        .output()?)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[cfg(unix)]
#[test]
fn run_prints_only_final_dir() -> Result<()> {
    let area = AreaFixture::new()?;
    area.add_files(&["TWpreselection2016.root", "smooth_QCD_2016.root"])?;
    let config = area.write_definition("cp", "on-success")?;

    let output = rootstage(&config, &["run", "--print-dir"])?;
    assert!(output.status.success());
    assert!(!output.stderr.is_empty());

    let result = stdout(&output);
    assert_eq!(result.lines().count(), 1);
    let final_dir = PathBuf::from(result.trim_end_matches('\n'));
    assert_eq!(final_dir.canonicalize()?, area.finish_dir().canonicalize()?);
    assert_eq!(
        list_entries(area.remote())?,
        vec![
            PathBuf::from("TWpreselection2016.root"),
            PathBuf::from("smooth_QCD_2016.root"),
        ]
    );
    assert!(!area.source_dir().join("rootfiles.tgz").exists());

    Ok(())
}

#[cfg(unix)]
#[test]
fn cleanup_flag_overrides_definition() -> Result<()> {
    let area = AreaFixture::new()?;
    area.add_files(&["smooth_QCD_2016.root"])?;
    let config = area.write_definition("cp", "on-success")?;

    let output = rootstage(&config, &["run", "--cleanup", "never"])?;
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
    assert_eq!(
        list_entries(area.source_dir().join("rootfiles.tgz"))?,
        vec![PathBuf::from("smooth_QCD_2016.root")]
    );

    Ok(())
}

#[cfg(unix)]
#[test]
fn failed_run_exits_with_one() -> Result<()> {
    let area = AreaFixture::new()?;
    area.add_files(&["smooth_QCD_2016.root"])?;
    let config = area.write_definition("false", "on-success")?;

    let output = rootstage(&config, &["run", "--print-dir"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(area.source_dir().join("rootfiles.tgz").exists());

    Ok(())
}

#[test]
fn missing_definition_exits_with_one() -> Result<()> {
    let area = AreaFixture::new()?;

    let output = rootstage(&area.root().join("nope.toml"), &["list"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());

    Ok(())
}

#[test]
fn init_creates_parents_and_refuses_overwrite() -> Result<()> {
    let area = AreaFixture::new()?;
    let config = area.root().join("config").join("rootstage").join("stage.toml");

    let output = rootstage(&config, &["init"])?;
    assert!(output.status.success());
    let template = read_to_string(&config)?;
    assert!(template.contains("smooth_QCD_*.root"));

    write(&config, "edited")?;
    let output = rootstage(&config, &["init"])?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(read_to_string(&config)?, "edited");

    let output = rootstage(&config, &["init", "--force"])?;
    assert!(output.status.success());
    assert_eq!(read_to_string(&config)?, template);

    Ok(())
}

#[test]
fn list_and_inspect_print_paths_only() -> Result<()> {
    let area = AreaFixture::new()?;
    area.add_files(&["TWpreselection2016.root", "smooth_QCD_2016.root", "plots.pdf"])?;
    let config = area.write_definition("cp", "never")?;

    let output = rootstage(&config, &["list"])?;
    assert!(output.status.success());
    assert_eq!(stdout(&output), "TWpreselection2016.root\nsmooth_QCD_2016.root\n");

    let archive = area.root().join("bundle.tgz");
    rootstage::staging::archive::ArchiveWriter::new(&archive).write(
        area.source_dir(),
        &[PathBuf::from("smooth_QCD_2016.root")],
    )?;
    let output = rootstage(&config, &["inspect", archive.to_string_lossy().as_ref()])?;
    assert!(output.status.success());
    assert_eq!(stdout(&output), "smooth_QCD_2016.root\n");

    Ok(())
}
