// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Source file selection.
//!
//! Select files in a source directory through a listing of glob patterns.
//! Patterns are always relative to the source directory, so selected paths
//! come back relative to it as well. These relative paths become the entry
//! names of the archive, exactly like running `tar` from inside the source
//! directory would name them.

use glob::{glob_with, MatchOptions, Pattern};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Select files in source directory that match any of the given patterns.
///
/// Matches are ordered by pattern first, then lexically within a pattern.
/// A path matched by more than one pattern is only selected once. Matching
/// nothing at all is fine, and simply yields an empty selection.
///
/// # Errors
///
/// - Return [`Error::AbsolutePattern`] if a pattern is not relative.
/// - Return [`Error::Pattern`] if a pattern has invalid syntax.
/// - Return [`Error::Glob`] if a matched path cannot be read.
/// - Return [`Error::OutsideSource`] if a match cannot be named relative to
///   the source directory.
#[instrument(skip(source_dir, patterns), level = "debug")]
pub fn select(
    source_dir: impl AsRef<Path>,
    patterns: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<Vec<PathBuf>> {
    let source_dir = source_dir.as_ref();
    // INVARIANT: Source directory may itself contain glob metacharacters.
    let base = Pattern::escape(source_dir.to_string_lossy().as_ref());
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if Path::new(pattern).is_absolute() {
            return Err(Error::AbsolutePattern(pattern.into()));
        }

        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        let mut count = 0usize;
        for entry in glob_with(&full, options).map_err(|err| Error::Pattern {
            source: err,
            pattern: pattern.into(),
        })? {
            let relative = relative_to(source_dir, entry?)?;

            count += 1;
            if seen.insert(relative.clone()) {
                selected.push(relative);
            }
        }

        debug!("pattern {pattern:?} matched {count} path(s)");
    }

    Ok(selected)
}

fn relative_to(source_dir: &Path, path: PathBuf) -> Result<PathBuf> {
    match path.strip_prefix(source_dir) {
        Ok(relative) => Ok(relative.to_path_buf()),
        Err(_) => Err(Error::OutsideSource {
            path,
            source_dir: source_dir.to_path_buf(),
        }),
    }
}

/// Source file selection error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pattern has invalid glob syntax.
    #[error("invalid glob pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },

    /// Pattern escapes the source directory.
    #[error("glob pattern {0:?} must be relative to the source directory")]
    AbsolutePattern(String),

    /// Matched path does not live under source directory.
    #[error("matched path {:?} is not inside {:?}", path.display(), source_dir.display())]
    OutsideSource { path: PathBuf, source_dir: PathBuf },

    /// Matched path cannot be read.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    fn touch(dir: &Path, files: &[&str]) -> anyhow::Result<()> {
        for file in files {
            let path = dir.join(file);
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            write(path, file.as_bytes())?;
        }

        Ok(())
    }

    #[test]
    fn select_only_matching_files() -> anyhow::Result<()> {
        let dir = tempdir()?;
        touch(
            dir.path(),
            &[
                "TWpreselection2016_data.root",
                "TWpreselection2017_ttbar.root",
                "smooth_QCD_2016.root",
                "QCD_2016.root",
                "TWpreselection2016_data.txt",
                "notes.md",
            ],
        )?;

        let result = select(
            dir.path(),
            ["TWpreselection*.root", "smooth_QCD_*.root"],
        )?;
        let expect = vec![
            PathBuf::from("TWpreselection2016_data.root"),
            PathBuf::from("TWpreselection2017_ttbar.root"),
            PathBuf::from("smooth_QCD_2016.root"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn overlapping_patterns_select_once() -> anyhow::Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), &["TWpreselection2016.root", "TWpreselection2016_ttbar.root"])?;

        let result = select(
            dir.path(),
            ["TWpreselection*_*.root", "TWpreselection*.root"],
        )?;
        let expect = vec![
            PathBuf::from("TWpreselection2016_ttbar.root"),
            PathBuf::from("TWpreselection2016.root"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn no_matches_is_empty_selection() -> anyhow::Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), &["notes.md"])?;

        let result = select(dir.path(), ["*.root"])?;
        assert!(result.is_empty());

        Ok(())
    }

    #[test]
    fn nested_patterns_keep_relative_path() -> anyhow::Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), &["2016/smooth_QCD_a.root", "2017/smooth_QCD_b.root", ".hidden.root"])?;

        let result = select(dir.path(), ["*/smooth_QCD_*.root", "*.root"])?;
        let expect = vec![
            PathBuf::from("2016/smooth_QCD_a.root"),
            PathBuf::from("2017/smooth_QCD_b.root"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn reject_bad_patterns() -> anyhow::Result<()> {
        let dir = tempdir()?;

        let result = select(dir.path(), ["/etc/*.root"]);
        assert!(matches!(result, Err(Error::AbsolutePattern(_))));

        let result = select(dir.path(), ["TWpreselection[.root"]);
        assert!(matches!(result, Err(Error::Pattern { .. })));

        Ok(())
    }

    #[test]
    fn match_outside_source_dir_is_error() {
        let result = relative_to(Path::new("/data/rootfiles"), PathBuf::from("/data/other/a.root"));
        assert!(matches!(result, Err(Error::OutsideSource { .. })));

        let result = relative_to(
            Path::new("/data/rootfiles"),
            PathBuf::from("/data/rootfiles/2016/a.root"),
        );
        assert_eq!(result.ok(), Some(PathBuf::from("2016/a.root")));
    }
}
