//! Post-extraction layout normalization.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Decide the effective root of an extracted archive.
///
/// Release archives frequently wrap their payload in a single enclosing
/// directory (`lib-1.0/`). When the scratch directory holds exactly one
/// entry and that entry is a directory, the payload root is that directory
/// and the wrapper is stripped on merge. In every other case — zero
/// entries, multiple entries, or a single plain file — the scratch
/// directory itself is the root. Runs once per archive and never strips
/// more than one level.
pub fn archive_root(scratch: &Path) -> Result<PathBuf> {
    let mut entries = fs::read_dir(scratch)?;

    let Some(first) = entries.next() else {
        return Ok(scratch.to_path_buf());
    };
    let first = first?;

    if entries.next().is_some() {
        return Ok(scratch.to_path_buf());
    }

    if first.file_type()?.is_dir() {
        Ok(first.path())
    } else {
        Ok(scratch.to_path_buf())
    }
}
