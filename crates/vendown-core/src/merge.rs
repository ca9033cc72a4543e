//! Scratch-to-destination tree merging.

use std::fs;
use std::io;
use std::path::Path;

use crate::Result;

/// Merge the contents of `source` into `dest`, overwriting conflicting
/// files and preserving subdirectories.
///
/// Files are moved rather than copied: the source tree is disposable
/// scratch. After a successful merge every leaf file originally under
/// `source` exists at the mirrored path under `dest` and `source` is
/// drained; empty subdirectories it leaves behind are discarded together
/// with the scratch workspace by the caller.
pub fn merge_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            merge_tree(&entry.path(), &target)?;
            fs::remove_dir(entry.path())?;
        } else {
            // Destination content is superseded
            if target.exists() {
                fs::remove_file(&target)?;
            }
            move_file(&entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Rename, falling back to copy + remove when source and destination live
/// on different filesystems.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, target)?;
            fs::remove_file(source)?;
            Ok(())
        }
    }
}
