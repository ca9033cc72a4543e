//! Archive extraction (zip, tar.gz) into scratch workspaces.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::read::GzDecoder;
use tempfile::TempDir;

use crate::{ProvisionError, Result};

/// Recognized archive families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Detect archive kind from a source locator's suffix, case-insensitively
    pub fn from_url(source: &str) -> Option<Self> {
        let lower = source.to_lowercase();

        if lower.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else {
            None
        }
    }

    /// Extension used for the temporary archive file
    fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::TarGz => ".tar.gz",
        }
    }
}

/// Extraction strategy.
///
/// Backends are tried in priority order; the first one that succeeds wins,
/// and every backend must produce an equivalent tree for the same archive.
pub trait ArchiveBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Expand the archive at `archive` into `dest`, preserving internal
    /// relative paths and directory structure.
    fn extract(&self, archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<()>;
}

/// Expands fetched archive bytes into a fresh scratch directory.
pub struct ArchiveExtractor {
    backends: Vec<Box<dyn ArchiveBackend>>,
}

impl ArchiveExtractor {
    /// Extractor with the default backend order: OS binaries first for
    /// speed, in-process libraries as the fallback.
    pub fn new() -> Self {
        Self {
            backends: vec![Box::new(ShellBackend), Box::new(LibraryBackend)],
        }
    }

    pub fn with_backends(backends: Vec<Box<dyn ArchiveBackend>>) -> Self {
        Self { backends }
    }

    /// Write `bytes` to a uniquely named temporary file and expand it into
    /// a uniquely named scratch directory under `scratch_parent`.
    ///
    /// The temporary archive file is removed when this returns, success or
    /// failure. The scratch directory is owned by the returned guard and
    /// removed when the guard drops.
    pub fn extract(&self, bytes: &[u8], kind: ArchiveKind, scratch_parent: &Path) -> Result<TempDir> {
        let mut archive_file = tempfile::Builder::new()
            .prefix("vendown-")
            .suffix(kind.extension())
            .tempfile_in(scratch_parent)?;
        archive_file.write_all(bytes)?;
        archive_file.flush()?;

        let scratch = tempfile::Builder::new()
            .prefix(".vendown-scratch-")
            .tempdir_in(scratch_parent)?;

        let mut last_error = None;
        for backend in &self.backends {
            match backend.extract(archive_file.path(), kind, scratch.path()) {
                Ok(()) => return Ok(scratch),
                Err(e) => {
                    log::debug!("{} extraction failed, trying next backend: {}", backend.name(), e);
                    // Drop any partial output before the next attempt
                    clear_dir(scratch.path())?;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProvisionError::Extract("No extraction backend available".to_string())
        }))
    }
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extraction via the operating system's `unzip` and `tar` binaries.
pub struct ShellBackend;

impl ArchiveBackend for ShellBackend {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn extract(&self, archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
        let (tool, mut command) = match kind {
            ArchiveKind::Zip => {
                let mut c = Command::new("unzip");
                c.arg("-qq").arg(archive).arg("-d").arg(dest);
                ("unzip", c)
            }
            ArchiveKind::TarGz => {
                let mut c = Command::new("tar");
                c.arg("-xzf").arg(archive).arg("-C").arg(dest);
                ("tar", c)
            }
        };

        let output = command
            .output()
            .map_err(|e| ProvisionError::Extract(format!("Failed to run {tool}: {e}")))?;

        if !output.status.success() {
            return Err(ProvisionError::Extract(format!(
                "{tool} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // The shell tools refuse `..` members on their own, but a symlink
        // member pointing outside the tree must still fail the entry.
        let dest_canonical = canonicalized(dest)?;
        verify_tree_contained(dest, &dest_canonical)
    }
}

/// In-process extraction using the `zip` and `tar` crates.
pub struct LibraryBackend;

impl ArchiveBackend for LibraryBackend {
    fn name(&self) -> &'static str {
        "library"
    }

    fn extract(&self, archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
        match kind {
            ArchiveKind::Zip => extract_zip(archive, dest),
            ArchiveKind::TarGz => extract_tar_gz(archive, dest),
        }
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| ProvisionError::Extract(format!("Failed to open zip: {e}")))?;

    let dest_canonical = canonicalized(dest)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ProvisionError::Extract(format!("Failed to read zip entry: {e}")))?;

        let Some(relative) = sanitize_entry_path(entry.name()) else {
            return Err(ProvisionError::Extract(format!(
                "Unsafe path in archive: {}",
                entry.name()
            )));
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let outpath = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            ensure_contained(&outpath, &dest_canonical)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ensure_contained(&outpath, &dest_canonical)?;

        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    let dest_canonical = canonicalized(dest)?;

    let entries = archive
        .entries()
        .map_err(|e| ProvisionError::Extract(format!("Failed to read tar: {e}")))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| ProvisionError::Extract(format!("Failed to read tar entry: {e}")))?;

        let raw: PathBuf = entry
            .path()
            .map_err(|e| ProvisionError::Extract(format!("Invalid path in tar: {e}")))?
            .into_owned();

        let Some(relative) = sanitize_entry_path(&raw.to_string_lossy()) else {
            return Err(ProvisionError::Extract(format!(
                "Unsafe path in archive: {}",
                raw.display()
            )));
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let outpath = dest.join(&relative);
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ensure_contained(&outpath, &dest_canonical)?;

        entry
            .unpack(&outpath)
            .map_err(|e| ProvisionError::Extract(format!("Failed to extract: {e}")))?;
    }

    Ok(())
}

/// Build a safe relative path from an archive entry name, accepting both
/// separator conventions. Absolute paths are made relative; `..` hops are
/// unsafe and yield `None`. An empty result (`.`, `/`) is skippable.
fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for part in name.replace('\\', "/").split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part => path.push(part),
        }
    }
    Some(path)
}

fn canonicalized(dest: &Path) -> Result<PathBuf> {
    dest.canonicalize()
        .map_err(|e| ProvisionError::Extract(format!("Failed to canonicalize destination: {e}")))
}

/// Verify `outpath` resolves inside the destination before writing to it.
/// Catches entries routed through a symlink planted by an earlier entry.
fn ensure_contained(outpath: &Path, dest_canonical: &Path) -> Result<()> {
    let resolved = outpath.canonicalize().unwrap_or_else(|_| {
        // Not created yet; canonicalize the parent and append the filename
        if let Some(parent) = outpath.parent() {
            if let Ok(parent_canonical) = parent.canonicalize() {
                if let Some(filename) = outpath.file_name() {
                    return parent_canonical.join(filename);
                }
            }
        }
        outpath.to_path_buf()
    });

    if !resolved.starts_with(dest_canonical) {
        return Err(ProvisionError::Extract(format!(
            "Path traversal detected: {} escapes destination directory",
            outpath.display()
        )));
    }

    Ok(())
}

fn verify_tree_contained(dir: &Path, dest_canonical: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        ensure_contained(&entry.path(), dest_canonical)?;
        if entry.file_type()?.is_dir() {
            verify_tree_contained(&entry.path(), dest_canonical)?;
        }
    }
    Ok(())
}

fn clear_dir(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
