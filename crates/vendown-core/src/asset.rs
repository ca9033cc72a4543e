//! Asset declarations and request classification.
//!
//! Every entry is classified exactly once into a [`ResolvedAction`] and the
//! action is passed down the pipeline, instead of re-sniffing path and URL
//! suffixes at each call site.

use std::path::{Path, PathBuf};

use url::Url;

use crate::archive::ArchiveKind;
use crate::{ProvisionError, Result};

/// One destination → source declaration from a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// Target path, relative to the package directory. A trailing
    /// separator marks a directory target.
    pub destination: String,
    /// URL the asset bytes are fetched from.
    pub source: String,
}

impl AssetSpec {
    pub fn new(destination: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            source: source.into(),
        }
    }
}

/// Whether a destination names a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    File,
    Directory,
}

impl DestinationKind {
    /// Classify a destination string by its trailing separator.
    pub fn of(destination: &str) -> Self {
        if destination.ends_with('/') || destination.ends_with('\\') {
            DestinationKind::Directory
        } else {
            DestinationKind::File
        }
    }
}

/// Whether a source locator points at a recognized archive or a plain file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Archive(ArchiveKind),
    Plain,
}

impl SourceKind {
    pub fn of(source: &str) -> Self {
        match ArchiveKind::from_url(source) {
            Some(kind) => SourceKind::Archive(kind),
            None => SourceKind::Plain,
        }
    }
}

/// Fully classified request for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAction {
    /// Fetch the source and write its bytes to this exact file path.
    WriteFile { dest: PathBuf },
    /// Fetch the source and write its bytes under this directory, keeping
    /// the source's own filename.
    WriteInto { dir: PathBuf },
    /// Fetch, extract and merge an archive into this directory.
    ExtractInto { dir: PathBuf, kind: ArchiveKind },
}

impl ResolvedAction {
    /// Classify a spec against a base directory.
    ///
    /// Leading separators on the destination are stripped before joining,
    /// so an absolute-looking destination cannot escape the base
    /// directory. A file destination paired with an archive source is not
    /// a defined combination and degrades to a plain download of the
    /// archive bytes to that exact path; archives are only auto-extracted
    /// into directory targets.
    pub fn plan(base_dir: &Path, spec: &AssetSpec) -> Self {
        let relative = spec.destination.trim_start_matches(['/', '\\']);
        let dest = base_dir.join(relative);

        match (
            DestinationKind::of(&spec.destination),
            SourceKind::of(&spec.source),
        ) {
            (DestinationKind::File, _) => ResolvedAction::WriteFile { dest },
            (DestinationKind::Directory, SourceKind::Archive(kind)) => {
                ResolvedAction::ExtractInto { dir: dest, kind }
            }
            (DestinationKind::Directory, SourceKind::Plain) => ResolvedAction::WriteInto { dir: dest },
        }
    }
}

/// Filename component of a source URL, used when a plain file lands in a
/// directory target. Query strings and fragments are not part of the name.
pub fn source_filename(source: &str) -> Result<String> {
    let name = match Url::parse(source) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        // Not an absolute URL; fall back to the last path component.
        Err(_) => source.rsplit(['/', '\\']).next().map(str::to_string),
    };

    match name.filter(|n| !n.is_empty()) {
        Some(n) => Ok(n),
        None => Err(ProvisionError::InvalidManifest {
            message: format!("Cannot derive a filename from source URL: {source}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_kind() {
        assert_eq!(DestinationKind::of("extern/js/"), DestinationKind::Directory);
        assert_eq!(DestinationKind::of("extern/js/app.js"), DestinationKind::File);
        assert_eq!(DestinationKind::of("extern\\js\\"), DestinationKind::Directory);
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(
            SourceKind::of("https://example.com/lib.zip"),
            SourceKind::Archive(ArchiveKind::Zip)
        );
        assert_eq!(
            SourceKind::of("https://example.com/lib.TAR.GZ"),
            SourceKind::Archive(ArchiveKind::TarGz)
        );
        assert_eq!(SourceKind::of("https://example.com/lib.js"), SourceKind::Plain);
    }

    #[test]
    fn test_plan_file_target() {
        let spec = AssetSpec::new("a/b/name.js", "https://example.com/whatever.js");
        let action = ResolvedAction::plan(Path::new("/base"), &spec);

        assert_eq!(
            action,
            ResolvedAction::WriteFile {
                dest: PathBuf::from("/base/a/b/name.js")
            }
        );
    }

    #[test]
    fn test_plan_directory_with_archive() {
        let spec = AssetSpec::new("a/b/", "https://example.com/lib.tgz");
        let action = ResolvedAction::plan(Path::new("/base"), &spec);

        assert_eq!(
            action,
            ResolvedAction::ExtractInto {
                dir: PathBuf::from("/base/a/b/"),
                kind: ArchiveKind::TarGz,
            }
        );
    }

    #[test]
    fn test_plan_directory_with_plain_file() {
        let spec = AssetSpec::new("a/b/", "https://example.com/helper.js");
        let action = ResolvedAction::plan(Path::new("/base"), &spec);

        assert_eq!(
            action,
            ResolvedAction::WriteInto {
                dir: PathBuf::from("/base/a/b/")
            }
        );
    }

    #[test]
    fn test_plan_file_target_with_archive_degrades_to_plain_download() {
        // Archives are only auto-extracted into directory targets.
        let spec = AssetSpec::new("a/b/bundle.zip", "https://example.com/bundle.zip");
        let action = ResolvedAction::plan(Path::new("/base"), &spec);

        assert_eq!(
            action,
            ResolvedAction::WriteFile {
                dest: PathBuf::from("/base/a/b/bundle.zip")
            }
        );
    }

    #[test]
    fn test_plan_strips_leading_separators() {
        let spec = AssetSpec::new("/etc/passwd", "https://example.com/x");
        let action = ResolvedAction::plan(Path::new("/base"), &spec);

        assert_eq!(
            action,
            ResolvedAction::WriteFile {
                dest: PathBuf::from("/base/etc/passwd")
            }
        );
    }

    #[test]
    fn test_source_filename() {
        assert_eq!(
            source_filename("https://example.com/js/helper.js").unwrap(),
            "helper.js"
        );
        assert_eq!(
            source_filename("https://example.com/js/helper.js?v=2#frag").unwrap(),
            "helper.js"
        );
        assert_eq!(source_filename("relative/helper.js").unwrap(), "helper.js");
    }

    #[test]
    fn test_source_filename_rejects_bare_host() {
        assert!(source_filename("https://example.com/").is_err());
    }
}
