//! Asset resolution and materialization.
//!
//! The resolver drives the full pipeline for each declared asset:
//! classification, idempotency check, fetch, then either a direct write or
//! the extract → normalize → merge chain for archives. Failures are
//! isolated per entry; one broken download never aborts its siblings.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::archive::ArchiveExtractor;
use crate::asset::{source_filename, AssetSpec, ResolvedAction};
use crate::http::Transport;
use crate::merge::merge_tree;
use crate::normalize::archive_root;
use crate::Result;

/// Outcome of one asset entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Destination already satisfied the request; nothing was fetched.
    Skipped,
    /// Asset was fetched and materialized.
    Installed,
    /// Entry failed; siblings were still processed.
    Failed(String),
}

/// Per-entry report returned by [`AssetResolver::materialize_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResult {
    pub destination: String,
    pub outcome: EntryOutcome,
}

/// Orchestrates transport, extraction, normalization and merging.
pub struct AssetResolver {
    transport: Arc<dyn Transport>,
    extractor: ArchiveExtractor,
}

impl AssetResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            extractor: ArchiveExtractor::new(),
        }
    }

    pub fn with_extractor(transport: Arc<dyn Transport>, extractor: ArchiveExtractor) -> Self {
        Self { transport, extractor }
    }

    /// Materialize every asset of one package into `base_dir`.
    ///
    /// Entries are processed independently, one fully after another; a
    /// failure is recorded in that entry's result and never aborts the
    /// run. With `force` the idempotency check is bypassed and every entry
    /// is re-fetched.
    pub fn materialize_all(&self, base_dir: &Path, specs: &[AssetSpec], force: bool) -> Vec<EntryResult> {
        specs
            .iter()
            .map(|spec| {
                let outcome = match self.materialize(base_dir, spec, force) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        log::warn!(
                            "Failed to provision {} from {}: {}",
                            spec.destination,
                            spec.source,
                            e
                        );
                        EntryOutcome::Failed(e.to_string())
                    }
                };

                EntryResult {
                    destination: spec.destination.clone(),
                    outcome,
                }
            })
            .collect()
    }

    fn materialize(&self, base_dir: &Path, spec: &AssetSpec, force: bool) -> Result<EntryOutcome> {
        let action = ResolvedAction::plan(base_dir, spec);

        if !force && is_satisfied(&action) {
            log::debug!("{} already provisioned, skipping", spec.destination);
            return Ok(EntryOutcome::Skipped);
        }

        match action {
            ResolvedAction::WriteFile { dest } => {
                let bytes = self.transport.fetch(&spec.source)?;
                write_file(&dest, &bytes)?;
            }
            ResolvedAction::WriteInto { dir } => {
                let filename = source_filename(&spec.source)?;
                let bytes = self.transport.fetch(&spec.source)?;
                write_file(&dir.join(filename), &bytes)?;
            }
            ResolvedAction::ExtractInto { dir, kind } => {
                let bytes = self.transport.fetch(&spec.source)?;
                fs::create_dir_all(&dir)?;

                // Scratch lives next to the destination so merge renames
                // stay on one filesystem in the common case.
                let scratch = self.extractor.extract(&bytes, kind, base_dir)?;
                let root = archive_root(scratch.path())?;
                merge_tree(&root, &dir)?;
                // Scratch guard drops here and removes the workspace
            }
        }

        Ok(EntryOutcome::Installed)
    }
}

/// Whether the destination already satisfies the request.
fn is_satisfied(action: &ResolvedAction) -> bool {
    match action {
        ResolvedAction::WriteFile { dest } => dest.exists(),
        ResolvedAction::WriteInto { dir } | ResolvedAction::ExtractInto { dir, .. } => {
            dir_is_provisioned(dir)
        }
    }
}

/// A directory target counts as provisioned when it exists and holds at
/// least one entry, whatever that entry is. Deliberately coarse; no
/// content or manifest check.
fn dir_is_provisioned(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

fn write_file(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)?;
    Ok(())
}
