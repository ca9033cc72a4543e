//! Package manifest reading.
//!
//! The asset mapping lives in a package's `composer.json` under
//! `extra.downloads`: a JSON object from destination path to source URL.
//! A trailing separator on the destination marks a directory target.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::asset::AssetSpec;
use crate::{ProvisionError, Result};

/// Key under `extra` holding the downloads mapping.
pub const EXTRA_KEY: &str = "downloads";

/// Manifest file read from a package directory.
pub const MANIFEST_NAME: &str = "composer.json";

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    extra: serde_json::Value,
}

/// Asset declarations of one package.
#[derive(Debug, Clone, Default)]
pub struct DownloadsManifest {
    /// Declaring package name, when the manifest carries one.
    pub package: Option<String>,
    /// Declarations in author order.
    pub assets: Vec<AssetSpec>,
}

impl DownloadsManifest {
    /// Read the downloads block of the package rooted at `package_dir`.
    ///
    /// A missing manifest file or an absent `extra.downloads` key yields
    /// an empty manifest; a malformed block is an error.
    pub fn from_package_dir(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(MANIFEST_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from its JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: PackageManifest = serde_json::from_str(content)?;

        let Some(block) = manifest.extra.get(EXTRA_KEY) else {
            return Ok(Self {
                package: manifest.name,
                assets: Vec::new(),
            });
        };

        let mapping: IndexMap<String, String> =
            serde_json::from_value(block.clone()).map_err(|e| ProvisionError::InvalidManifest {
                message: format!("extra.{EXTRA_KEY} must map destination paths to URLs: {e}"),
            })?;

        let assets = mapping
            .into_iter()
            .map(|(destination, source)| AssetSpec { destination, source })
            .collect();

        Ok(Self {
            package: manifest.name,
            assets,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
