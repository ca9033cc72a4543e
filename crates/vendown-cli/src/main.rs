use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use vendown_core::{AssetResolver, DownloadsManifest, EntryOutcome, HttpClient};

#[derive(Parser, Debug)]
#[command(name = "vendown")]
#[command(about = "Provision extra downloads declared by installed packages", version)]
struct Args {
    /// Package directories whose manifests declare downloads
    #[arg(value_name = "PKG_DIR", required = true)]
    packages: Vec<PathBuf>,

    /// Re-fetch every entry even when the destination already exists
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let client = HttpClient::new().context("Failed to build HTTP client")?;
    let resolver = AssetResolver::new(Arc::new(client));

    for package_dir in &args.packages {
        provision_package(&resolver, package_dir, args.force);
    }

    // Per-entry failures are reported above but never fail the invocation;
    // a re-run picks up whatever is still missing.
    Ok(())
}

fn provision_package(resolver: &AssetResolver, package_dir: &Path, force: bool) {
    let manifest = match DownloadsManifest::from_package_dir(package_dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!(
                "{} {}: {}",
                style("Warning:").yellow().bold(),
                package_dir.display(),
                e
            );
            return;
        }
    };

    if manifest.is_empty() {
        log::debug!("{}: no downloads declared", package_dir.display());
        return;
    }

    let label = manifest
        .package
        .clone()
        .unwrap_or_else(|| package_dir.display().to_string());
    println!(
        "{} {} ({} assets)",
        style("Provisioning").green().bold(),
        label,
        manifest.assets.len()
    );

    let results = resolver.materialize_all(package_dir, &manifest.assets, force);

    for result in &results {
        match &result.outcome {
            EntryOutcome::Installed => {
                println!("  {} {}", style("installed").green(), result.destination);
            }
            EntryOutcome::Skipped => {
                println!("  {} {}", style("up-to-date").dim(), result.destination);
            }
            EntryOutcome::Failed(reason) => {
                eprintln!(
                    "  {} {}: {}",
                    style("failed").red().bold(),
                    result.destination,
                    reason
                );
            }
        }
    }
}
