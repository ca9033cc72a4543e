pub mod archive;
pub mod asset;
pub mod error;
pub mod http;
pub mod manifest;
pub mod merge;
pub mod normalize;
pub mod resolver;

pub use archive::{ArchiveBackend, ArchiveExtractor, ArchiveKind, LibraryBackend, ShellBackend};
pub use asset::{AssetSpec, DestinationKind, ResolvedAction, SourceKind};
pub use error::{ProvisionError, Result};
pub use http::{HttpClient, HttpClientConfig, HttpError, Transport};
pub use manifest::DownloadsManifest;
pub use resolver::{AssetResolver, EntryOutcome, EntryResult};
#[cfg(test)] mod test_util;
