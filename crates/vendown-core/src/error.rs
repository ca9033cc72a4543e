use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    // Transport errors
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Archive errors
    #[error("Failed to extract archive: {0}")]
    Extract(String),

    // IO errors
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    // Manifest errors
    #[error("Failed to parse composer.json: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid downloads manifest: {message}")]
    InvalidManifest { message: String },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
