use thiserror::Error;

/// Failure to resolve a user or to list their albums.
///
/// Fatal for the whole request: the text is shown to the user as is.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Error reported by Last.fm itself, e.g. "User not found"
    #[error("{message}")]
    Service { code: u32, message: String },

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("metadata service answered with HTTP status {0}")]
    Status(u16),

    #[error("malformed metadata response: {0}")]
    Malformed(#[from] serde_json::Error),
}
