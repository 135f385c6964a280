//! Access to the scrobbling service (Last.fm)

use std::fmt::Debug;

use crate::domain::query::Period;

pub mod client;
pub mod error;

pub use client::LastFmClient;
pub use error::LookupError;

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// API key and secret of a Last.fm application.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// A user resource as resolved by the metadata service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub playcount: Option<u64>,
}

/// One entry of a user's top albums, in the service's rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumEntry {
    pub rank: u32,
    pub title: String,
    pub artist: String,
    pub playcount: Option<u64>,
    pub cover_url: Option<String>,
}

/// Source of user and album metadata.
pub trait MetadataSource: Send + Sync {
    fn resolve_user(
        &self,
        credentials: &Credentials,
        identity: &str,
    ) -> Result<UserProfile, LookupError>;

    /// Most played albums for `period`, highest play count first.
    fn top_albums(
        &self,
        credentials: &Credentials,
        user: &UserProfile,
        period: Period,
        limit: u32,
    ) -> Result<Vec<AlbumEntry>, LookupError>;
}
