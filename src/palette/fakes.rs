//! In-memory metadata and cover sources that count their calls.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    domain::query::Period,
    lastfm::{AlbumEntry, Credentials, LookupError, MetadataSource, UserProfile},
    palette::cover::{CoverError, CoverSource},
};

pub fn credentials() -> Credentials {
    Credentials {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    }
}

pub fn album(rank: u32, cover: Option<&str>) -> AlbumEntry {
    AlbumEntry {
        rank,
        title: format!("Album {rank}"),
        artist: "Artist".to_string(),
        playcount: Some(1000 - rank as u64),
        cover_url: cover.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    albums: Option<Vec<AlbumEntry>>,
    pub user_calls: AtomicUsize,
    pub album_calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn with_albums(albums: Vec<AlbumEntry>) -> Self {
        Self {
            albums: Some(albums),
            ..Default::default()
        }
    }

    pub fn unknown_user() -> Self {
        Self::default()
    }
}

impl MetadataSource for FakeMetadata {
    fn resolve_user(
        &self,
        _credentials: &Credentials,
        identity: &str,
    ) -> Result<UserProfile, LookupError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        match self.albums {
            Some(_) => Ok(UserProfile {
                name: identity.to_string(),
                playcount: None,
            }),
            None => Err(LookupError::Service {
                code: 6,
                message: "User not found".to_string(),
            }),
        }
    }

    fn top_albums(
        &self,
        _credentials: &Credentials,
        _user: &UserProfile,
        _period: Period,
        _limit: u32,
    ) -> Result<Vec<AlbumEntry>, LookupError> {
        self.album_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.albums.clone().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeCovers {
    images: Mutex<HashMap<String, Vec<u8>>>,
    pub calls: AtomicUsize,
}

impl FakeCovers {
    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.images.lock().unwrap().insert(url.to_string(), bytes);
    }
}

impl CoverSource for FakeCovers {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(CoverError::Status(404))
    }
}
