use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::query::Period,
    lastfm::{AlbumEntry, Credentials, LookupError, MetadataSource, UserProfile},
};

/// Preferred cover size, the largest one Last.fm lists
const COVER_SIZE: &str = "extralarge";

/// Blocking client for the Last.fm REST API (JSON flavour).
pub struct LastFmClient {
    http: Client,
    api_url: String,
}

impl LastFmClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, LookupError> {
        let http = Client::builder()
            .user_agent(concat!("aquarela/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }

    fn call(
        &self,
        credentials: &Credentials,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, LookupError> {
        debug!("Last.fm {method} {params:?}");

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("method", method),
                ("api_key", credentials.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(LookupError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };

        // Last.fm reports errors in the body, sometimes with a 200 status
        if let Some(err) = service_error(&value) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        Ok(value)
    }
}

impl MetadataSource for LastFmClient {
    fn resolve_user(
        &self,
        credentials: &Credentials,
        identity: &str,
    ) -> Result<UserProfile, LookupError> {
        let value = self.call(credentials, "user.getinfo", &[("user", identity)])?;
        parse_user(value)
    }

    fn top_albums(
        &self,
        credentials: &Credentials,
        user: &UserProfile,
        period: Period,
        limit: u32,
    ) -> Result<Vec<AlbumEntry>, LookupError> {
        let limit_str = limit.to_string();
        let value = self.call(
            credentials,
            "user.gettopalbums",
            &[
                ("user", user.name.as_str()),
                ("period", period.api_name()),
                ("limit", limit_str.as_str()),
            ],
        )?;
        let mut albums = parse_top_albums(value)?;
        // never hand back more than was asked for
        albums.truncate(limit as usize);
        Ok(albums)
    }
}

#[derive(Deserialize)]
struct UserInfoBody {
    user: RawUser,
}

#[derive(Deserialize)]
struct RawUser {
    name: String,
    #[serde(default)]
    playcount: Option<Value>,
}

#[derive(Deserialize)]
struct TopAlbumsBody {
    topalbums: RawTopAlbums,
}

#[derive(Deserialize)]
struct RawTopAlbums {
    #[serde(default)]
    album: OneOrMany<RawAlbum>,
}

/// Last.fm collapses single-element lists into a bare object
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
struct RawAlbum {
    name: String,
    #[serde(default)]
    playcount: Option<Value>,
    artist: RawArtist,
    #[serde(default)]
    image: Vec<RawImage>,
    #[serde(rename = "@attr", default)]
    attr: Option<RawRank>,
}

#[derive(Deserialize)]
struct RawArtist {
    name: String,
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default)]
    size: String,
    #[serde(rename = "#text", default)]
    url: String,
}

#[derive(Deserialize)]
struct RawRank {
    rank: Value,
}

/// Numbers arrive as strings most of the time, but not always
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn service_error(value: &Value) -> Option<LookupError> {
    let code = value.get("error").and_then(as_u64)?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Last.fm returned an error")
        .to_string();
    Some(LookupError::Service {
        code: code as u32,
        message,
    })
}

fn parse_user(value: Value) -> Result<UserProfile, LookupError> {
    let body: UserInfoBody = serde_json::from_value(value)?;
    Ok(UserProfile {
        name: body.user.name,
        playcount: body.user.playcount.as_ref().and_then(as_u64),
    })
}

fn parse_top_albums(value: Value) -> Result<Vec<AlbumEntry>, LookupError> {
    let body: TopAlbumsBody = serde_json::from_value(value)?;
    let albums = body
        .topalbums
        .album
        .into_vec()
        .into_iter()
        .enumerate()
        .map(|(i, raw)| AlbumEntry {
            rank: raw
                .attr
                .as_ref()
                .and_then(|a| as_u64(&a.rank))
                .map(|r| r as u32)
                .unwrap_or(i as u32 + 1),
            cover_url: pick_cover(&raw.image),
            playcount: raw.playcount.as_ref().and_then(as_u64),
            title: raw.name,
            artist: raw.artist.name,
        })
        .collect();
    Ok(albums)
}

/// The `extralarge` image if present, otherwise the last (largest) non-empty one.
fn pick_cover(images: &[RawImage]) -> Option<String> {
    let usable = || images.iter().filter(|img| !img.url.trim().is_empty());
    usable()
        .find(|img| img.size == COVER_SIZE)
        .or_else(|| usable().last())
        .map(|img| img.url.trim().to_string())
}
