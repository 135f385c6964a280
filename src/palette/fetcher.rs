use std::{fmt::Display, sync::Arc, time::Duration};

use log::{debug, info};
use moka::sync::Cache;

use crate::{
    domain::{color::ColorSample, query::Query},
    lastfm::{AlbumEntry, Credentials, LookupError, MetadataSource},
    palette::{cover::CoverSource, extract},
};

/// Why an album produced no color. Never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingCover,
    Fetch(String),
    Decode(String),
    NoColor,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingCover => write!(f, "no cover art"),
            SkipReason::Fetch(e) => write!(f, "fetch failed: {e}"),
            SkipReason::Decode(e) => write!(f, "decode failed: {e}"),
            SkipReason::NoColor => write!(f, "no color extracted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAlbum {
    pub rank: u32,
    pub title: String,
    pub artist: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumColor {
    pub rank: u32,
    pub title: String,
    pub artist: String,
    pub color: ColorSample,
}

/// Colors in album rank order, plus the albums that were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    pub samples: Vec<AlbumColor>,
    pub skipped: Vec<SkippedAlbum>,
}

impl Palette {
    pub fn colors(&self) -> Vec<ColorSample> {
        self.samples.iter().map(|s| s.color).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub max_entries: u64,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 64,
            ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: Query,
    credentials: Credentials,
}

/// Turns a user's top albums into an ordered list of cover colors.
///
/// Successful results are memoized per (query, credentials). The cache
/// holds at most `max_entries` palettes; each expires `ttl` after insertion.
pub struct PaletteFetcher {
    metadata: Arc<dyn MetadataSource>,
    covers: Arc<dyn CoverSource>,
    cache: Cache<CacheKey, Arc<Palette>>,
}

impl PaletteFetcher {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        covers: Arc<dyn CoverSource>,
        settings: CacheSettings,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.max_entries)
            .time_to_live(settings.ttl)
            .build();
        Self {
            metadata,
            covers,
            cache,
        }
    }

    pub fn fetch(
        &self,
        query: &Query,
        credentials: &Credentials,
    ) -> Result<Arc<Palette>, LookupError> {
        let key = CacheKey {
            query: query.clone(),
            credentials: credentials.clone(),
        };
        if let Some(palette) = self.cache.get(&key) {
            debug!("cache hit for {} / {}", query.identity, query.period.api_name());
            return Ok(palette);
        }

        let palette = Arc::new(self.build(query, credentials)?);
        self.cache.insert(key, Arc::clone(&palette));
        Ok(palette)
    }

    fn build(&self, query: &Query, credentials: &Credentials) -> Result<Palette, LookupError> {
        let user = self.metadata.resolve_user(credentials, &query.identity)?;
        let albums =
            self.metadata
                .top_albums(credentials, &user, query.period, query.count())?;
        info!(
            "{} top albums for {} ({})",
            albums.len(),
            user.name,
            query.period.api_name()
        );

        let mut palette = Palette::default();
        for album in albums.into_iter().take(query.count() as usize) {
            match self.sample(&album) {
                Ok(color) => palette.samples.push(AlbumColor {
                    rank: album.rank,
                    title: album.title,
                    artist: album.artist,
                    color,
                }),
                Err(reason) => {
                    debug!("skipping #{} {}: {}", album.rank, album.title, reason);
                    palette.skipped.push(SkippedAlbum {
                        rank: album.rank,
                        title: album.title,
                        artist: album.artist,
                        reason,
                    });
                }
            }
        }
        Ok(palette)
    }

    fn sample(&self, album: &AlbumEntry) -> Result<ColorSample, SkipReason> {
        let url = album.cover_url.as_deref().ok_or(SkipReason::MissingCover)?;
        let bytes = self
            .covers
            .fetch(url)
            .map_err(|e| SkipReason::Fetch(e.to_string()))?;
        let img = extract::decode(&bytes).map_err(|e| SkipReason::Decode(e.to_string()))?;
        extract::dominant_color(&img).ok_or(SkipReason::NoColor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::query::Period,
        palette::{
            extract::tests::{solid_png, two_tone_png},
            fakes::{FakeCovers, FakeMetadata, album, credentials},
        },
    };
    use std::sync::atomic::Ordering;

    fn fetcher(metadata: &Arc<FakeMetadata>, covers: &Arc<FakeCovers>) -> PaletteFetcher {
        PaletteFetcher::new(
            metadata.clone(),
            covers.clone(),
            CacheSettings::default(),
        )
    }

    #[test]
    fn test_colors_follow_rank_order() -> anyhow::Result<()> {
        let metadata = Arc::new(FakeMetadata::with_albums(vec![
            album(1, Some("http://img/1")),
            album(2, Some("http://img/2")),
            album(3, Some("http://img/3")),
        ]));
        let covers = Arc::new(FakeCovers::default());
        covers.insert("http://img/1", solid_png([255, 0, 0]));
        covers.insert("http://img/2", solid_png([0, 255, 0]));
        covers.insert("http://img/3", solid_png([255, 0, 0]));

        let palette = fetcher(&metadata, &covers)
            .fetch(&Query::new("rj", Period::Overall, 20), &credentials())?;

        let hexes: Vec<_> = palette.colors().iter().map(ColorSample::hex).collect();
        assert_eq!(hexes, vec!["#ff0000", "#00ff00", "#ff0000"]);
        let ranks: Vec<_> = palette.samples.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(palette.skipped.is_empty());

        Ok(())
    }

    #[test]
    fn test_missing_covers_are_skipped() -> anyhow::Result<()> {
        // 18 albums returned, 2 without cover art
        let albums = (1..=18)
            .map(|rank| {
                let url = (rank != 4 && rank != 11).then(|| format!("http://img/{rank}"));
                album(rank, url.as_deref())
            })
            .collect();
        let metadata = Arc::new(FakeMetadata::with_albums(albums));
        let covers = Arc::new(FakeCovers::default());
        for rank in 1..=18u8 {
            covers.insert(&format!("http://img/{rank}"), solid_png([rank, rank, rank]));
        }

        let palette = fetcher(&metadata, &covers)
            .fetch(&Query::new("rj", "Geral".parse()?, 20), &credentials())?;

        assert_eq!(palette.len(), 16);
        assert_eq!(covers.calls.load(Ordering::SeqCst), 16);
        let skipped: Vec<_> = palette.skipped.iter().map(|s| (s.rank, s.reason.clone())).collect();
        assert_eq!(
            skipped,
            vec![(4, SkipReason::MissingCover), (11, SkipReason::MissingCover)]
        );
        for sample in &palette.samples {
            let hex = sample.color.hex();
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
            assert!(hex[1..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }

        Ok(())
    }

    #[test]
    fn test_fetch_and_decode_failures_are_skipped() -> anyhow::Result<()> {
        let metadata = Arc::new(FakeMetadata::with_albums(vec![
            album(1, Some("http://img/broken")),
            album(2, Some("http://img/missing")),
            album(3, Some("http://img/transparent")),
            album(4, Some("http://img/ok")),
        ]));
        let covers = Arc::new(FakeCovers::default());
        covers.insert("http://img/broken", b"not an image".to_vec());
        covers.insert(
            "http://img/transparent",
            two_tone_png(4, 4, [0, 0, 0, 0], [0, 0, 0, 0]),
        );
        covers.insert("http://img/ok", solid_png([1, 2, 3]));

        let palette = fetcher(&metadata, &covers)
            .fetch(&Query::new("rj", Period::SevenDays, 10), &credentials())?;

        assert_eq!(palette.colors(), vec![ColorSample::new(1, 2, 3)]);
        let reasons: Vec<_> = palette.skipped.iter().map(|s| &s.reason).collect();
        assert!(matches!(reasons[0], SkipReason::Decode(_)));
        assert!(matches!(reasons[1], SkipReason::Fetch(_)));
        assert_eq!(reasons[2], &SkipReason::NoColor);

        Ok(())
    }

    #[test]
    fn test_unknown_user_fails_without_image_fetches() {
        let metadata = Arc::new(FakeMetadata::unknown_user());
        let covers = Arc::new(FakeCovers::default());

        let result = fetcher(&metadata, &covers)
            .fetch(&Query::new("nobody", Period::Overall, 20), &credentials());

        match result {
            Err(e) => assert_eq!(e.to_string(), "User not found"),
            Ok(p) => panic!("expected lookup error, got {p:?}"),
        }
        assert_eq!(metadata.album_calls.load(Ordering::SeqCst), 0);
        assert_eq!(covers.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_albums_is_empty_not_error() -> anyhow::Result<()> {
        let metadata = Arc::new(FakeMetadata::with_albums(vec![]));
        let covers = Arc::new(FakeCovers::default());

        let palette = fetcher(&metadata, &covers)
            .fetch(&Query::new("rj", Period::OneMonth, 20), &credentials())?;

        assert!(palette.is_empty());
        Ok(())
    }

    #[test]
    fn test_result_never_exceeds_count() -> anyhow::Result<()> {
        let albums = (1..=30).map(|rank| album(rank, Some("http://img/x"))).collect();
        let metadata = Arc::new(FakeMetadata::with_albums(albums));
        let covers = Arc::new(FakeCovers::default());
        covers.insert("http://img/x", solid_png([9, 9, 9]));

        let palette = fetcher(&metadata, &covers)
            .fetch(&Query::new("rj", Period::Overall, 10), &credentials())?;

        assert_eq!(palette.len(), 10);
        Ok(())
    }

    #[test]
    fn test_identical_queries_hit_the_cache() -> anyhow::Result<()> {
        let metadata = Arc::new(FakeMetadata::with_albums(vec![
            album(1, Some("http://img/1")),
            album(2, Some("http://img/2")),
        ]));
        let covers = Arc::new(FakeCovers::default());
        covers.insert("http://img/1", solid_png([10, 20, 30]));
        covers.insert("http://img/2", solid_png([40, 50, 60]));
        let fetcher = fetcher(&metadata, &covers);
        let query = Query::new("rj", Period::ThreeMonths, 20);

        let first = fetcher.fetch(&query, &credentials())?;
        let second = fetcher.fetch(&query, &credentials())?;

        assert_eq!(first, second);
        assert_eq!(metadata.user_calls.load(Ordering::SeqCst), 1);
        assert_eq!(metadata.album_calls.load(Ordering::SeqCst), 1);
        assert_eq!(covers.calls.load(Ordering::SeqCst), 2);

        // any differing input is a different entry
        fetcher.fetch(&Query::new("rj", Period::SixMonths, 20), &credentials())?;
        assert_eq!(metadata.album_calls.load(Ordering::SeqCst), 2);

        Ok(())
    }

    #[test]
    fn test_failures_are_not_cached() {
        let metadata = Arc::new(FakeMetadata::unknown_user());
        let covers = Arc::new(FakeCovers::default());
        let fetcher = fetcher(&metadata, &covers);
        let query = Query::new("nobody", Period::Overall, 20);

        assert!(fetcher.fetch(&query, &credentials()).is_err());
        assert!(fetcher.fetch(&query, &credentials()).is_err());

        assert_eq!(metadata.user_calls.load(Ordering::SeqCst), 2);
    }
}
