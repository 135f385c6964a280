//! Cover art → dominant colors → swatch strip

pub mod cover;
pub mod extract;
pub mod fetcher;
pub mod render;

#[cfg(test)]
pub(crate) mod fakes;

pub use fetcher::{CacheSettings, Palette, PaletteFetcher, SkipReason, SkippedAlbum};
