//! Dominant color extraction.
//!
//! Visible pixels are clustered with k-means in Lab space; the centroid of
//! the most populated cluster is the dominant color.

use std::collections::HashSet;

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use kmeans_colors::{Sort, get_kmeans};
use ::palette::{FromColor, IntoColor, Lab, Srgb};

use crate::domain::color::ColorSample;

/// Larger images are downsampled to fit this edge before clustering
const SAMPLE_EDGE: u32 = 128;
/// Clusters per image
const CLUSTERS: usize = 4;
const MAX_ITERATIONS: usize = 20;
const CONVERGENCE: f32 = 1e-4;
const SEED: u64 = 0;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Returns `None` when the image has no visible pixel to sample.
pub fn dominant_color(img: &DynamicImage) -> Option<ColorSample> {
    let (width, height) = img.dimensions();
    let sampled;
    let img = if width > SAMPLE_EDGE || height > SAMPLE_EDGE {
        // nearest neighbour, so no blended colors are introduced
        sampled = img.resize(SAMPLE_EDGE, SAMPLE_EDGE, FilterType::Nearest);
        &sampled
    } else {
        img
    };

    let mut distinct: HashSet<[u8; 3]> = HashSet::new();
    let mut lab_pixels: Vec<Lab> = Vec::new();
    for pixel in img.to_rgba8().pixels() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        distinct.insert([r, g, b]);
        lab_pixels.push(Srgb::new(r, g, b).into_format::<f32>().into_color());
    }

    match distinct.len() {
        0 => None,
        1 => distinct.into_iter().next().map(|[r, g, b]| ColorSample::new(r, g, b)),
        n => {
            let kmeans = get_kmeans(
                CLUSTERS.min(n),
                MAX_ITERATIONS,
                CONVERGENCE,
                false,
                &lab_pixels,
                SEED,
            );
            let dominant = Lab::sort_indexed_colors(&kmeans.centroids, &kmeans.indices)
                .into_iter()
                .max_by(|a, b| {
                    a.percentage
                        .total_cmp(&b.percentage)
                        .then(b.index.cmp(&a.index))
                })?;
            let rgb = Srgb::<f32>::from_color(dominant.centroid).into_format::<u8>();
            Some(ColorSample::new(rgb.red, rgb.green, rgb.blue))
        }
    }
}
