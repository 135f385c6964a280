use std::io::Cursor;

use anyhow::Context;
use image::{ImageFormat, Rgb, RgbImage};

use crate::{
    domain::color::ColorSample,
    lastfm::LookupError,
    palette::fetcher::Palette,
};

pub const SWATCH_WIDTH_PX: u32 = 40;
pub const STRIP_HEIGHT_PX: u32 = 160;

pub const ERROR_PREFIX: &str = "Erro ao buscar usuário: ";
pub const EMPTY_NOTICE: &str = "Nenhum álbum com capa encontrado para este período.";

pub fn success_message(count: usize) -> String {
    format!("Analisados {count} álbuns com sucesso!")
}

/// Paints swatch `i` over columns `[i * SWATCH_WIDTH_PX, (i + 1) * SWATCH_WIDTH_PX)`.
/// No borders, axes or labels. `None` for an empty list.
pub fn render_strip(colors: &[ColorSample]) -> Option<RgbImage> {
    if colors.is_empty() {
        return None;
    }
    let width = SWATCH_WIDTH_PX * colors.len() as u32;
    Some(RgbImage::from_fn(width, STRIP_HEIGHT_PX, |x, _| {
        Rgb(colors[(x / SWATCH_WIDTH_PX) as usize].rgb)
    }))
}

pub fn encode_png(img: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .context("Failed to encode palette strip as PNG")?;
    Ok(buf.into_inner())
}

/// What the user ends up seeing for one trigger.
#[derive(Debug)]
pub enum Presentation {
    Failed(String),
    Empty,
    Strip { png: Vec<u8>, count: usize },
}

impl Presentation {
    pub fn from_result<P: AsRef<Palette>>(result: &Result<P, LookupError>) -> anyhow::Result<Self> {
        let palette = match result {
            Ok(palette) => palette.as_ref(),
            Err(e) => return Ok(Presentation::Failed(e.to_string())),
        };
        match render_strip(&palette.colors()) {
            None => Ok(Presentation::Empty),
            Some(img) => Ok(Presentation::Strip {
                png: encode_png(&img)?,
                count: palette.len(),
            }),
        }
    }

    /// One-line outcome shown next to (or instead of) the strip
    pub fn message(&self) -> String {
        match self {
            Presentation::Failed(e) => format!("{ERROR_PREFIX}{e}"),
            Presentation::Empty => EMPTY_NOTICE.to_string(),
            Presentation::Strip { count, .. } => success_message(*count),
        }
    }
}
