//! Image decoding for embedding

use crate::types::{CardImage, Result};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, Rgba};
use proxy_layout::constants::DEFAULT_BACK_SIZE_PX;
use std::path::Path;
use std::sync::Arc;

/// Flatten any image onto white, dropping alpha.
///
/// Scryfall PNGs have transparent rounded corners; composited on white they
/// print like a trimmed card.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn decode_file(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)?;
    Ok(flatten_on_white(&image))
}

/// Load the default back image, resized to the standard card pixel size
pub fn load_default_back_blocking(path: &Path) -> Result<CardImage> {
    let (width, height) = DEFAULT_BACK_SIZE_PX;
    let image = image::open(path)?.resize_exact(width, height, FilterType::Lanczos3);

    Ok(CardImage::Decoded {
        key: format!("default-back:{}", path.display()),
        image: Arc::new(flatten_on_white(&image)),
    })
}

pub async fn load_default_back(path: impl AsRef<Path>) -> Result<CardImage> {
    let path = path.as_ref().to_owned();
    tokio::task::spawn_blocking(move || load_default_back_blocking(&path)).await?
}
