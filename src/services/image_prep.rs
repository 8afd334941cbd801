use std::io::Cursor;

use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageOutputFormat};

use crate::models::{PreparedImage, UploadedImage};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Shrinks oversized images so the outbound payload stays small.
///
/// Never fails: anything that cannot be decoded is forwarded untouched with
/// the MIME type the client declared.
pub fn prepare(image: &UploadedImage, max_dimension: u32, jpeg_quality: u8) -> PreparedImage {
    match downscale(&image.bytes, max_dimension, jpeg_quality) {
        Ok(Some(resized)) => {
            log::info!(
                "🖼️ Image resized to {}x{} ({} -> {} bytes)",
                resized.width,
                resized.height,
                image.bytes.len(),
                resized.bytes.len()
            );
            PreparedImage {
                bytes: resized.bytes,
                mime_type: "image/jpeg".to_string(),
            }
        }
        Ok(None) => passthrough(image),
        Err(e) => {
            log::warn!("⚠️ Could not process image for resizing: {}", e);
            passthrough(image)
        }
    }
}

struct Resized {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

/// `Ok(None)` means the image already fits inside the box.
fn downscale(bytes: &[u8], max_dimension: u32, jpeg_quality: u8) -> Result<Option<Resized>, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let (width, height) = reader.into_dimensions()?;
    if width <= max_dimension && height <= max_dimension {
        return Ok(None);
    }

    let img = image::load_from_memory(bytes)?;
    let thumb = img.thumbnail(max_dimension, max_dimension);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(thumb.to_rgb8());

    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Jpeg(jpeg_quality))?;

    let (width, height) = rgb.dimensions();
    Ok(Some(Resized {
        bytes: out,
        width,
        height,
    }))
}

fn passthrough(image: &UploadedImage) -> PreparedImage {
    let mime_type = image
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| sniff_mime(&image.bytes).to_string());

    PreparedImage {
        bytes: image.bytes.clone(),
        mime_type,
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => FALLBACK_MIME,
    }
}
