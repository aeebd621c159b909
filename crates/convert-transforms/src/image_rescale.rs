//! ImageRescale transform: shrinks images to the quality's pixel budget and
//! recompresses JPEGs at the quality's JPEG setting.
//!
//! Uses rayon for parallel processing across images and fast_image_resize
//! for SIMD-accelerated resizing (SSE4.1, AVX2 on x86; NEON on ARM).

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;

use convert_core::document::{Document, ImageBlock, ImageFormat};
use convert_core::error::{ConvertError, Result};
use convert_core::options::ConversionOptions;
use convert_core::plugin::Transform;

/// Downscales images whose longest edge exceeds
/// [`Quality::max_image_edge`](convert_core::options::Quality::max_image_edge)
/// and re-encodes JPEGs at
/// [`Quality::jpeg_quality`](convert_core::options::Quality::jpeg_quality).
/// `high` quality leaves images untouched.
pub struct ImageRescale;

impl Transform for ImageRescale {
    fn name(&self) -> &str {
        "ImageRescale"
    }

    fn should_run(&self, options: &ConversionOptions) -> bool {
        options.extract_images
    }

    fn apply(&self, doc: &mut Document, options: &ConversionOptions) -> Result<()> {
        let Some(max_edge) = options.quality.max_image_edge() else {
            log::debug!("Quality {} keeps images at full size", options.quality);
            return Ok(());
        };
        let jpeg_quality = options.quality.jpeg_quality();

        let mut images = doc.images_mut();
        if images.is_empty() {
            log::info!("No images to rescale");
            return Ok(());
        }

        log::info!(
            "Processing {} images in parallel (max edge {}px)",
            images.len(),
            max_edge
        );

        let rescaled_count: usize = images
            .par_iter_mut()
            .map(|image| match rescale_image(image, max_edge, jpeg_quality) {
                Ok(Some(rescaled)) => {
                    **image = rescaled;
                    1
                }
                Ok(None) => 0,
                Err(e) => {
                    log::warn!("{}; keeping original image", e);
                    0
                }
            })
            .sum();

        log::info!("Re-encoded {} images", rescaled_count);
        Ok(())
    }
}

/// Shrink an image whose longest edge exceeds `max_edge` and re-encode
/// JPEGs at `jpeg_quality`. Returns `Ok(None)` when the image is kept as is;
/// a re-encoded JPEG that is not resized is only kept if it got smaller.
fn rescale_image(block: &ImageBlock, max_edge: u32, jpeg_quality: u8) -> Result<Option<ImageBlock>> {
    let is_jpeg = block.format == ImageFormat::Jpeg;
    if block.pixel_width.max(block.pixel_height) <= max_edge && !is_jpeg {
        return Ok(None);
    }

    let decoded = image::load_from_memory(&block.data).map_err(|e| {
        ConvertError::Image(format!("Failed to decode {} image: {}", block.format.extension(), e))
    })?;
    let (w, h) = (decoded.width(), decoded.height());
    let oversized = w.max(h) > max_edge;
    if !oversized && !is_jpeg {
        return Ok(None);
    }

    let (new_w, new_h) = if oversized {
        fit_dimensions(w, h, max_edge)
    } else {
        (w, h)
    };
    let output = if oversized {
        resize(decoded, block.format, new_w, new_h)
    } else {
        decoded
    };

    let data = encode(&output, block.format, jpeg_quality)
        .map_err(|e| ConvertError::Image(format!("Failed to encode image: {}", e)))?;
    if !oversized && data.len() >= block.data.len() {
        log::debug!(
            "Re-encoding {}x{} JPEG at quality {} saves nothing; keeping original",
            w,
            h,
            jpeg_quality
        );
        return Ok(None);
    }

    log::debug!(
        "Re-encoded image {}x{} -> {}x{} ({} -> {} bytes)",
        w,
        h,
        new_w,
        new_h,
        block.data.len(),
        data.len()
    );
    Ok(Some(ImageBlock {
        data,
        pixel_width: new_w,
        pixel_height: new_h,
        ..block.clone()
    }))
}

fn resize(decoded: DynamicImage, format: ImageFormat, new_w: u32, new_h: u32) -> DynamicImage {
    use fast_image_resize::images::Image;
    use fast_image_resize::{IntoImageView, Resizer};

    // Reduce to the three buffer layouts we can rebuild after resizing;
    // JPEG output never carries alpha.
    let src = if matches!(decoded, DynamicImage::ImageLuma8(_)) {
        decoded
    } else if format == ImageFormat::Png && decoded.color().has_alpha() {
        DynamicImage::ImageRgba8(decoded.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };

    let resized = match src.pixel_type() {
        Some(pixel_type) => {
            let mut dst = Image::new(new_w, new_h, pixel_type);
            let mut resizer = Resizer::new();
            match resizer.resize(&src, &mut dst, None) {
                Ok(()) => rebuild(&src, new_w, new_h, dst.into_vec()),
                Err(e) => {
                    log::warn!(
                        "fast_image_resize failed ({}x{} -> {}x{}): {}, falling back",
                        src.width(),
                        src.height(),
                        new_w,
                        new_h,
                        e
                    );
                    None
                }
            }
        }
        None => None,
    };
    resized.unwrap_or_else(|| src.resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3))
}

/// Wrap a resized pixel buffer in the same layout as `src`.
fn rebuild(src: &DynamicImage, width: u32, height: u32, raw: Vec<u8>) -> Option<DynamicImage> {
    match src {
        DynamicImage::ImageLuma8(_) => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        DynamicImage::ImageRgba8(_) => RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
        _ => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
    }
}

fn encode(image: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality))?;
        }
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }
    Ok(buf)
}

/// Scale `w`x`h` so the longer side equals `max_edge`, preserving aspect ratio.
fn fit_dimensions(w: u32, h: u32, max_edge: u32) -> (u32, u32) {
    let ratio = max_edge as f64 / w.max(h) as f64;
    let new_w = (w as f64 * ratio).round() as u32;
    let new_h = (h as f64 * ratio).round() as u32;
    (new_w.max(1), new_h.max(1))
}
