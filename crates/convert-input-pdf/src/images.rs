//! Image XObject extraction.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage};
use log::{debug, warn};
use lopdf::{Dictionary, Document, Object, Stream};

use convert_core::document::{ImageBlock, ImageFormat};

use crate::content::{number, resolve, resolve_dict, ImagePlacement};

/// Images with either side below this many pixels are decoration.
pub const MIN_IMAGE_PIXELS: u32 = 4;

/// Turn one drawn image XObject into an image block, or `None` when its
/// encoding is not supported.
pub fn extract_image(doc: &Document, placement: &ImagePlacement) -> Option<ImageBlock> {
    let id = placement.object_id;
    let stream = match doc.get_object(id).and_then(Object::as_stream) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Image {:?} is not a stream: {}", id, e);
            return None;
        }
    };
    let dict = &stream.dict;

    let width = dict_u32(doc, dict, b"Width")?;
    let height = dict_u32(doc, dict, b"Height")?;
    if width < MIN_IMAGE_PIXELS || height < MIN_IMAGE_PIXELS {
        debug!("Skipping {}x{} image {:?}", width, height, id);
        return None;
    }
    if is_image_mask(doc, dict) {
        debug!("Skipping stencil mask {:?}", id);
        return None;
    }

    let filters = filters(doc, dict);
    let (data, format) = match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => (stream.content.clone(), ImageFormat::Jpeg),
        Some(b"DCTDecode") | Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            debug!(
                "Skipping image {:?} with unsupported filter chain {:?}",
                id,
                filters
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
            );
            return None;
        }
        _ => (raster_to_png(doc, stream, width, height)?, ImageFormat::Png),
    };

    let (display_width, display_height) = if placement.width >= 1.0 && placement.height >= 1.0 {
        (placement.width, placement.height)
    } else {
        // Unknown placement: assume 96 dpi.
        (width as f64 * 0.75, height as f64 * 0.75)
    };

    Some(ImageBlock {
        data,
        format,
        pixel_width: width,
        pixel_height: height,
        display_width,
        display_height,
    })
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok().map(|o| resolve(doc, o)).and_then(number)?;
    if value > 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn is_image_mask(doc: &Document, dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"ImageMask").ok().map(|o| resolve(doc, o)),
        Some(Object::Boolean(true))
    )
}

/// The stream's filter names in application order.
fn filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok())
            .map(|n| n.to_vec())
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components for the spaces that map directly onto
/// `image` buffers.
fn components(doc: &Document, color_space: &Object) -> Option<u32> {
    match resolve(doc, color_space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceGray" | b"CalGray" => Some(1),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| resolve(doc, o).as_name().ok())?;
            match family {
                b"ICCBased" => {
                    let profile = items.get(1).map(|o| resolve(doc, o))?.as_stream().ok()?;
                    match profile.dict.get(b"N").ok().and_then(number) {
                        Some(n) if n == 3.0 => Some(3),
                        Some(n) if n == 1.0 => Some(1),
                        _ => None,
                    }
                }
                b"CalRGB" => Some(3),
                b"CalGray" => Some(1),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Re-encode an 8-bit RGB or grayscale raster as PNG.
fn raster_to_png(doc: &Document, stream: &Stream, width: u32, height: u32) -> Option<Vec<u8>> {
    let dict = &stream.dict;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(number)
        .unwrap_or(8.0);
    if bits != 8.0 {
        debug!("Skipping {}-bit image", bits);
        return None;
    }
    let Some(channels) = dict.get(b"ColorSpace").ok().and_then(|cs| components(doc, cs)) else {
        debug!("Skipping image with unsupported colour space");
        return None;
    };
    if dict.has(b"SMask") {
        debug!("Image has a soft mask; transparency is dropped");
    }

    let mut raw = if dict.has(b"Filter") {
        match stream.decompressed_content() {
            Ok(data) => data,
            Err(e) => {
                warn!("Cannot decompress image data: {}", e);
                return None;
            }
        }
    } else {
        stream.content.clone()
    };

    let Some(expected) = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels as usize))
    else {
        warn!("Image dimensions {}x{}x{} are out of range", width, height, channels);
        return None;
    };
    if raw.len() < expected {
        warn!(
            "Image data too short: {} bytes for {}x{}x{}",
            raw.len(),
            width,
            height,
            channels
        );
        return None;
    }
    raw.truncate(expected);

    let image = match channels {
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw)?),
        _ => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, raw)?),
    };
    let mut out = Cursor::new(Vec::new());
    if let Err(e) = image.write_to(&mut out, image::ImageFormat::Png) {
        warn!("PNG encoding failed: {}", e);
        return None;
    }
    Some(out.into_inner())
}

/// Whether a page's resources list an image XObject.
pub fn page_has_images(doc: &Document, resources: Option<&Dictionary>) -> bool {
    let Some(xobjects) = resources
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|o| resolve_dict(doc, o))
    else {
        return false;
    };
    xobjects.iter().any(|(_, obj)| {
        resolve(doc, obj)
            .as_stream()
            .ok()
            .and_then(|s| s.dict.get(b"Subtype").ok())
            .and_then(|o| o.as_name().ok())
            == Some(b"Image".as_slice())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{image_xobject_stream, jpeg_xobject_stream, TestPdf};
    use lopdf::{dictionary, ObjectId};

    fn placement(id: ObjectId) -> ImagePlacement {
        ImagePlacement {
            object_id: id,
            x: 10.0,
            top: 10.0,
            width: 120.0,
            height: 60.0,
        }
    }

    fn tiny_jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(16, 8, image::Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_jpeg_passed_through() {
        let jpeg = tiny_jpeg();
        let mut pdf = TestPdf::new();
        let id = pdf.add_object(jpeg_xobject_stream(16, 8, jpeg.clone()));
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        let block = extract_image(&doc, &placement(id)).unwrap();
        assert_eq!(block.format, ImageFormat::Jpeg);
        assert_eq!(block.data, jpeg);
        assert_eq!((block.pixel_width, block.pixel_height), (16, 8));
        assert_eq!((block.display_width, block.display_height), (120.0, 60.0));
    }

    #[test]
    fn test_raw_rgb_reencoded_as_png() {
        let mut pdf = TestPdf::new();
        let id = pdf.add_object(image_xobject_stream(6, 5, "DeviceRGB", vec![7; 6 * 5 * 3]));
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        let block = extract_image(&doc, &placement(id)).unwrap();
        assert_eq!(block.format, ImageFormat::Png);
        let decoded = image::load_from_memory(&block.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 5));
    }

    #[test]
    fn test_icc_based_gray() {
        let mut pdf = TestPdf::new();
        let profile = pdf.add_object(Stream::new(dictionary! { "N" => 1 }, vec![]));
        let mut stream = image_xobject_stream(4, 4, "DeviceGray", vec![255; 16]);
        stream.dict.set(
            "ColorSpace",
            vec![Object::Name(b"ICCBased".to_vec()), profile.into()],
        );
        let id = pdf.add_object(stream);
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        let block = extract_image(&doc, &placement(id)).unwrap();
        assert_eq!(block.format, ImageFormat::Png);
    }

    #[test]
    fn test_unsupported_images_skipped() {
        let mut pdf = TestPdf::new();
        let tiny = pdf.add_object(image_xobject_stream(2, 2, "DeviceRGB", vec![0; 12]));
        let cmyk = pdf.add_object(image_xobject_stream(8, 8, "DeviceCMYK", vec![0; 256]));
        let mut jpx = image_xobject_stream(8, 8, "DeviceRGB", vec![0; 10]);
        jpx.dict.set("Filter", "JPXDecode");
        let jpx = pdf.add_object(jpx);
        let short = pdf.add_object(image_xobject_stream(8, 8, "DeviceRGB", vec![0; 10]));
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        for id in [tiny, cmyk, jpx, short] {
            assert!(extract_image(&doc, &placement(id)).is_none(), "{:?}", id);
        }
    }

    #[test]
    fn test_oversized_dimensions_skipped() {
        let mut pdf = TestPdf::new();
        let huge = pdf.add_object(image_xobject_stream(
            4_000_000_000,
            4_000_000_000,
            "DeviceRGB",
            vec![0; 48],
        ));
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        assert!(extract_image(&doc, &placement(huge)).is_none());
    }

    #[test]
    fn test_missing_placement_size_falls_back_to_pixels() {
        let mut pdf = TestPdf::new();
        let id = pdf.add_object(image_xobject_stream(40, 20, "DeviceGray", vec![0; 800]));
        pdf.page(vec![]);
        let (doc, _) = pdf.build();

        let mut p = placement(id);
        p.width = 0.0;
        let block = extract_image(&doc, &p).unwrap();
        assert_eq!((block.display_width, block.display_height), (30.0, 15.0));
    }
}
