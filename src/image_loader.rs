//! # Images
//!
//! Two jobs: tell layout how big an image is, and hand the PDF sink bytes it
//! can embed. Layout never sees an error from here; an image that cannot be
//! read or decoded is treated as 50mm × 30mm.
//!
//! JPEG data is embedded as-is (DCTDecode). PNG is decoded to RGB with a
//! separate alpha channel for an SMask.

use crate::error::FolioError;
use crate::model::{PT_PER_MM, PT_PER_PX};
use log::debug;
use std::io::Cursor;

/// Intrinsic size of an image, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

/// Size used whenever an image cannot be measured.
pub const FALLBACK_SIZE: ImageSize = ImageSize {
    width: 50.0 * PT_PER_MM,
    height: 30.0 * PT_PER_MM,
};

/// Looks up intrinsic image sizes for layout.
pub trait ImageResolver {
    /// Never fails: unreadable images report [`FALLBACK_SIZE`].
    fn intrinsic_size(&self, path: &str) -> ImageSize;
}

/// Reads images from disk or `data:` URIs and measures them at 96 dpi.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageResolver;

impl ImageResolver for FileImageResolver {
    fn intrinsic_size(&self, path: &str) -> ImageSize {
        let measured = read_source_bytes(path).and_then(|bytes| pixel_dimensions(&bytes));
        match measured {
            Ok((w, h)) if w > 0 && h > 0 => ImageSize {
                width: w as f64 * PT_PER_PX,
                height: h as f64 * PT_PER_PX,
            },
            Ok(_) => FALLBACK_SIZE,
            Err(e) => {
                debug!("using fallback size for image {}: {}", short(path), e);
                FALLBACK_SIZE
            }
        }
    }
}

fn short(path: &str) -> &str {
    match path.char_indices().nth(60) {
        Some((i, _)) => &path[..i],
        None => path,
    }
}

fn pixel_dimensions(bytes: &[u8]) -> Result<(u32, u32), FolioError> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FolioError::Image(format!("format detection failed: {}", e)))?
        .into_dimensions()
        .map_err(|e| FolioError::Image(format!("cannot read dimensions: {}", e)))
}

/// A decoded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes for DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// RGB triples, plus one alpha byte per pixel when any pixel is translucent.
    Decoded { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Load an image for embedding from a file path or a `data:` URI.
pub fn load_image(src: &str) -> Result<LoadedImage, FolioError> {
    let bytes = read_source_bytes(src)?;
    decode_image_bytes(&bytes)
}

fn read_source_bytes(src: &str) -> Result<Vec<u8>, FolioError> {
    if let Some(rest) = src.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FolioError::Image("data URI without a comma".to_string()))?;
        if !header.ends_with(";base64") {
            return Ok(payload.as_bytes().to_vec());
        }
        use base64::Engine;
        return base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| FolioError::Image(format!("bad base64 payload: {}", e)));
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Err(FolioError::Image("remote images are not fetched".to_string()));
    }
    Ok(std::fs::read(src)?)
}

fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, FolioError> {
    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(FolioError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, FolioError> {
    let (width_px, height_px) = pixel_dimensions(data)?;
    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: jpeg_color_space(data),
        },
        width_px,
        height_px,
    })
}

/// Walk the marker segments to the first start-of-frame and read its
/// component count.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            return match data.get(i + 9) {
                Some(1) => JpegColorSpace::DeviceGray,
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        let segment = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + segment;
    }
    JpegColorSpace::DeviceRGB
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, FolioError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| FolioError::Image(format!("cannot decode PNG: {}", e)))?;
    let rgba = img.to_rgba8();
    let (width_px, height_px) = rgba.dimensions();

    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    let mut alpha = Vec::with_capacity(rgba.as_raw().len() / 4);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let translucent = alpha.iter().any(|&a| a != 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: translucent.then_some(alpha),
        },
        width_px,
        height_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, alpha]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn measures_png_at_96_dpi() {
        let size = FileImageResolver.intrinsic_size(&data_uri(&png(40, 20, 255)));
        assert!((size.width - 30.0).abs() < 0.01);
        assert!((size.height - 15.0).abs() < 0.01);
    }

    #[test]
    fn unreadable_images_fall_back() {
        assert_eq!(
            FileImageResolver.intrinsic_size("/definitely/not/here.png"),
            FALLBACK_SIZE
        );
        assert_eq!(
            FileImageResolver.intrinsic_size("data:image/png;base64,!!!"),
            FALLBACK_SIZE
        );
        assert_eq!(
            FileImageResolver.intrinsic_size("https://example.com/a.png"),
            FALLBACK_SIZE
        );
        assert!((FALLBACK_SIZE.width - 141.73).abs() < 0.01);
    }

    #[test]
    fn magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0xFF]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
        assert!(decode_image_bytes(&[0, 1, 2, 3, 4]).is_err());
    }

    #[test]
    fn png_alpha_is_split_out() {
        let opaque = load_image(&data_uri(&png(1, 1, 255))).unwrap();
        match opaque.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, vec![255, 0, 0]);
                assert!(alpha.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        let translucent = load_image(&data_uri(&png(1, 1, 128))).unwrap();
        match translucent.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert_eq!(alpha, Some(vec![128])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn jpeg_passes_through() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();
        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(color_space, JpegColorSpace::DeviceRGB);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn data_uri_without_comma_is_an_error() {
        assert!(matches!(
            load_image("data:image/png;base64"),
            Err(FolioError::Image(_))
        ));
    }
}
