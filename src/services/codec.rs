// src/services/codec.rs
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage, imageops};

use crate::errors::StudioError;
use crate::models::EncodedImage;

const MAX_DIMENSION: u32 = 4096;
const JPEG_QUALITY: u8 = 90;

pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Validates uploaded bytes and tags them with their detected MIME type.
    /// The payload is kept as-is; decoding only establishes that it is a
    /// usable raster image within the dimension cap.
    pub fn encode(&self, data: &[u8]) -> Result<EncodedImage, StudioError> {
        let format = image::guess_format(data)
            .map_err(|e| StudioError::Decode(format!("unrecognized image format: {}", e)))?;

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| StudioError::Decode(format!("invalid image data: {}", e)))?;

        let (width, height) = img.dimensions();
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(StudioError::Decode(format!(
                "image dimensions {}x{} exceed {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(EncodedImage {
            mime_type: mime_for(format).to_string(),
            data: data.to_vec(),
        })
    }

    /// Scales the source to cover the target surface, center-crops the
    /// overflow, and applies brightness/contrast as percentage multipliers
    /// (100 = identity). The canvas is filled opaque white first, so
    /// transparent source regions resolve to white. Output is JPEG at
    /// quality 90, exactly `target_w x target_h`.
    ///
    /// If the target surface cannot be built (a zero dimension), the source
    /// is returned unchanged instead of failing the run.
    pub fn composite_and_crop(
        &self,
        source: &EncodedImage,
        target_w: u32,
        target_h: u32,
        brightness: u16,
        contrast: u16,
    ) -> Result<EncodedImage, StudioError> {
        if target_w == 0 || target_h == 0 {
            return Ok(source.clone());
        }

        let img = image::load_from_memory(&source.data)
            .map_err(|e| StudioError::Decode(format!("invalid image data: {}", e)))?;
        let (source_w, source_h) = img.dimensions();

        let source_aspect = source_w as f64 / source_h as f64;
        let target_aspect = target_w as f64 / target_h as f64;

        // Cover the target: the wider side overflows and is cropped evenly
        // from both edges.
        let (draw_w, draw_h) = if source_aspect > target_aspect {
            (
                ((target_h as f64) * source_aspect).round() as u32,
                target_h,
            )
        } else {
            (
                target_w,
                ((target_w as f64) / source_aspect).round() as u32,
            )
        };
        let offset_x = (target_w as i64 - draw_w as i64) / 2;
        let offset_y = (target_h as i64 - draw_h as i64) / 2;

        let mut rgba = img.to_rgba8();
        apply_filters(&mut rgba, brightness, contrast);

        let scaled = if (rgba.width(), rgba.height()) == (draw_w, draw_h) {
            rgba
        } else {
            imageops::resize(&rgba, draw_w, draw_h, imageops::FilterType::Lanczos3)
        };

        let mut canvas = RgbaImage::from_pixel(target_w, target_h, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &scaled, offset_x, offset_y);

        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut output = Vec::new();
        let mut encoder =
            JpegEncoder::new_with_quality(std::io::Cursor::new(&mut output), JPEG_QUALITY);
        encoder
            .encode_image(&rgb)
            .map_err(|e| StudioError::Decode(format!("failed to encode composite: {}", e)))?;

        Ok(EncodedImage {
            mime_type: "image/jpeg".to_string(),
            data: output,
        })
    }
}

/// CSS-filter semantics per normalized channel: `v * brightness`, then
/// `(v - 0.5) * contrast + 0.5`, clamped. Alpha is untouched.
fn apply_filters(img: &mut RgbaImage, brightness: u16, contrast: u16) {
    if brightness == 100 && contrast == 100 {
        return;
    }
    let b = brightness as f32 / 100.0;
    let c = contrast as f32 / 100.0;
    for pixel in img.pixels_mut() {
        for channel in 0..3 {
            let v = pixel[channel] as f32 / 255.0;
            let v = (v * b - 0.5) * c + 0.5;
            pixel[channel] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_image(w: u32, h: u32, color: [u8; 4]) -> EncodedImage {
        let img = RgbaImage::from_pixel(w, h, Rgba(color));
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        EncodedImage {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    fn decode(image: &EncodedImage) -> DynamicImage {
        image::load_from_memory(&image.data).unwrap()
    }

    #[test]
    fn encode_detects_format_and_keeps_bytes() {
        let codec = ImageCodec::new();
        let source = png_image(10, 10, [10, 20, 30, 255]);
        let encoded = codec.encode(&source.data).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(encoded.data, source.data);
    }

    #[test]
    fn encode_rejects_garbage() {
        let codec = ImageCodec::new();
        let err = codec.encode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StudioError::Decode(_)));
    }

    #[test]
    fn composite_output_dimensions_match_target_exactly() {
        let codec = ImageCodec::new();
        for (sw, sh, tw, th) in [
            (2000, 1000, 1080, 1080),
            (1000, 2000, 1080, 1350),
            (333, 777, 1080, 608),
            (50, 50, 200, 113),
        ] {
            let source = png_image(sw, sh, [120, 140, 160, 255]);
            let out = codec.composite_and_crop(&source, tw, th, 100, 100).unwrap();
            assert_eq!(out.mime_type, "image/jpeg");
            assert_eq!(decode(&out).dimensions(), (tw, th));
        }
    }

    #[test]
    fn wide_source_is_center_cropped() {
        // 2000x1000 into 1080x1080: drawn at 2160x1080, 540 cropped from
        // each side. The visible window covers source x in [500, 1500], so
        // a left-half/right-half split lands at output x = 540.
        let left = Rgba([200u8, 30, 30, 255]);
        let right = Rgba([30u8, 30, 200, 255]);
        let mut img = RgbaImage::from_pixel(2000, 1000, left);
        for y in 0..1000 {
            for x in 1000..2000 {
                img.put_pixel(x, y, right);
            }
        }
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        let source = EncodedImage {
            mime_type: "image/png".to_string(),
            data,
        };

        let codec = ImageCodec::new();
        let out = codec
            .composite_and_crop(&source, 1080, 1080, 100, 100)
            .unwrap();
        let out = decode(&out).to_rgb8();
        assert_eq!(out.dimensions(), (1080, 1080));

        // Deep inside each half, away from the resampled seam.
        let left_px = out.get_pixel(100, 540);
        assert!(left_px[0] > 150 && left_px[2] < 80, "left half should be red");
        let right_px = out.get_pixel(980, 540);
        assert!(right_px[2] > 150 && right_px[0] < 80, "right half should be blue");
    }

    #[test]
    fn transparent_source_resolves_to_white() {
        let codec = ImageCodec::new();
        let source = png_image(400, 400, [0, 0, 0, 0]);
        let out = codec
            .composite_and_crop(&source, 200, 200, 100, 100)
            .unwrap();
        let out = decode(&out).to_rgb8();
        let px = out.get_pixel(100, 100);
        assert!(px[0] > 250 && px[1] > 250 && px[2] > 250);
    }

    #[test]
    fn identity_filters_on_target_sized_image_round_trip() {
        let codec = ImageCodec::new();
        let source = png_image(300, 300, [90, 120, 150, 255]);
        let out = codec
            .composite_and_crop(&source, 300, 300, 100, 100)
            .unwrap();
        let out = decode(&out).to_rgb8();
        let px = out.get_pixel(150, 150);
        // Up to JPEG re-encoding loss only.
        assert!((px[0] as i32 - 90).abs() <= 3);
        assert!((px[1] as i32 - 120).abs() <= 3);
        assert!((px[2] as i32 - 150).abs() <= 3);
    }

    #[test]
    fn brightness_scales_channels() {
        let codec = ImageCodec::new();
        let source = png_image(100, 100, [100, 100, 100, 255]);
        let out = codec
            .composite_and_crop(&source, 100, 100, 150, 100)
            .unwrap();
        let px = decode(&out).to_rgb8().get_pixel(50, 50).0;
        assert!((px[0] as i32 - 150).abs() <= 4, "got {}", px[0]);
    }

    #[test]
    fn contrast_pushes_values_from_midpoint() {
        let codec = ImageCodec::new();

        // Below the midpoint: contrast 150% darkens.
        let dark = png_image(100, 100, [100, 100, 100, 255]);
        let out = codec.composite_and_crop(&dark, 100, 100, 100, 150).unwrap();
        let px = decode(&out).to_rgb8().get_pixel(50, 50).0;
        assert!((px[0] as i32 - 86).abs() <= 4, "got {}", px[0]);

        // Above the midpoint: the same contrast brightens.
        let bright = png_image(100, 100, [200, 200, 200, 255]);
        let out = codec
            .composite_and_crop(&bright, 100, 100, 100, 150)
            .unwrap();
        let px = decode(&out).to_rgb8().get_pixel(50, 50).0;
        assert!((px[0] as i32 - 236).abs() <= 4, "got {}", px[0]);
    }

    #[test]
    fn zero_target_surface_returns_source_unchanged() {
        let codec = ImageCodec::new();
        let source = png_image(40, 40, [1, 2, 3, 255]);
        let out = codec.composite_and_crop(&source, 0, 100, 100, 100).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn composite_rejects_undecodable_source() {
        let codec = ImageCodec::new();
        let source = EncodedImage {
            mime_type: "image/png".to_string(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };
        assert!(
            codec
                .composite_and_crop(&source, 100, 100, 100, 100)
                .is_err()
        );
    }
}
