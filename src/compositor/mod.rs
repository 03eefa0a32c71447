//! Image compositing pipeline.
//!
//! Reproduces the crop flow the operator sees in the admin UI: decode the
//! source image, rotate/flip it around its own center, extract the crop
//! rectangle (expressed in rotated-bounding-box coordinates), composite an
//! optional watermark, and encode the result as a single JPEG.
//!
//! Pure with respect to I/O: inputs are byte slices, output is encoded
//! bytes. Either a complete image comes back or an error; never a partial
//! result.

mod watermark;

pub use watermark::{WatermarkPosition, WatermarkSpec, watermark_layout};

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

/// Compositing errors.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("crop rectangle has zero area")]
    EmptyCrop,
}

/// Pixel-space crop rectangle, relative to the rotated bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Mirror flags applied together with rotation, around the image center.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct Flip {
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub vertical: bool,
}

/// Bounding box of a w x h rectangle after rotation by `degrees`.
#[must_use]
pub fn rotated_bounding_box(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let rad = degrees.to_radians();
    let (w, h) = (f64::from(width), f64::from(height));
    let bw = (rad.cos().abs() * w + rad.sin().abs() * h).round();
    let bh = (rad.sin().abs() * w + rad.cos().abs() * h).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bounds = (bw.max(1.0) as u32, bh.max(1.0) as u32);
    bounds
}

/// Produce the final encoded image.
///
/// `source` and the watermark image (when supplied) are decoded here;
/// rotation is in degrees, the crop rectangle is relative to the rotated
/// bounding box. Out-of-bounds crop area stays transparent and is
/// flattened by the JPEG encode, so output dimensions always equal the
/// crop rectangle exactly.
///
/// # Errors
///
/// Returns `CompositorError::Decode` if the source or watermark bytes are
/// not a decodable image, `EmptyCrop` for a degenerate rectangle, and
/// `Encode` if JPEG serialization fails.
pub fn composite(
    source: &[u8],
    crop: CropRect,
    rotation_degrees: f64,
    flip: Flip,
    watermark: Option<&WatermarkSpec>,
) -> Result<Vec<u8>, CompositorError> {
    if crop.width == 0 || crop.height == 0 {
        return Err(CompositorError::EmptyCrop);
    }

    let decoded = image::load_from_memory(source)
        .map_err(CompositorError::Decode)?
        .to_rgba8();

    let rotated = render_rotated(&decoded, rotation_degrees, flip);
    let mut output = extract_crop(&rotated, crop);

    if let Some(spec) = watermark {
        // Enabled with no image configured is a no-op, not an error
        if spec.enabled
            && let Some(bytes) = spec.image.as_deref()
        {
            let wm = image::load_from_memory(bytes)
                .map_err(CompositorError::Decode)?
                .to_rgba8();
            watermark::apply(&mut output, &wm, spec);
        }
    }

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(output)
        .to_rgb8()
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(CompositorError::Encode)?;

    Ok(buf.into_inner())
}

/// Render the source onto a canvas sized to the rotated bounding box,
/// rotating and flipping around the image's own center.
///
/// Implemented as an inverse mapping: each destination pixel is projected
/// back through flip then rotation into source coordinates and sampled
/// nearest-neighbor; samples outside the source stay transparent.
fn render_rotated(source: &RgbaImage, degrees: f64, flip: Flip) -> RgbaImage {
    if degrees == 0.0 && !flip.horizontal && !flip.vertical {
        return source.clone();
    }

    let (sw, sh) = source.dimensions();
    let (bw, bh) = rotated_bounding_box(sw, sh, degrees);

    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    let (box_cx, box_cy) = (f64::from(bw) / 2.0, f64::from(bh) / 2.0);
    let (src_cx, src_cy) = (f64::from(sw) / 2.0, f64::from(sh) / 2.0);

    let mut canvas = RgbaImage::from_pixel(bw, bh, Rgba([0, 0, 0, 0]));

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let u = f64::from(x) + 0.5 - box_cx;
        let v = f64::from(y) + 0.5 - box_cy;

        // Inverse rotation, then flip (a flip is its own inverse)
        let mut rx = u * cos + v * sin;
        let mut ry = -u * sin + v * cos;
        if flip.horizontal {
            rx = -rx;
        }
        if flip.vertical {
            ry = -ry;
        }

        let sx = (rx + src_cx - 0.5).round();
        let sy = (ry + src_cy - 0.5).round();

        if sx >= 0.0 && sy >= 0.0 && sx < f64::from(sw) && sy < f64::from(sh) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sample = *source.get_pixel(sx as u32, sy as u32);
            *pixel = sample;
        }
    }

    canvas
}

/// Copy the crop rectangle out of the rotated canvas into a fresh surface
/// of exactly the crop's dimensions. The copied region is clamped to the
/// canvas; anything outside it stays transparent.
fn extract_crop(canvas: &RgbaImage, crop: CropRect) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(crop.width, crop.height, Rgba([0, 0, 0, 0]));
    let (cw, ch) = canvas.dimensions();

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let src_x = crop.x + i64::from(x);
        let src_y = crop.y + i64::from(y);
        if src_x >= 0 && src_y >= 0 && src_x < i64::from(cw) && src_y < i64::from(ch) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sample = *canvas.get_pixel(src_x as u32, src_y as u32);
            *pixel = sample;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut buf, ImageFormat::Png)
            .expect("png encode");
        buf.into_inner()
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn zero_rotation_bounding_box_equals_source_dimensions() {
        assert_eq!(rotated_bounding_box(640, 480, 0.0), (640, 480));
    }

    #[test]
    fn ninety_degree_bounding_box_swaps_dimensions() {
        assert_eq!(rotated_bounding_box(640, 480, 90.0), (480, 640));
    }

    #[test]
    fn output_dimensions_match_crop_rectangle() {
        let source = encode_png(&solid(300, 450, [200, 10, 10, 255]));
        let crop = CropRect {
            x: 50,
            y: 75,
            width: 200,
            height: 300,
        };

        let jpeg = composite(&source, crop, 0.0, Flip::default(), None).expect("composite");
        let decoded = image::load_from_memory(&jpeg).expect("decode output");

        assert_eq!(decoded.width(), 200);
        assert_eq!(decoded.height(), 300);
    }

    #[test]
    fn crop_outside_canvas_still_yields_exact_dimensions() {
        let source = encode_png(&solid(100, 100, [0, 255, 0, 255]));
        let crop = CropRect {
            x: 80,
            y: 80,
            width: 60,
            height: 40,
        };

        let jpeg = composite(&source, crop, 0.0, Flip::default(), None).expect("composite");
        let decoded = image::load_from_memory(&jpeg).expect("decode output");

        assert_eq!((decoded.width(), decoded.height()), (60, 40));
    }

    #[test]
    fn horizontal_flip_mirrors_pixels() {
        let mut img = solid(4, 1, [0, 0, 0, 255]);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let flipped = render_rotated(
            &img,
            0.0,
            Flip {
                horizontal: true,
                vertical: false,
            },
        );

        assert_eq!(flipped.get_pixel(3, 0).0, [255, 0, 0, 255]);
        assert_eq!(flipped.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn quarter_turn_moves_content_into_swapped_box() {
        let img = solid(10, 20, [9, 9, 9, 255]);
        let rotated = render_rotated(&img, 90.0, Flip::default());

        assert_eq!(rotated.dimensions(), (20, 10));
        // center pixel must be opaque source content
        assert_eq!(rotated.get_pixel(10, 5).0[3], 255);
    }

    #[test]
    fn empty_crop_is_rejected() {
        let source = encode_png(&solid(10, 10, [1, 2, 3, 255]));
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        };

        assert!(matches!(
            composite(&source, crop, 0.0, Flip::default(), None),
            Err(CompositorError::EmptyCrop)
        ));
    }

    #[test]
    fn undecodable_source_is_a_decode_error() {
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };

        assert!(matches!(
            composite(b"not an image", crop, 0.0, Flip::default(), None),
            Err(CompositorError::Decode(_))
        ));
    }

    #[test]
    fn enabled_watermark_without_image_is_a_no_op() {
        let source = encode_png(&solid(100, 100, [10, 10, 200, 255]));
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let spec = WatermarkSpec {
            enabled: true,
            image: None,
            opacity: 0.8,
            scale: 0.2,
            position: WatermarkPosition::BottomRight,
        };

        let jpeg =
            composite(&source, crop, 0.0, Flip::default(), Some(&spec)).expect("composite");
        assert!(!jpeg.is_empty());
    }

    #[test]
    fn watermark_is_blended_into_the_output() {
        let source = encode_png(&solid(200, 200, [255, 255, 255, 255]));
        let wm = encode_png(&solid(50, 50, [255, 0, 0, 255]));
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 200,
            height: 200,
        };
        let spec = WatermarkSpec {
            enabled: true,
            image: Some(wm),
            opacity: 1.0,
            scale: 0.25,
            position: WatermarkPosition::TopLeft,
        };

        let jpeg =
            composite(&source, crop, 0.0, Flip::default(), Some(&spec)).expect("composite");
        let decoded = image::load_from_memory(&jpeg).expect("decode").to_rgb8();

        // padding = 6px, watermark 50x50 at (6,6): pixel inside it is red
        let inside = decoded.get_pixel(20, 20).0;
        assert!(inside[0] > 200 && inside[1] < 80 && inside[2] < 80);
        // far corner untouched
        let outside = decoded.get_pixel(190, 190).0;
        assert!(outside[0] > 200 && outside[1] > 200 && outside[2] > 200);
    }
}
