//! Watermark sizing, placement and alpha blending.

use image::{RgbaImage, imageops};
use serde::Deserialize;

/// Padding between a corner-placed watermark and the canvas edge, as a
/// fraction of output width.
const EDGE_PADDING_RATIO: f32 = 0.03;

/// Where the watermark lands on the output canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    Center,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Operator-configured watermark.
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkSpec {
    /// Master switch; enabled with no image behaves as disabled.
    pub enabled: bool,
    /// Encoded watermark image bytes, if one is configured.
    #[serde(default, with = "base64_bytes")]
    pub image: Option<Vec<u8>>,
    /// Blend opacity in [0, 1].
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Watermark width as a fraction of output width, in (0, 1].
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub position: WatermarkPosition,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            opacity: default_opacity(),
            scale: default_scale(),
            position: WatermarkPosition::default(),
        }
    }
}

const fn default_opacity() -> f32 {
    0.8
}

const fn default_scale() -> f32 {
    0.2
}

/// Resolved watermark geometry on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkLayout {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Compute the watermark's size and placement.
///
/// Width is `out_width * scale`, height preserves the watermark's native
/// aspect ratio, and corner placements are inset by 3% of output width.
#[must_use]
pub fn watermark_layout(
    out_width: u32,
    out_height: u32,
    native_width: u32,
    native_height: u32,
    scale: f32,
    position: WatermarkPosition,
) -> WatermarkLayout {
    let out_w = out_width as f32;
    let out_h = out_height as f32;

    let width = (out_w * scale).round().max(1.0);
    let aspect = native_height as f32 / native_width.max(1) as f32;
    let height = (width * aspect).round().max(1.0);
    let padding = (out_w * EDGE_PADDING_RATIO).round();

    let (x, y) = match position {
        WatermarkPosition::TopLeft => (padding, padding),
        WatermarkPosition::TopRight => (out_w - width - padding, padding),
        WatermarkPosition::Center => ((out_w - width) / 2.0, (out_h - height) / 2.0),
        WatermarkPosition::BottomLeft => (padding, out_h - height - padding),
        WatermarkPosition::BottomRight => (out_w - width - padding, out_h - height - padding),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let layout = WatermarkLayout {
        x: x.round() as i64,
        y: y.round() as i64,
        width: width as u32,
        height: height as u32,
    };
    layout
}

/// Resize the watermark to its configured layout and alpha-blend it onto
/// the canvas at the configured opacity.
pub fn apply(canvas: &mut RgbaImage, watermark: &RgbaImage, spec: &WatermarkSpec) {
    let (out_w, out_h) = canvas.dimensions();
    let (wm_w, wm_h) = watermark.dimensions();

    let layout = watermark_layout(out_w, out_h, wm_w, wm_h, spec.scale, spec.position);
    let resized = imageops::resize(
        watermark,
        layout.width,
        layout.height,
        imageops::FilterType::Triangle,
    );

    let opacity = spec.opacity.clamp(0.0, 1.0);

    for (wx, wy, wm_pixel) in resized.enumerate_pixels() {
        let cx = layout.x + i64::from(wx);
        let cy = layout.y + i64::from(wy);
        if cx < 0 || cy < 0 || cx >= i64::from(out_w) || cy >= i64::from(out_h) {
            continue;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);

        let alpha = f32::from(wm_pixel.0[3]) / 255.0 * opacity;
        for channel in 0..3 {
            let blended = f32::from(wm_pixel.0[channel]).mul_add(
                alpha,
                f32::from(dst.0[channel]) * (1.0 - alpha),
            );
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                dst.0[channel] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
        let out_alpha = alpha.mul_add(255.0, f32::from(dst.0[3]) * (1.0 - alpha));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            dst.0[3] = out_alpha.round().clamp(0.0, 255.0) as u8;
        }
    }
}

mod base64_bytes {
    //! Watermark bytes arrive from the client as base64 (optionally as a
    //! data URL).

    use base64::Engine as _;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            None => Ok(None),
            Some(s) => {
                let payload = s.rsplit_once(',').map_or(s.as_str(), |(_, data)| data);
                base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_determines_width_and_aspect_determines_height() {
        // 0.2 scale on a 1000px-wide output -> exactly 200px wide
        let layout = watermark_layout(1000, 1500, 400, 200, 0.2, WatermarkPosition::TopLeft);
        assert_eq!(layout.width, 200);
        // native aspect 200/400 preserved
        assert_eq!(layout.height, 100);
    }

    #[test]
    fn bottom_right_edges_sit_at_padding_from_the_corner() {
        let layout = watermark_layout(1000, 1500, 100, 100, 0.2, WatermarkPosition::BottomRight);
        let padding = 30; // 3% of 1000

        assert_eq!(layout.x + i64::from(layout.width), 1000 - padding);
        assert_eq!(layout.y + i64::from(layout.height), 1500 - padding);
    }

    #[test]
    fn center_placement_centers_both_axes() {
        let layout = watermark_layout(1000, 500, 100, 100, 0.2, WatermarkPosition::Center);
        assert_eq!(layout.x, 400);
        assert_eq!(layout.y, 150);
    }

    #[test]
    fn top_left_is_inset_by_padding() {
        let layout = watermark_layout(200, 200, 50, 50, 0.25, WatermarkPosition::TopLeft);
        assert_eq!((layout.x, layout.y), (6, 6));
    }

    #[test]
    fn opacity_zero_leaves_canvas_untouched() {
        let mut canvas = RgbaImage::from_pixel(100, 100, image::Rgba([50, 60, 70, 255]));
        let wm = RgbaImage::from_pixel(10, 10, image::Rgba([255, 255, 255, 255]));
        let spec = WatermarkSpec {
            enabled: true,
            image: None,
            opacity: 0.0,
            scale: 0.2,
            position: WatermarkPosition::TopLeft,
        };

        apply(&mut canvas, &wm, &spec);

        assert_eq!(canvas.get_pixel(5, 5).0, [50, 60, 70, 255]);
    }

    #[test]
    fn partial_config_falls_back_to_default_opacity_and_scale() {
        let spec: WatermarkSpec =
            serde_json::from_str(r#"{"enabled": true}"#).expect("deserialize");

        assert!(spec.enabled);
        assert_eq!(spec.image, None);
        assert!((spec.opacity - 0.8).abs() < f32::EPSILON);
        assert!((spec.scale - 0.2).abs() < f32::EPSILON);
        assert_eq!(spec.position, WatermarkPosition::BottomRight);
    }

    #[test]
    fn data_url_watermark_bytes_deserialize() {
        let json = r#"{
            "enabled": true,
            "image": "data:image/png;base64,aGVsbG8=",
            "opacity": 0.8,
            "scale": 0.2,
            "position": "bottom-left"
        }"#;

        let spec: WatermarkSpec = serde_json::from_str(json).expect("deserialize");
        assert_eq!(spec.image.as_deref(), Some(b"hello".as_slice()));
        assert_eq!(spec.position, WatermarkPosition::BottomLeft);
    }
}
