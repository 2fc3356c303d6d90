//! Per-pixel tone and color adjustment.
//!
//! Order per channel value: contrast, brightness, tone zones, channel gain,
//! clamp. Zone selection uses the value after contrast and brightness.

use panelfeed_panel_model::ColorParams;

/// Upper bound of the shadows zone (normalized).
const SHADOWS_CEILING: f64 = 0.33;

/// Lower bound of the highlights zone (normalized).
const HIGHLIGHTS_FLOOR: f64 = 0.66;

/// Adjust one channel value with the given gain.
///
/// The zone checks are independent `if`s rather than an `if/else` chain;
/// at most one fires for any finite value, but the boundaries are kept
/// exactly as the panel content was tuned against.
pub fn adjust_channel(value: u8, params: &ColorParams, gain: f64) -> u8 {
    let mut v = ((value as f64 / 255.0 - 0.5) * params.contrast + 0.5) * 255.0;
    v += params.brightness as f64;

    let n = v / 255.0;

    if n <= SHADOWS_CEILING {
        v += params.shadows as f64 * (1.0 - n * 3.0);
    }

    if n > SHADOWS_CEILING && n < HIGHLIGHTS_FLOOR {
        let mid_factor = 1.0 - (n - 0.5).abs() * 3.0;
        v += params.midtones as f64 * mid_factor;
    }

    if n >= HIGHLIGHTS_FLOOR {
        v += params.highlights as f64 * ((n - HIGHLIGHTS_FLOOR) * 3.0);
    }

    v *= gain;

    // Truncating cast after the clamp; NaN maps to 0.
    v.clamp(0.0, 255.0) as u8
}

/// Lookup tables for one parameter snapshot, one per channel.
///
/// The adjustment depends only on the input value, so a frame is adjusted
/// with three 256-entry lookups instead of per-pixel float math.
#[derive(Clone)]
pub struct ToneCurve {
    tables: [[u8; 256]; 3],
}

impl ToneCurve {
    pub fn new(params: &ColorParams) -> Self {
        let gains = params.channel_gains();
        let mut tables = [[0u8; 256]; 3];
        for (table, gain) in tables.iter_mut().zip(gains) {
            for (value, slot) in table.iter_mut().enumerate() {
                *slot = adjust_channel(value as u8, params, gain);
            }
        }
        Self { tables }
    }

    /// Adjust one value of channel `channel` (0 = R, 1 = G, 2 = B).
    #[inline]
    pub fn apply(&self, channel: usize, value: u8) -> u8 {
        self.tables[channel][value as usize]
    }

    /// Adjust packed pixels in place. Only the first three bytes of each
    /// `stride`-byte pixel are touched, so alpha survives unchanged.
    pub fn apply_in_place(&self, pixels: &mut [u8], stride: usize) {
        for px in pixels.chunks_exact_mut(stride) {
            for (channel, value) in px.iter_mut().take(3).enumerate() {
                *value = self.apply(channel, *value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> ColorParams {
        ColorParams::default()
    }

    #[test]
    fn test_identity_params_keep_values() {
        let p = params();
        for v in 0..=255u8 {
            let out = adjust_channel(v, &p, 1.0);
            assert!(v.abs_diff(out) <= 1, "value {v} became {out}");
        }
    }

    #[test]
    fn test_contrast_and_brightness_example() {
        let p = ColorParams {
            contrast: 1.5,
            brightness: 20,
            ..params()
        };
        let expected: f64 = ((100.0 / 255.0 - 0.5) * 1.5 + 0.5) * 255.0 + 20.0;
        assert_eq!(adjust_channel(100, &p, 1.0), expected.clamp(0.0, 255.0) as u8);
        assert_eq!(adjust_channel(100, &p, 1.0), 106);
    }

    #[test]
    fn test_shadows_weight_darkest_values_most() {
        let p = ColorParams {
            shadows: 30,
            ..params()
        };
        assert_eq!(adjust_channel(0, &p, 1.0), 30);
        // n = 50/255, weight ~0.41, +12.35
        assert_eq!(adjust_channel(50, &p, 1.0), 62);
        // above the shadows zone: untouched
        assert!(adjust_channel(200, &p, 1.0).abs_diff(200) <= 1);
    }

    #[test]
    fn test_midtones_peak_at_half() {
        let p = ColorParams {
            midtones: -20,
            ..params()
        };
        // 127.5 would be the exact center; 127 is within 0.002 of it.
        assert_eq!(adjust_channel(127, &p, 1.0), 107);
        assert!(adjust_channel(10, &p, 1.0).abs_diff(10) <= 1);
    }

    #[test]
    fn test_highlights_grow_toward_white() {
        let p = ColorParams {
            highlights: 50,
            ..params()
        };
        assert_eq!(adjust_channel(255, &p, 1.0), 255);
        let v = adjust_channel(220, &p, 1.0);
        assert!(v > 220, "{v}");
        assert!(adjust_channel(100, &p, 1.0).abs_diff(100) <= 1);
    }

    #[test]
    fn test_gain_scales_after_tone() {
        let p = params();
        assert_eq!(adjust_channel(201, &p, 0.5), 100);
        assert_eq!(adjust_channel(200, &p, 2.0), 255);
        assert_eq!(adjust_channel(200, &p, 0.0), 0);
    }

    #[test]
    fn test_tone_curve_matches_direct_adjustment() {
        let p = ColorParams {
            contrast: 1.2,
            brightness: -10,
            shadows: 15,
            midtones: 5,
            highlights: -25,
            red_gain: 1.1,
            green_gain: 0.9,
            blue_gain: 1.0,
            x_offset: 0,
        };
        let curve = ToneCurve::new(&p);
        for v in 0..=255u8 {
            assert_eq!(curve.apply(0, v), adjust_channel(v, &p, 1.1));
            assert_eq!(curve.apply(1, v), adjust_channel(v, &p, 0.9));
            assert_eq!(curve.apply(2, v), adjust_channel(v, &p, 1.0));
        }
    }

    #[test]
    fn test_apply_in_place_leaves_alpha() {
        let p = ColorParams {
            brightness: 100,
            ..params()
        };
        let curve = ToneCurve::new(&p);
        let mut rgba = vec![10, 20, 30, 77, 40, 50, 60, 0];
        curve.apply_in_place(&mut rgba, 4);
        let bump = |v: u8| adjust_channel(v, &p, 1.0);
        assert_eq!(
            rgba,
            vec![bump(10), bump(20), bump(30), 77, bump(40), bump(50), bump(60), 0]
        );
        assert!(rgba[0] >= 109);
    }

    proptest! {
        #[test]
        fn prop_output_never_escapes_byte_range(
            value in 0u8..=255,
            contrast in 0.0f64..10.0,
            brightness in -255i32..=255,
            shadows in -255i32..=255,
            midtones in -255i32..=255,
            highlights in -255i32..=255,
            gain in 0.0f64..5.0,
        ) {
            let p = ColorParams {
                contrast,
                brightness,
                shadows,
                midtones,
                highlights,
                ..ColorParams::default()
            };
            let expected = {
                let mut v = ((value as f64 / 255.0 - 0.5) * contrast + 0.5) * 255.0 + brightness as f64;
                let n = v / 255.0;
                if n <= 0.33 { v += shadows as f64 * (1.0 - n * 3.0); }
                if n > 0.33 && n < 0.66 { v += midtones as f64 * (1.0 - (n - 0.5).abs() * 3.0); }
                if n >= 0.66 { v += highlights as f64 * ((n - 0.66) * 3.0); }
                (v * gain).clamp(0.0, 255.0)
            };
            let out = adjust_channel(value, &p, gain);
            prop_assert_eq!(out, expected as u8);
        }
    }
}
