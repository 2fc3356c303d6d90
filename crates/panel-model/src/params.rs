//! Tone/color adjustment parameters and the live parameter channel.
//!
//! Parameters are owned by whoever drives the UI and read by the transform
//! as a snapshot at the instant a frame is processed. Updates therefore
//! apply to the next processed frame, never retroactively.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Horizontal crop offset range, in percent of the maximum shift.
pub const X_OFFSET_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// Per-frame tone and color adjustment settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorParams {
    /// Contrast multiplier around mid-grey (1.0 = identity).
    pub contrast: f64,

    /// Signed offset added after contrast.
    pub brightness: i32,

    /// Additive adjustment weighted toward dark values.
    pub shadows: i32,

    /// Additive adjustment weighted toward mid values.
    pub midtones: i32,

    /// Additive adjustment weighted toward bright values.
    pub highlights: i32,

    /// Red channel gain (1.0 = identity).
    pub red_gain: f64,

    /// Green channel gain (1.0 = identity).
    pub green_gain: f64,

    /// Blue channel gain (1.0 = identity).
    pub blue_gain: f64,

    /// Horizontal crop offset, -100 (far left) to 100 (far right).
    pub x_offset: i32,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            brightness: 0,
            shadows: 0,
            midtones: 0,
            highlights: 0,
            red_gain: 1.0,
            green_gain: 1.0,
            blue_gain: 1.0,
            x_offset: 0,
        }
    }
}

impl ColorParams {
    /// Whether these parameters leave pixel values unchanged.
    pub fn is_identity(&self) -> bool {
        self.contrast == 1.0
            && self.brightness == 0
            && self.shadows == 0
            && self.midtones == 0
            && self.highlights == 0
            && self.channel_gains() == [1.0, 1.0, 1.0]
    }

    /// Gains in R, G, B order.
    pub fn channel_gains(&self) -> [f64; 3] {
        [self.red_gain, self.green_gain, self.blue_gain]
    }

    /// Copy with every field forced into its valid range: contrast and gains
    /// non-negative and finite, `x_offset` within [-100, 100].
    pub fn sanitized(&self) -> Self {
        fn non_negative(v: f64) -> f64 {
            if v.is_finite() {
                v.max(0.0)
            } else {
                1.0
            }
        }

        Self {
            contrast: non_negative(self.contrast),
            red_gain: non_negative(self.red_gain),
            green_gain: non_negative(self.green_gain),
            blue_gain: non_negative(self.blue_gain),
            x_offset: self
                .x_offset
                .clamp(*X_OFFSET_RANGE.start(), *X_OFFSET_RANGE.end()),
            ..*self
        }
    }

    /// Random parameters for exploring looks.
    ///
    /// Contrast and gains fall in [0.5, 1.5] in steps of 0.01; tone offsets
    /// and `x_offset` are whole numbers in [-50, 50].
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut factor = || f64::from(rng.gen_range(50..=150_i32)) / 100.0;
        let (contrast, red_gain, green_gain, blue_gain) = (factor(), factor(), factor(), factor());
        let mut offset = || rng.gen_range(-50..=50);
        Self {
            contrast,
            brightness: offset(),
            shadows: offset(),
            midtones: offset(),
            highlights: offset(),
            red_gain,
            green_gain,
            blue_gain,
            x_offset: offset(),
        }
        .sanitized()
    }

    /// Parse a (possibly partial) JSON parameter file.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(|p| p.sanitized())
    }
}

/// Write side of the live parameter channel.
#[derive(Debug)]
pub struct ParamsController {
    tx: watch::Sender<ColorParams>,
}

/// Read side of the live parameter channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ParamsHandle {
    rx: watch::Receiver<ColorParams>,
}

/// Create a live parameter channel seeded with `initial`.
pub fn params_channel(initial: ColorParams) -> (ParamsController, ParamsHandle) {
    let (tx, rx) = watch::channel(initial.sanitized());
    (ParamsController { tx }, ParamsHandle { rx })
}

impl ParamsController {
    /// Replace all parameters.
    pub fn set(&self, params: ColorParams) {
        self.tx.send_replace(params.sanitized());
    }

    /// Modify parameters in place.
    pub fn update(&self, f: impl FnOnce(&mut ColorParams)) {
        self.tx.send_modify(|params| {
            f(params);
            *params = params.sanitized();
        });
    }

    /// Restore identity defaults.
    pub fn reset(&self) {
        self.set(ColorParams::default());
    }

    pub fn current(&self) -> ColorParams {
        *self.tx.borrow()
    }
}

impl ParamsHandle {
    /// A handle whose parameters never change.
    pub fn fixed(params: ColorParams) -> Self {
        let (_controller, handle) = params_channel(params);
        handle
    }

    /// The parameters in effect right now.
    pub fn snapshot(&self) -> ColorParams {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_default_is_identity() {
        assert!(ColorParams::default().is_identity());
        let tweaked = ColorParams {
            shadows: 5,
            ..ColorParams::default()
        };
        assert!(!tweaked.is_identity());
    }

    #[test]
    fn test_sanitized_clamps_ranges() {
        let params = ColorParams {
            contrast: -0.5,
            red_gain: f64::NAN,
            x_offset: 250,
            ..ColorParams::default()
        }
        .sanitized();
        assert_eq!(params.contrast, 0.0);
        assert_eq!(params.red_gain, 1.0);
        assert_eq!(params.x_offset, 100);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params = ColorParams::from_json(r#"{"contrast": 1.5, "x_offset": -30}"#).unwrap();
        assert_eq!(params.contrast, 1.5);
        assert_eq!(params.x_offset, -30);
        assert_eq!(params.green_gain, 1.0);
        assert_eq!(params.brightness, 0);
    }

    #[test]
    fn test_updates_visible_to_next_snapshot() {
        let (controller, handle) = params_channel(ColorParams::default());
        let before = handle.snapshot();
        controller.update(|p| p.brightness = 40);
        assert_eq!(before.brightness, 0);
        assert_eq!(handle.snapshot().brightness, 40);

        controller.reset();
        assert!(handle.snapshot().is_identity());
    }

    #[test]
    fn test_fixed_handle_outlives_controller() {
        let params = ColorParams {
            midtones: 12,
            ..ColorParams::default()
        };
        let handle = ParamsHandle::fixed(params);
        assert_eq!(handle.snapshot(), params);
    }

    #[test]
    fn test_controller_current_tracks_sanitized_value() {
        let (controller, _handle) = params_channel(ColorParams::default());
        controller.set(ColorParams {
            x_offset: 400,
            ..ColorParams::default()
        });
        assert_eq!(controller.current().x_offset, 100);
    }

    proptest! {
        #[test]
        fn prop_randomized_params_stay_in_range(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let params = ColorParams::randomized(&mut rng);
            for factor in [params.contrast, params.red_gain, params.green_gain, params.blue_gain] {
                prop_assert!((0.5..=1.5).contains(&factor), "factor {}", factor);
                let hundredths = factor * 100.0;
                prop_assert!((hundredths - hundredths.round()).abs() < 1e-9);
            }
            for offset in [
                params.brightness,
                params.shadows,
                params.midtones,
                params.highlights,
                params.x_offset,
            ] {
                prop_assert!((-50..=50).contains(&offset), "offset {}", offset);
            }
            prop_assert_eq!(params.sanitized(), params);
        }
    }
}
