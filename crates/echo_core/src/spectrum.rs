//! Audio spectrum to source color mapping.
//!
//! Sound frequencies are mapped onto a hue ramp on a log scale: low
//! frequencies land at the blue end, high frequencies at red. The
//! colorizer consumes one magnitude spectrum per frame (produced by
//! whatever audio backend the host uses) and yields a smoothed
//! [`SourceSignal`] for the owning source.

use glam::Vec3;

/// Number of spectrum bins the palette is built for.
pub const FFT_SIZE: usize = 1024;

/// log10(22000 + 1), the top of the audible range on the log scale.
pub const LOG_MAX_SOUND_FREQUENCY_HZ: f32 = 4.3424;

/// Hue span used for the frequency ramp (230° out of a 400° scale).
const HUE_SPAN: f32 = 230.0 / 400.0;

/// Color and intensity handed to a source each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceSignal {
    pub color: Vec3,
    pub intensity: f32,
}

/// Map a sound frequency to [0, 1] on a log10 scale.
pub fn sound_to_color_frequency(frequency_hz: f32) -> f32 {
    // +1 keeps log10 finite at 0 Hz
    let rescaled = (frequency_hz + 1.0).log10();
    (rescaled / LOG_MAX_SOUND_FREQUENCY_HZ).clamp(0.0, 1.0)
}

/// Fully saturated color for a normalized frequency `t`.
pub fn frequency_color(t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    hsv_to_rgb((1.0 - t) * HUE_SPAN, 1.0, 1.0)
}

/// HSV (all components in [0, 1]) to RGB.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec3 {
    let h6 = hue.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    match sector as u32 % 6 {
        0 => Vec3::new(value, t, p),
        1 => Vec3::new(q, value, p),
        2 => Vec3::new(p, value, t),
        3 => Vec3::new(p, q, value),
        4 => Vec3::new(t, p, value),
        _ => Vec3::new(value, p, q),
    }
}

/// sRGB transfer function, gamma-encoded to linear.
pub fn gamma_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB transfer function, linear to gamma-encoded.
pub fn linear_to_gamma(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn linearize(color: Vec3) -> Vec3 {
    Vec3::new(gamma_to_linear(color.x), gamma_to_linear(color.y), gamma_to_linear(color.z))
}

fn gammaize(color: Vec3) -> Vec3 {
    Vec3::new(linear_to_gamma(color.x), linear_to_gamma(color.y), linear_to_gamma(color.z))
}

/// How the colorizer turns a spectrum into a color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorMode {
    /// Fixed hue, scaled by the smoothed total spectrum energy.
    Fixed(Vec3),
    /// Amplitude-weighted blend of the per-bin frequency palette.
    Procedural,
}

/// Per-source spectrum smoothing state.
#[derive(Clone, Debug)]
pub struct SpectrumColorizer {
    pub mode: ColorMode,
    /// Fraction of the previous value left after one second
    pub lerp_factor: f32,
    /// Intensity reported alongside the color
    pub intensity: f32,
    palette: Vec<Vec3>,
    lerped_color: Vec3,
    lerped_intensity: f32,
}

impl SpectrumColorizer {
    /// Build the linear-space palette for a spectrum of [`FFT_SIZE`] bins
    /// covering 0..sample_rate/2.
    pub fn new(sample_rate: u32, mode: ColorMode) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let palette = (0..FFT_SIZE)
            .map(|bin| {
                let frequency_hz = bin as f32 * nyquist / FFT_SIZE as f32;
                linearize(frequency_color(sound_to_color_frequency(frequency_hz)))
            })
            .collect();

        Self {
            mode,
            lerp_factor: 0.1,
            intensity: 100.0,
            palette,
            lerped_color: Vec3::ZERO,
            lerped_intensity: 0.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Frame-rate independent smoothing weight.
    fn smoothing(&self, delta_time: f32) -> f32 {
        1.0 - self.lerp_factor.powf(delta_time)
    }

    /// Consume one frame of spectrum magnitudes.
    ///
    /// Non-positive bins are ignored. Bins beyond the palette are dropped.
    pub fn update(&mut self, spectrum: &[f32], delta_time: f32) -> SourceSignal {
        let k = self.smoothing(delta_time);

        let color = match self.mode {
            ColorMode::Fixed(base) => {
                let total: f32 = spectrum.iter().filter(|a| **a > 0.0).sum();
                self.lerped_intensity += (total - self.lerped_intensity) * k;
                base * self.lerped_intensity
            }
            ColorMode::Procedural => {
                let mut weighted = Vec3::ZERO;
                let mut total = 0.0;
                for (amplitude, color) in spectrum.iter().zip(&self.palette) {
                    if *amplitude <= 0.0 {
                        continue;
                    }
                    weighted += *color * *amplitude;
                    total += *amplitude;
                }
                if total <= 0.0 {
                    weighted = Vec3::ZERO;
                }
                self.lerped_color = self.lerped_color.lerp(gammaize(weighted), k);
                self.lerped_color.lerp(weighted, 0.5)
            }
        };

        SourceSignal {
            color,
            intensity: self.intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_sound_to_color_frequency_range() {
        assert_eq!(sound_to_color_frequency(0.0), 0.0);
        assert!(approx(sound_to_color_frequency(22000.0), 1.0));
        assert_eq!(sound_to_color_frequency(1.0e6), 1.0);

        let mid = sound_to_color_frequency(1000.0);
        assert!(mid > 0.6 && mid < 0.75);
    }

    #[test]
    fn test_frequency_color_ends() {
        // t=1 -> hue 0 (red), t=0 -> hue 0.575 (blue side)
        assert_eq!(frequency_color(1.0), Vec3::new(1.0, 0.0, 0.0));

        let low = frequency_color(0.0);
        assert!(low.z > 0.99);
        assert!(low.x < 0.01);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(approx(green.x, 0.0) && approx(green.y, 1.0) && approx(green.z, 0.0));
        assert_eq!(hsv_to_rgb(0.5, 0.0, 0.25), Vec3::splat(0.25));
    }

    #[test]
    fn test_gamma_roundtrip() {
        for c in [0.0, 0.002, 0.2, 0.5, 1.0] {
            assert!(approx(linear_to_gamma(gamma_to_linear(c)), c));
        }
        assert!(approx(gamma_to_linear(0.5), 0.214));
    }

    #[test]
    fn test_palette_size() {
        let colorizer = SpectrumColorizer::new(48_000, ColorMode::Procedural);
        assert_eq!(colorizer.palette.len(), FFT_SIZE);
        // Bin 0 is 0 Hz, the blue end of the ramp
        assert!(colorizer.palette[0].z > 0.99);
    }

    #[test]
    fn test_fixed_mode_smooths_toward_energy() {
        let base = Vec3::new(1.0, 0.5, 0.0);
        let mut colorizer = SpectrumColorizer::new(48_000, ColorMode::Fixed(base));
        let spectrum = [0.25, -1.0, 0.75];

        // After one second the remaining gap is lerp_factor (10%)
        let signal = colorizer.update(&spectrum, 1.0);
        assert!(approx(signal.color.x, 0.9));
        assert!(approx(signal.color.y, 0.45));
        assert_eq!(signal.intensity, 100.0);

        let signal = colorizer.update(&spectrum, 1.0);
        assert!(approx(signal.color.x, 0.99));
    }

    #[test]
    fn test_fixed_mode_zero_delta_holds_value() {
        let mut colorizer = SpectrumColorizer::new(48_000, ColorMode::Fixed(Vec3::ONE));
        let signal = colorizer.update(&[1.0], 0.0);
        assert_eq!(signal.color, Vec3::ZERO);
    }

    #[test]
    fn test_procedural_silence_is_black() {
        let mut colorizer = SpectrumColorizer::new(48_000, ColorMode::Procedural);
        let signal = colorizer.update(&vec![0.0; FFT_SIZE], 0.016);
        assert_eq!(signal.color, Vec3::ZERO);
    }

    #[test]
    fn test_procedural_single_bin_tints_toward_palette() {
        let mut colorizer =
            SpectrumColorizer::new(48_000, ColorMode::Procedural).with_intensity(5.0);
        let mut spectrum = vec![0.0; FFT_SIZE];
        spectrum[FFT_SIZE - 1] = 1.0;
        let expected = colorizer.palette[FFT_SIZE - 1];

        for _ in 0..200 {
            colorizer.update(&spectrum, 0.1);
        }
        let signal = colorizer.update(&spectrum, 0.1);

        // Converged: half gamma-encoded palette color, half linear
        let gamma = Vec3::new(
            linear_to_gamma(expected.x),
            linear_to_gamma(expected.y),
            linear_to_gamma(expected.z),
        );
        let blended = gamma.lerp(expected, 0.5);
        assert!((signal.color - blended).length() < 1e-3);
        assert_eq!(signal.intensity, 5.0);
    }
}
