//! Synthetic spectra standing in for a live audio analyzer.

use echo_core::config::ToneDescription;
use echo_core::spectrum::FFT_SIZE;
use echo_core::{SceneDescription, SceneRegistry, SourceHandle, SpectrumColorizer};

/// Fraction of a tone's energy leaking into each neighbouring bin.
const LEAKAGE: f32 = 0.5;

/// Magnitude spectrum of a single (optionally pulsing) tone at `time` seconds.
///
/// Bins cover `0..sample_rate / 2` in [`FFT_SIZE`] equal steps.
pub fn tone_spectrum(tone: &ToneDescription, sample_rate: u32, time: f32) -> Vec<f32> {
    let mut spectrum = vec![0.0; FFT_SIZE];

    let bin_width = sample_rate as f32 / 2.0 / FFT_SIZE as f32;
    let bin = (tone.frequency_hz / bin_width).round() as usize;
    if bin >= FFT_SIZE {
        return spectrum;
    }

    let envelope = if tone.pulse_hz > 0.0 {
        0.5 * (1.0 + (std::f32::consts::TAU * tone.pulse_hz * time).sin())
    } else {
        1.0
    };
    let amplitude = tone.amplitude * envelope;

    spectrum[bin] = amplitude;
    if bin > 0 {
        spectrum[bin - 1] = amplitude * LEAKAGE;
    }
    if bin + 1 < FFT_SIZE {
        spectrum[bin + 1] = amplitude * LEAKAGE;
    }
    spectrum
}

/// Feeds one source's colorizer each frame and writes the result back.
pub struct SourceDriver {
    pub handle: SourceHandle,
    pub tone: Option<ToneDescription>,
    colorizer: SpectrumColorizer,
}

impl SourceDriver {
    /// One driver per source with a color mode; static sources are skipped.
    pub fn for_scene(scene: &SceneDescription, handles: &[SourceHandle], sample_rate: u32) -> Vec<Self> {
        scene
            .sources
            .iter()
            .zip(handles)
            .filter_map(|(desc, handle)| {
                let mode = desc.color_mode()?;
                Some(Self {
                    handle: *handle,
                    tone: desc.tone,
                    colorizer: SpectrumColorizer::new(sample_rate, mode).with_intensity(desc.intensity),
                })
            })
            .collect()
    }

    pub fn update(&mut self, registry: &mut SceneRegistry, sample_rate: u32, time: f32, delta_time: f32) {
        let spectrum = match &self.tone {
            Some(tone) => tone_spectrum(tone, sample_rate, time),
            None => vec![0.0; FFT_SIZE],
        };
        let signal = self.colorizer.update(&spectrum, delta_time);

        if let Some(source) = registry.source_mut(self.handle) {
            source.apply_signal(signal);
        }
    }
}
