//! Windowed FFT turning sample blocks into spectrum frames.

use std::f32::consts::PI;
use std::ops::Range;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::colour::clamp_unit;
use crate::error::{Result, SculptError};
use crate::params::AnalyserConfig;

/// Hann window function for FFT analysis
pub(crate) fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Converts blocks of `fft_size` mono samples into `band_count` intensities in [0, 1]
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    bands: Vec<Range<usize>>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();
        let bands = config.band_ranges();

        Ok(Self {
            fft,
            window,
            bands,
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            config,
        })
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Number of values in each frame
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Analyse the first `fft_size` samples of `samples`
    pub fn analyse(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let n = self.config.fft_size;
        if samples.len() < n {
            return Err(SculptError::invalid(format!(
                "need {} samples for analysis, got {}",
                n,
                samples.len()
            )));
        }

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        // Single-sided amplitude
        let norm = 2.0 / n as f32;
        let frame = self
            .bands
            .iter()
            .map(|band| {
                let mean = self.buffer[band.clone()]
                    .iter()
                    .map(|c| c.norm())
                    .sum::<f32>()
                    / band.len() as f32;
                let level = mean * norm * self.config.gain;
                clamp_unit(level.powf(self.config.exponent))
            })
            .collect();
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f32, amplitude: f32, config: &AnalyserConfig) -> Vec<f32> {
        (0..config.fft_size)
            .map(|i| {
                amplitude * (2.0 * PI * freq_hz * i as f32 / config.sample_rate_hz as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_silence_is_zero() {
        let config = AnalyserConfig::default();
        let mut analyser = SpectrumAnalyser::new(config.clone()).unwrap();
        let frame = analyser.analyse(&vec![0.0; config.fft_size]).unwrap();
        assert_eq!(frame.len(), config.band_count);
        assert!(frame.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_tone_peaks_in_its_band() {
        let config = AnalyserConfig::default();
        let mut analyser = SpectrumAnalyser::new(config.clone()).unwrap();
        // Quiet enough to stay below the clamp
        let frame = analyser.analyse(&sine(1000.0, 0.05, &config)).unwrap();

        let bin = config.hz_to_bin(1000.0);
        let band = config
            .band_ranges()
            .iter()
            .position(|r| r.contains(&bin))
            .unwrap();
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak.abs_diff(band) <= 1, "peak {} vs band {}", peak, band);
        assert!(frame.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_short_block_is_rejected() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        assert!(analyser.analyse(&[0.0; 16]).is_err());
    }
}
