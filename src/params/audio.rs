//! Spectrum analyser configuration.

use std::ops::Range;

use crate::error::{Result, SculptError};

/// FFT analysis configuration with logarithmic band layout
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Live analysis interval (milliseconds)
    /// 16 ms ≈ one frame at 60 Hz
    pub update_interval_ms: u64,

    /// Number of output frequency bands (F)
    pub band_count: usize,

    /// Lower edge of the first band (Hz)
    pub min_freq_hz: f32,

    /// Linear gain applied before shaping
    pub gain: f32,

    /// Exponent applied to the scaled magnitude (0.5 = square root)
    pub exponent: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 1024,
            update_interval_ms: 16,
            band_count: 64,
            min_freq_hz: 40.0,
            gain: 4.0,
            exponent: 0.5,
        }
    }
}

impl AnalyserConfig {
    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// Number of usable spectrum bins (DC to Nyquist)
    pub fn spec_size(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Log-spaced bin ranges from `min_freq_hz` to Nyquist, each at least one bin wide
    pub fn band_ranges(&self) -> Vec<Range<usize>> {
        let nyquist = self.sample_rate_hz as f32 / 2.0;
        let max_bin = self.spec_size();
        let min_hz = self.min_freq_hz.max(1.0);
        let ratio = (nyquist / min_hz).powf(1.0 / self.band_count as f32);

        (0..self.band_count)
            .map(|band| {
                let lo_hz = min_hz * ratio.powi(band as i32);
                let hi_hz = min_hz * ratio.powi(band as i32 + 1);
                let lo = self.hz_to_bin(lo_hz).min(max_bin - 1);
                let hi = self.hz_to_bin(hi_hz).clamp(lo + 1, max_bin);
                lo..hi
            })
            .collect()
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() {
            return Err(SculptError::invalid(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(SculptError::invalid("Sample rate must be > 0"));
        }
        if self.band_count == 0 {
            return Err(SculptError::invalid("Band count must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_bin() {
        let config = AnalyserConfig::default();

        // At 44100 Hz sample rate and 1024 FFT size:
        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(43.07), 1);
        assert_eq!(config.hz_to_bin(100.0), 2);
    }

    #[test]
    fn test_band_ranges_cover_spectrum() {
        let config = AnalyserConfig::default();
        let bands = config.band_ranges();

        assert_eq!(bands.len(), config.band_count);
        for band in &bands {
            assert!(!band.is_empty());
            assert!(band.end <= config.spec_size());
        }
        // Bands move upward in frequency
        assert!(bands.last().unwrap().start > bands[0].start);
    }

    #[test]
    fn test_validate() {
        assert!(AnalyserConfig::default().validate().is_ok());
        let config = AnalyserConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
