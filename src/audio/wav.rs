//! Offline analysis of WAV files into a spectrum history.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use log::info;

use super::analyser::SpectrumAnalyser;
use crate::error::{Result, SculptError};
use crate::params::AnalyserConfig;
use crate::spectrum::SpectrumHistory;

/// Decode `path`, analyse half-overlapping windows and compress the frames
/// down to at most `max_rows` slices
pub fn analyse_wav(
    path: impl AsRef<Path>,
    config: &AnalyserConfig,
    max_rows: usize,
) -> Result<SpectrumHistory> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let config = AnalyserConfig {
        sample_rate_hz: spec.sample_rate as usize,
        ..config.clone()
    };
    let history = analyse_samples(&mono, &config, max_rows)?;
    info!(
        "Analysed {}: {} Hz, {} channel(s), {} slices of {} frequencies",
        path.display(),
        spec.sample_rate,
        channels,
        history.len(),
        history.freq_count()
    );
    Ok(history)
}

/// Analyse mono samples with a hop of half the FFT size
pub fn analyse_samples(
    samples: &[f32],
    config: &AnalyserConfig,
    max_rows: usize,
) -> Result<SpectrumHistory> {
    let mut analyser = SpectrumAnalyser::new(config.clone())?;
    let size = config.fft_size;
    let hop = size / 2;

    if samples.len() < size {
        return Err(SculptError::invalid(format!(
            "audio too short: {} samples, need at least {}",
            samples.len(),
            size
        )));
    }

    let rows = (0..=samples.len() - size)
        .step_by(hop)
        .map(|start| analyser.analyse(&samples[start..start + size]))
        .collect::<Result<Vec<_>>>()?;
    SpectrumHistory::compress(rows, max_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn write_tone(path: &Path, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let count = (44100.0 * seconds) as usize;
        for i in 0..count {
            let s = (2.0 * PI * 440.0 * i as f32 / 44100.0).sin() * 0.1;
            let v = (s * i16::MAX as f32) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_analyse_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 0.5);

        let config = AnalyserConfig::default();
        let history = analyse_wav(&path, &config, 720).unwrap();

        // 22050 samples, windows of 1024 every 512
        assert_eq!(history.len(), (22050 - 1024) / 512 + 1);
        assert_eq!(history.freq_count(), config.band_count);
        let row = history.row(10).unwrap();
        assert!(row.iter().any(|&v| v > 0.1));
    }

    #[test]
    fn test_long_audio_is_compressed() {
        let config = AnalyserConfig {
            fft_size: 256,
            band_count: 8,
            ..Default::default()
        };
        let samples = vec![0.0; 256 * 100];
        let history = analyse_samples(&samples, &config, 50).unwrap();
        assert!(history.len() <= 50);
        assert!(!history.is_empty());
    }

    #[test]
    fn test_too_short() {
        let config = AnalyserConfig::default();
        assert!(analyse_samples(&[0.0; 100], &config, 720).is_err());
    }
}
