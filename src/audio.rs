//! Spectrum sources: live audio input and offline WAV analysis.
//!
//! Both paths run the same Hann-windowed FFT and reduce each window to
//! `band_count` log-spaced intensities in [0, 1], one row of the spectrum
//! history per window.

mod analyser;
mod live;
mod wav;

pub use analyser::SpectrumAnalyser;
pub use live::{input_device_names, LiveInput};
pub use wav::{analyse_samples, analyse_wav};
