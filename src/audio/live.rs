//! Live microphone / line-in capture with background spectrum analysis.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use log::{error, info, warn};

use super::analyser::SpectrumAnalyser;
use crate::error::{Result, SculptError};
use crate::params::AnalyserConfig;

/// Samples kept before the oldest are discarded, in FFT windows
const MAX_BUFFERED_WINDOWS: usize = 8;

/// Audio input stream feeding an analysis thread.
///
/// The capture callback appends mono samples to a shared buffer. The
/// analysis thread consumes it in half-overlapping windows and publishes the
/// most recent spectrum frame, which the render loop collects with
/// [`LiveInput::take_frame`].
pub struct LiveInput {
    latest: Arc<Mutex<Option<Vec<f32>>>>,
    running: Arc<AtomicBool>,
    band_count: usize,

    /// Input stream (kept alive)
    _stream: cpal::Stream,

    analysis_thread: Option<thread::JoinHandle<()>>,
}

/// Names of the available input devices; `/audio/source` indexes this list
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| SculptError::Audio(format!("Failed to list input devices: {}", e)))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

/// Position of `source` among `available` devices; negative means the default
fn device_index(source: i32, available: usize) -> Option<usize> {
    usize::try_from(source).ok().filter(|&i| i < available)
}

fn select_device(host: &cpal::Host, source: i32) -> Result<cpal::Device> {
    if source >= 0 {
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| SculptError::Audio(format!("Failed to list input devices: {}", e)))?
            .collect();
        let available = devices.len();
        let picked = device_index(source, available).and_then(|i| devices.into_iter().nth(i));
        if let Some(device) = picked {
            return Ok(device);
        }
        warn!(
            "No input device #{} ({} available), using the default",
            source, available
        );
    }
    host.default_input_device()
        .ok_or_else(|| SculptError::Audio("No audio input device found".into()))
}

impl LiveInput {
    /// Open input device `source` (negative for the system default) and start analysing
    pub fn start(mut config: AnalyserConfig, source: i32) -> Result<Self> {
        let host = cpal::default_host();
        let device = select_device(&host, source)?;
        let supported = device
            .default_input_config()
            .map_err(|e| SculptError::Audio(format!("Failed to get input config: {}", e)))?;

        config.sample_rate_hz = supported.sample_rate().0 as usize;
        let analyser = SpectrumAnalyser::new(config.clone())?;
        let band_count = analyser.band_count();

        info!(
            "Audio input: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate_hz,
            supported.channels()
        );

        let capture = Capture {
            samples: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicUsize::new(0)),
            max_buffered: config.fft_size * MAX_BUFFERED_WINDOWS,
        };
        let stream_config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_input::<f32>(&device, &stream_config, capture.clone()),
            cpal::SampleFormat::I16 => build_input::<i16>(&device, &stream_config, capture.clone()),
            cpal::SampleFormat::U16 => build_input::<u16>(&device, &stream_config, capture.clone()),
            other => {
                return Err(SculptError::Audio(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }?;
        stream
            .play()
            .map_err(|e| SculptError::Audio(format!("Failed to start input stream: {}", e)))?;

        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let analysis_thread = spawn_analysis_thread(
            analyser,
            capture,
            Arc::clone(&latest),
            Arc::clone(&running),
        );

        Ok(Self {
            latest,
            running,
            band_count,
            _stream: stream,
            analysis_thread: Some(analysis_thread),
        })
    }

    /// Frequencies per frame (F)
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Most recent frame not yet taken
    pub fn take_frame(&self) -> Option<Vec<f32>> {
        self.latest.lock().ok()?.take()
    }
}

impl Drop for LiveInput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.analysis_thread.take() {
            let _ = handle.join();
        }
    }
}

/// State shared between the capture callback and the analysis thread
#[derive(Clone)]
struct Capture {
    samples: Arc<Mutex<Vec<f32>>>,
    /// Samples discarded because analysis fell behind, since last reported
    dropped: Arc<AtomicUsize>,
    max_buffered: usize,
}

/// Mix interleaved `data` down to mono onto `buf`, keeping at most
/// `max_buffered` samples. Returns how many old samples were discarded.
fn append_mono<T>(buf: &mut Vec<f32>, data: &[T], channels: usize, max_buffered: usize) -> usize
where
    T: Sample,
    f32: FromSample<T>,
{
    buf.extend(data.chunks(channels.max(1)).map(|frame| {
        frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>() / frame.len() as f32
    }));
    let excess = buf.len().saturating_sub(max_buffered);
    buf.drain(..excess);
    excess
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    capture: Capture,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // No logging here: this runs on the realtime audio thread
                let Ok(mut buf) = capture.samples.lock() else {
                    return;
                };
                let dropped = append_mono(&mut buf, data, channels, capture.max_buffered);
                if dropped > 0 {
                    capture.dropped.fetch_add(dropped, Ordering::Relaxed);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| SculptError::Audio(format!("Failed to build input stream: {}", e)))
}

/// Spawn FFT analysis thread
fn spawn_analysis_thread(
    mut analyser: SpectrumAnalyser,
    capture: Capture,
    latest: Arc<Mutex<Option<Vec<f32>>>>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let fft_size = analyser.config().fft_size;
    let interval = Duration::from_millis(analyser.config().update_interval_ms);

    thread::spawn(move || {
        let mut window = vec![0.0f32; fft_size];
        while running.load(Ordering::Relaxed) {
            thread::sleep(interval);

            let dropped = capture.dropped.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                warn!("Analysis falling behind, dropped {} samples", dropped);
            }

            loop {
                {
                    let Ok(mut buf) = capture.samples.lock() else {
                        return;
                    };
                    if buf.len() < fft_size {
                        break;
                    }
                    window.copy_from_slice(&buf[..fft_size]);
                    // 50% overlap (drain half the buffer)
                    buf.drain(..fft_size / 2);
                }

                match analyser.analyse(&window) {
                    Ok(frame) => {
                        if let Ok(mut slot) = latest.lock() {
                            *slot = Some(frame);
                        }
                    }
                    Err(e) => {
                        error!("Spectrum analysis failed: {}", e);
                        return;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_index() {
        assert_eq!(device_index(-1, 3), None);
        assert_eq!(device_index(0, 3), Some(0));
        assert_eq!(device_index(2, 3), Some(2));
        assert_eq!(device_index(3, 3), None);
        assert_eq!(device_index(0, 0), None);
    }

    #[test]
    fn test_append_mono_mixes_channels() {
        let mut buf = Vec::new();
        let dropped = append_mono(&mut buf, &[1.0f32, 0.0, 0.5, 0.5], 2, 16);
        assert_eq!(dropped, 0);
        assert_eq!(buf, vec![0.5, 0.5]);
    }

    #[test]
    fn test_append_mono_reports_overflow() {
        let mut buf = vec![0.0; 3];
        let dropped = append_mono(&mut buf, &[1.0f32; 4], 1, 5);
        assert_eq!(dropped, 2);
        assert_eq!(buf, vec![0.0, 1.0, 1.0, 1.0, 1.0]);
    }
}
