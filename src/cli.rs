//! Command-line argument parsing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::Parser;
use log::info;

use crate::colour::ColourMapperKind;
use crate::error::Result;
use crate::geom::RenderMode;
use crate::params::{ParamValue, MAPPER, RENDER_MODE, SHAPER, SPLIT};
use crate::remote::DEFAULT_PORT;
use crate::sculpture::SculptureSystem;
use crate::shaper::ShaperKind;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "SoundBites")]
#[command(about = "Turns audio spectra into 3D sound sculptures", long_about = None)]
pub struct Args {
    /// Tab-separated spectrum log to sculpt
    #[arg(long, value_name = "FILE", conflicts_with = "wav")]
    pub spectrum: Option<PathBuf>,

    /// WAV file to analyse and sculpt
    #[arg(long, value_name = "FILE")]
    pub wav: Option<PathBuf>,

    /// Shaper: ring (default), ring-legacy, sphere, cylinder, plane
    #[arg(long, value_name = "SHAPER")]
    pub shaper: Option<ShaperKind>,

    /// Colour mapper: white, brown, greyscale, spectrum, fire, ice, transparent
    #[arg(long, value_name = "MAPPER")]
    pub mapper: Option<ColourMapperKind>,

    /// Render mode: points, wireframe, solid
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RenderMode>,

    /// Split the ring into two halves
    #[arg(long)]
    pub split: bool,

    /// Write an STL file and exit
    #[arg(long, value_name = "FILE")]
    pub export_stl: Option<PathBuf>,

    /// Write an OBJ file and exit
    #[arg(long, value_name = "FILE")]
    pub export_obj: Option<PathBuf>,

    /// STL coordinate scale (world units to file units)
    #[arg(long, value_name = "FACTOR")]
    pub scale: Option<f32>,

    /// Configuration file applied at startup and used by F5/F9
    /// (defaults to ./config.txt, loaded when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// UDP port for remote parameter control (0 disables)
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub remote_port: u16,

    /// Mirror parameter changes to this OSC address (host:port)
    #[arg(long, value_name = "ADDR")]
    pub remote_reply: Option<String>,

    /// Time-slices kept for live input
    #[arg(long, value_name = "SLICES", default_value_t = 240)]
    pub history: usize,

    /// Directory with colour map images
    #[arg(long, value_name = "DIR")]
    pub colour_maps: Option<PathBuf>,
}

impl Args {
    /// Headless mode: export and exit without opening a window
    pub fn is_headless(&self) -> bool {
        self.export_stl.is_some() || self.export_obj.is_some()
    }

    /// `--config` when given, otherwise `default` if that file exists
    pub fn config_to_load(&self, default: &Path) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => default.exists().then(|| default.to_path_buf()),
        }
    }

    /// Whether spectra come from the live input rather than a file
    pub fn is_live(&self) -> bool {
        self.spectrum.is_none() && self.wav.is_none()
    }

    /// File stem for interactive exports: the loaded file's name, or
    /// `Recording_<yyyyMMdd_HHmmss>` for live input
    pub fn export_stem(&self, now: DateTime<Local>) -> String {
        self.spectrum
            .as_ref()
            .or(self.wav.as_ref())
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("Recording_{}", now.format("%Y%m%d_%H%M%S")))
    }

    /// Apply the scene options on top of whatever the config file set
    pub fn apply_to(&self, system: &mut SculptureSystem) -> Result<()> {
        let params = system.params_mut();
        if let Some(shaper) = self.shaper {
            info!("Shaper: {}", shaper);
            params.set(SHAPER, ParamValue::Choice(shaper.key().into()))?;
        }
        if let Some(mapper) = self.mapper {
            info!("Colour mapper: {}", mapper);
            params.set(MAPPER, ParamValue::Choice(mapper.key().into()))?;
        }
        if let Some(mode) = self.mode {
            params.set(RENDER_MODE, ParamValue::Choice(mode.key().into()))?;
        }
        if self.split {
            params.set(SPLIT, ParamValue::Bool(true))?;
        }
        Ok(())
    }
}
