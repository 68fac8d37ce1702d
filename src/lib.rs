//! SoundBites library - audio spectra shaped into 3D sound sculptures

pub mod audio;
pub mod camera;
pub mod cli;
pub mod colour;
pub mod error;
pub mod geom;
pub mod params;
pub mod remote;
pub mod rendering;
pub mod sculpture;
pub mod shaper;
pub mod spectrum;

pub use error::{Result, SculptError};
