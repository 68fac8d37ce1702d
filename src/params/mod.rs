//! Parameter definitions with units and documented semantics.
//!
//! Static defaults live in plain config structs; everything that can be
//! changed at runtime (keyboard, remote control, config file) is a
//! [`Parameter`] in the [`ParamHost`].

mod audio;
pub mod config;
mod registry;
mod render;
mod scene;

// Re-export all types
pub use audio::AnalyserConfig;
pub use registry::{ParamHost, ParamSpec, ParamValue, Parameter};
pub use render::{ExportConfig, HistoryConfig, RenderConfig};
pub use scene::{
    is_shaper_param, register_defaults, AUDIO_RECORDING, AUDIO_SOURCE, CAM_POS, CAM_ROT,
    CAM_ZOOM, MAPPER, RENDER_MODE, SHAPER, SHAPER_PREFIX, SPLIT,
};
