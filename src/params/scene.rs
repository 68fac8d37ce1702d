//! Scene-level parameter addresses and their defaults.

use glam::Vec3;

use super::registry::{ParamHost, ParamValue, Parameter};
use crate::colour::ColourMapperKind;
use crate::geom::RenderMode;
use crate::shaper::ShaperKind;

/// Active shaper family (choice)
pub const SHAPER: &str = "/render/shaper";
/// Active colour mapper (choice)
pub const MAPPER: &str = "/render/mapper";
/// POINTS / WIREFRAME / SOLID (choice)
pub const RENDER_MODE: &str = "/render/mode";
/// Split the ring into two offset bands (bool)
pub const SPLIT: &str = "/render/split";
/// Camera position in world units (vec3)
pub const CAM_POS: &str = "/cam/pos";
/// Camera rotation in degrees about X and Y (vec3)
pub const CAM_ROT: &str = "/cam/rot";
/// Camera zoom factor; scales the near plane (float)
pub const CAM_ZOOM: &str = "/cam/zoom";
/// Whether live frames are written into the history (bool)
pub const AUDIO_RECORDING: &str = "/audio/recording";
/// Live input device index, -1 for the system default (int)
pub const AUDIO_SOURCE: &str = "/audio/source";

/// Prefix shared by all shaper slider addresses
pub const SHAPER_PREFIX: &str = "/shaper/";

/// Register all scene parameters with their startup values
pub fn register_defaults(host: &mut ParamHost) {
    host.register(
        Parameter::new(SHAPER, ParamValue::Choice(ShaperKind::default().key().into()))
            .with_label("Shaper"),
    );
    host.register(
        Parameter::new(
            MAPPER,
            ParamValue::Choice(ColourMapperKind::default().key().into()),
        )
        .with_label("Colour Mapper"),
    );
    host.register(
        Parameter::new(
            RENDER_MODE,
            ParamValue::Choice(RenderMode::default().key().into()),
        )
        .with_label("Render Mode"),
    );
    host.register(Parameter::new(SPLIT, ParamValue::Bool(false)).with_label("Split Mode"));
    host.register(
        Parameter::new(CAM_POS, ParamValue::Vec3(Vec3::new(0.0, 0.0, 700.0)))
            .with_label("Camera Position"),
    );
    host.register(
        Parameter::new(CAM_ROT, ParamValue::Vec3(Vec3::ZERO)).with_label("Camera Rotation"),
    );
    host.register(
        Parameter::new(CAM_ZOOM, ParamValue::Float(1.0))
            .with_label("Camera Zoom")
            .with_range(0.25, 5.0),
    );
    host.register(
        Parameter::new(AUDIO_RECORDING, ParamValue::Bool(true)).with_label("Recording"),
    );
    host.register(
        Parameter::new(AUDIO_SOURCE, ParamValue::Int(-1))
            .with_label("Audio Source")
            .with_range(-1.0, 63.0),
    );
}

/// Whether `address` belongs to a shaper slider
pub fn is_shaper_param(address: &str) -> bool {
    address.starts_with(SHAPER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut host = ParamHost::new();
        register_defaults(&mut host);

        assert_eq!(host.choice_as::<ShaperKind>(SHAPER), Some(ShaperKind::Ring));
        assert_eq!(host.choice_as::<RenderMode>(RENDER_MODE), Some(RenderMode::Solid));
        assert_eq!(host.vec3(CAM_POS), Some(Vec3::new(0.0, 0.0, 700.0)));
        assert_eq!(host.bool(AUDIO_RECORDING), Some(true));
        assert_eq!(host.bool(SPLIT), Some(false));
        assert_eq!(host.int(AUDIO_SOURCE), Some(-1));
    }

    #[test]
    fn test_shaper_param_prefix() {
        assert!(is_shaper_param("/shaper/radius"));
        assert!(!is_shaper_param("/render/shaper"));
    }
}
