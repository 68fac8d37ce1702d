//! Earlier ring variant: revolutions rotate each cross-section instead of
//! shifting the frequency index.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::base::{add_grid_triangles, checked_row, history_dims, shape_all, Winding};
use super::ring::{
    circle_point, REVOLUTIONS, RING_MULTIPLIER, RING_PARAMS, RING_RADIUS, TORUS_RADIUS,
};
use super::{fold_frequency, Shaper, ShaperBase, SurfaceSet};
use crate::colour::ColourMapper;
use crate::error::Result;
use crate::geom::Surface;
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

pub struct RingLegacyShaper {
    base: ShaperBase,
}

impl RingLegacyShaper {
    pub fn new(mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            base: ShaperBase::new("Ring (legacy)", mapper),
        }
    }
}

impl Shaper for RingLegacyShaper {
    fn base(&self) -> &ShaperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShaperBase {
        &mut self.base
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &RING_PARAMS
    }

    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()> {
        let (slices, freqs) = history_dims(history, 1)?;
        let mut surface = Surface::new(slices, freqs * 2)?;
        add_grid_triangles(&mut surface, true, true, Winding::Standard)?;

        self.base.surfaces = SurfaceSet::Single(surface);
        shape_all(history, |idx, row| self.update_surface(idx, row, params))?;
        self.base.surfaces.flush();
        Ok(())
    }

    fn update_surface(&mut self, idx: usize, spectrum: &[f32], params: &ParamHost) -> Result<()> {
        let mapper = &self.base.mapper;
        let surface = self.base.surfaces.whole_mut();
        let ring_size = surface.y_size();
        let freqs = ring_size / 2;
        let spectrum = checked_row(surface, idx, spectrum, freqs)?;

        let ring_radius = RING_RADIUS.read(params);
        let multiplier = RING_MULTIPLIER.read(params);
        // Whole turns only
        let revolutions = REVOLUTIONS.read(params).trunc();

        let ang_t = 360.0 * idx as f32 / surface.x_size() as f32;
        let mtx = Mat4::from_rotation_y(ang_t.to_radians())
            * Mat4::from_translation(Vec3::new(TORUS_RADIUS.read(params), 0.0, 0.0))
            * Mat4::from_rotation_z((revolutions * ang_t).to_radians());

        for i_f in 0..ring_size {
            let ang_f = 360.0 * i_f as f32 / (ring_size - 1) as f32;
            let idx_f = fold_frequency(i_f, freqs);
            let r = ring_radius * (1.0 + (multiplier - 1.0) * spectrum[idx_f]);

            *surface.modify_vertex(idx, i_f)? = mtx.transform_point3(circle_point(r, ang_f));
            surface.set_vertex_colour(idx, i_f, mapper.map_spectrum(&spectrum, idx_f))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourMapperKind;
    use crate::params::ParamValue;
    use approx::assert_relative_eq;

    #[test]
    fn test_revolutions_rotate_cross_section() {
        let mut params = ParamHost::new();
        let mut shaper = RingLegacyShaper::new(ColourMapperKind::White.instance());
        shaper.initialise(&mut params);
        params.set(REVOLUTIONS.address, ParamValue::Int(1)).unwrap();
        let history = SpectrumHistory::zeroed(4, 2);
        shaper.create_surface(&history, &params).unwrap();

        let surface = shaper.base().surfaces.whole();
        assert_eq!((surface.x_size(), surface.y_size()), (4, 4));

        // Slice 0: no twist, first vertex sits on the outer equator
        let v = surface.vertex(0, 0).unwrap();
        assert_relative_eq!(v.x, 220.0, epsilon = 1e-3);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-3);

        // Slice 1 (90°): the cross-section is turned 90° about its own axis,
        // so the first vertex points straight up
        let v = surface.vertex(1, 0).unwrap();
        assert_relative_eq!(v.y, 20.0, epsilon = 1e-3);
        assert_eq!(shaper.render().len(), 1);
    }
}
