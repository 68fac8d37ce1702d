//! Sphere: each time-slice is a meridian, low frequencies at the south pole.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::base::{add_grid_triangles, checked_row, history_dims, shape_all, Winding};
use super::{Shaper, ShaperBase, SurfaceSet};
use crate::colour::ColourMapper;
use crate::error::Result;
use crate::geom::Surface;
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

const RADIUS: ParamSpec = ParamSpec {
    address: "/shaper/radius",
    label: "Radius",
    min: 10.0,
    max: 500.0,
    default: 100.0,
    integer: false,
};

const MULTIPLIER: ParamSpec = ParamSpec {
    address: "/shaper/multiplier",
    label: "Multiplier",
    min: 0.0,
    max: 10.0,
    default: 1.5,
    integer: false,
};

const SPHERE_PARAMS: [ParamSpec; 2] = [RADIUS, MULTIPLIER];

pub struct SphereShaper {
    base: ShaperBase,
}

impl SphereShaper {
    pub fn new(mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            base: ShaperBase::new("Sphere", mapper),
        }
    }
}

impl Shaper for SphereShaper {
    fn base(&self) -> &ShaperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShaperBase {
        &mut self.base
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &SPHERE_PARAMS
    }

    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()> {
        let (slices, freqs) = history_dims(history, 2)?;
        let mut surface = Surface::new(slices, freqs)?;
        // Meridians close around the Y axis, the poles stay open
        add_grid_triangles(&mut surface, true, false, Winding::Standard)?;

        self.base.surfaces = SurfaceSet::Single(surface);
        shape_all(history, |idx, row| self.update_surface(idx, row, params))?;
        self.base.surfaces.flush();
        Ok(())
    }

    fn update_surface(&mut self, idx: usize, spectrum: &[f32], params: &ParamHost) -> Result<()> {
        let mapper = &self.base.mapper;
        let surface = self.base.surfaces.whole_mut();
        let freqs = surface.y_size();
        let spectrum = checked_row(surface, idx, spectrum, freqs)?;

        let radius = RADIUS.read(params);
        let multiplier = MULTIPLIER.read(params);
        let ang_t = 360.0 * idx as f32 / surface.x_size() as f32;
        let mtx = Mat4::from_rotation_y(ang_t.to_radians());

        for i_f in 0..freqs {
            let lat = (180.0 * i_f as f32 / (freqs - 1) as f32 - 90.0).to_radians();
            let r = radius * (1.0 + (multiplier - 1.0) * spectrum[i_f]);
            let v = Vec3::new(r * lat.cos(), r * lat.sin(), 0.0);

            *surface.modify_vertex(idx, i_f)? = mtx.transform_point3(v);
            surface.set_vertex_colour(idx, i_f, mapper.map_spectrum(&spectrum, i_f))?;
        }
        Ok(())
    }
}
