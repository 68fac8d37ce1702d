//! Cylinder lying along the X axis, closed by a cap vertex at each end.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::base::{add_grid_triangles, checked_row, history_dims, shape_all, Winding};
use super::{Shaper, ShaperBase, SurfaceSet};
use crate::colour::ColourMapper;
use crate::error::Result;
use crate::geom::Surface;
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

const LENGTH: ParamSpec = ParamSpec {
    address: "/shaper/length",
    label: "Length",
    min: 10.0,
    max: 1000.0,
    default: 400.0,
    integer: false,
};

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

const CYLINDER_PARAMS: [ParamSpec; 3] = [LENGTH, RADIUS, MULTIPLIER];

/// Grid rows are `F + 2`: row 0 and row `F + 1` collapse onto the cap centres
pub struct CylinderShaper {
    base: ShaperBase,
}

impl CylinderShaper {
    pub fn new(mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            base: ShaperBase::new("Cylinder", mapper),
        }
    }
}

impl Shaper for CylinderShaper {
    fn base(&self) -> &ShaperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShaperBase {
        &mut self.base
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &CYLINDER_PARAMS
    }

    /// Time runs around the X axis, so the cylinder spins about X
    fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.base.angle.to_radians())
    }

    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()> {
        let (slices, freqs) = history_dims(history, 2)?;
        let mut surface = Surface::new(slices, freqs + 2)?;
        add_grid_triangles(&mut surface, true, false, Winding::Cylinder)?;

        self.base.surfaces = SurfaceSet::Single(surface);
        shape_all(history, |idx, row| self.update_surface(idx, row, params))?;
        self.base.surfaces.flush();
        Ok(())
    }

    fn update_surface(&mut self, idx: usize, spectrum: &[f32], params: &ParamHost) -> Result<()> {
        let mapper = &self.base.mapper;
        let surface = self.base.surfaces.whole_mut();
        let freqs = surface.y_size() - 2;
        let spectrum = checked_row(surface, idx, spectrum, freqs)?;

        let length = LENGTH.read(params);
        let radius = RADIUS.read(params);
        let multiplier = MULTIPLIER.read(params);
        let ang_t = (360.0 * idx as f32 / surface.x_size() as f32).to_radians();

        for i_f in 0..freqs {
            let x = length * (i_f as f32 / (freqs - 1) as f32 - 0.5);
            let r = radius * (1.0 + (multiplier - 1.0) * spectrum[i_f]);
            *surface.modify_vertex(idx, i_f + 1)? = Vec3::new(x, r * ang_t.cos(), -r * ang_t.sin());
            surface.set_vertex_colour(idx, i_f + 1, mapper.map_spectrum(&spectrum, i_f))?;
        }

        *surface.modify_vertex(idx, 0)? = Vec3::new(-length / 2.0, 0.0, 0.0);
        *surface.modify_vertex(idx, freqs + 1)? = Vec3::new(length / 2.0, 0.0, 0.0);
        Ok(())
    }
}
