//! Flat height field: time along X, frequency along Z, intensity as height.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::base::{add_grid_triangles, checked_row, history_dims, shape_all, Winding};
use super::{Shaper, ShaperBase, SurfaceSet};
use crate::colour::ColourMapper;
use crate::error::Result;
use crate::geom::Surface;
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

const WIDTH: ParamSpec = ParamSpec {
    address: "/shaper/width",
    label: "Width",
    min: 10.0,
    max: 500.0,
    default: 400.0,
    integer: false,
};

const DEPTH: ParamSpec = ParamSpec {
    address: "/shaper/depth",
    label: "Depth",
    min: 10.0,
    max: 500.0,
    default: 400.0,
    integer: false,
};

const HEIGHT_MULTIPLIER: ParamSpec = ParamSpec {
    address: "/shaper/height_multiplier",
    label: "Height Multiplier",
    min: 0.0,
    max: 500.0,
    default: 100.0,
    integer: false,
};

const PLANE_PARAMS: [ParamSpec; 3] = [WIDTH, DEPTH, HEIGHT_MULTIPLIER];

pub struct PlaneShaper {
    base: ShaperBase,
}

impl PlaneShaper {
    pub fn new(mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            base: ShaperBase::new("Plane", mapper),
        }
    }
}

impl Shaper for PlaneShaper {
    fn base(&self) -> &ShaperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShaperBase {
        &mut self.base
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &PLANE_PARAMS
    }

    fn model_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()> {
        let (slices, freqs) = history_dims(history, 2)?;
        let mut surface = Surface::new(slices, freqs)?;
        add_grid_triangles(&mut surface, false, false, Winding::Standard)?;

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

        let x = WIDTH.read(params) * (idx as f32 / surface.x_size() as f32 - 0.5);
        let depth = DEPTH.read(params);
        let height = HEIGHT_MULTIPLIER.read(params);

        for i_f in 0..freqs {
            let z = depth * (0.5 - i_f as f32 / (freqs - 1) as f32);
            *surface.modify_vertex(idx, i_f)? = Vec3::new(x, height * spectrum[i_f], z);
            surface.set_vertex_colour(idx, i_f, mapper.map_spectrum(&spectrum, i_f))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourMapperKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_heights_follow_intensity() {
        let mut params = ParamHost::new();
        let mut shaper = PlaneShaper::new(ColourMapperKind::White.instance());
        shaper.initialise(&mut params);
        let history = SpectrumHistory::new(vec![vec![0.0, 0.5, 1.0]; 2]).unwrap();
        shaper.create_surface(&history, &params).unwrap();

        let surface = shaper.base().surfaces.whole();
        assert_eq!(surface.triangle_count(), 4);
        let ys: Vec<f32> = (0..3).map(|y| surface.vertex(0, y).unwrap().y).collect();
        assert_eq!(ys, vec![0.0, 50.0, 100.0]);

        let v = surface.vertex(1, 0).unwrap();
        assert_relative_eq!(v.x, 0.0);
        assert_relative_eq!(v.z, 200.0);
        assert_relative_eq!(surface.vertex(0, 2).unwrap().z, -200.0);
    }

    #[test]
    fn test_no_rotation() {
        let mut shaper = PlaneShaper::new(ColourMapperKind::White.instance());
        shaper.update(45.0);
        assert_eq!(shaper.model_matrix(), Mat4::IDENTITY);
    }
}
