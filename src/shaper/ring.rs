//! Torus-like ring: one circle per time-slice, swept around the Y axis.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::base::{add_grid_triangles, checked_row, history_dims, shape_all, Winding};
use super::{fold_frequency, Shaper, ShaperBase, SurfaceSet};
use crate::colour::ColourMapper;
use crate::error::{Result, SculptError};
use crate::geom::Surface;
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

/// Vertical offset of each split half
const SPLIT_OFFSET: f32 = 50.0;

pub(super) const TORUS_RADIUS: ParamSpec = ParamSpec {
    address: "/shaper/torus_radius",
    label: "Torus Radius",
    min: 0.0,
    max: 1000.0,
    default: 200.0,
    integer: false,
};

pub(super) const RING_RADIUS: ParamSpec = ParamSpec {
    address: "/shaper/ring_radius",
    label: "Ring Radius",
    min: 0.0,
    max: 200.0,
    default: 20.0,
    integer: false,
};

pub(super) const RING_MULTIPLIER: ParamSpec = ParamSpec {
    address: "/shaper/ring_multiplier",
    label: "Ring Multiplier",
    min: 0.0,
    max: 10.0,
    default: 1.5,
    integer: false,
};

pub(super) const REVOLUTIONS: ParamSpec = ParamSpec {
    address: "/shaper/revolutions",
    label: "Revolutions",
    min: 0.0,
    max: 8.0,
    default: 0.0,
    integer: true,
};

pub(super) const RING_PARAMS: [ParamSpec; 4] =
    [TORUS_RADIUS, RING_RADIUS, RING_MULTIPLIER, REVOLUTIONS];

/// Point on a ring cross-section in the XY plane
pub(super) fn circle_point(radius: f32, angle_deg: f32) -> Vec3 {
    let a = angle_deg.to_radians();
    Vec3::new(radius * a.cos(), radius * a.sin(), 0.0)
}

/// Ring with the spectrum mirrored around each cross-section.
///
/// Revolutions twist the pattern along the sweep by shifting the frequency
/// index. Split mode shows the ring as two halves pulled apart vertically.
pub struct RingShaper {
    base: ShaperBase,
}

impl RingShaper {
    pub fn new(mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            base: ShaperBase::new("Ring", mapper),
        }
    }
}

impl Shaper for RingShaper {
    fn base(&self) -> &ShaperBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShaperBase {
        &mut self.base
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &RING_PARAMS
    }

    fn supports_split(&self) -> bool {
        true
    }

    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()> {
        let (slices, freqs) = history_dims(history, 1)?;
        let ring_size = freqs * 2;
        let half_size = freqs + 1;

        let mut whole = Surface::new(slices, ring_size)?;
        let mut upper = Surface::new(slices, half_size)?;
        let mut lower = Surface::new(slices, half_size)?;
        add_grid_triangles(&mut whole, true, true, Winding::Standard)?;
        add_grid_triangles(&mut upper, true, true, Winding::Standard)?;
        add_grid_triangles(&mut lower, true, true, Winding::Standard)?;

        self.base.surfaces = SurfaceSet::Split {
            whole,
            upper,
            lower,
        };
        shape_all(history, |idx, row| self.update_surface(idx, row, params))?;
        self.base.surfaces.flush();
        Ok(())
    }

    fn update_surface(&mut self, idx: usize, spectrum: &[f32], params: &ParamHost) -> Result<()> {
        let SurfaceSet::Split {
            whole,
            upper,
            lower,
        } = &mut self.base.surfaces
        else {
            return Err(SculptError::invalid("ring surface has not been created"));
        };
        let ring_size = whole.y_size();
        let freqs = ring_size / 2;
        let spectrum = checked_row(whole, idx, spectrum, freqs)?;

        let torus_radius = TORUS_RADIUS.read(params);
        let ring_radius = RING_RADIUS.read(params);
        let multiplier = RING_MULTIPLIER.read(params);
        let revolutions = REVOLUTIONS.read(params);

        let t = idx as f32 / whole.x_size() as f32;
        let mtx = Mat4::from_rotation_y((t * 360.0).to_radians())
            * Mat4::from_translation(Vec3::new(torus_radius, 0.0, 0.0));

        for i_f in 0..ring_size {
            let ang_f = 360.0 * i_f as f32 / (ring_size - 1) as f32;
            let shifted = (i_f as f32 + t * ring_size as f32 * revolutions) as usize;
            let idx_f = fold_frequency(shifted, freqs);

            let r = ring_radius * (1.0 + (multiplier - 1.0) * spectrum[idx_f]);
            let v = mtx.transform_point3(circle_point(r, ang_f));
            let colour = self.base.mapper.map_spectrum(&spectrum, idx_f);

            *whole.modify_vertex(idx, i_f)? = v;
            whole.set_vertex_colour(idx, i_f, colour)?;

            if i_f <= freqs {
                *upper.modify_vertex(idx, i_f)? = v + Vec3::Y * SPLIT_OFFSET;
                upper.set_vertex_colour(idx, i_f, colour)?;
            }
            let i_f2 = (i_f + freqs) % (freqs + 1);
            *lower.modify_vertex(idx, i_f2)? = v - Vec3::Y * SPLIT_OFFSET;
            lower.set_vertex_colour(idx, i_f2, colour)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourMapperKind;
    use approx::assert_relative_eq;

    fn ring(history: &SpectrumHistory, params: &mut ParamHost) -> RingShaper {
        let mut shaper = RingShaper::new(ColourMapperKind::White.instance());
        shaper.initialise(params);
        shaper.create_surface(history, params).unwrap();
        shaper
    }

    #[test]
    fn test_quiet_slice_is_a_circle() {
        let mut params = ParamHost::new();
        let shaper = ring(&SpectrumHistory::zeroed(4, 4), &mut params);
        let surface = shaper.base().surfaces.whole();

        assert_eq!((surface.x_size(), surface.y_size()), (4, 8));
        assert_eq!(surface.triangle_count(), 2 * 4 * 8);
        let centre = Vec3::new(200.0, 0.0, 0.0);
        for y in 0..8 {
            let v = surface.vertex(0, y).unwrap();
            assert_relative_eq!(v.distance(centre), 20.0, epsilon = 1e-3);
            assert_relative_eq!(v.z, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_intensity_scales_radius() {
        let mut params = ParamHost::new();
        let history = SpectrumHistory::new(vec![vec![1.0; 3], vec![0.0; 3]]).unwrap();
        let shaper = ring(&history, &mut params);
        let surface = shaper.base().surfaces.whole();

        let centre = Vec3::new(200.0, 0.0, 0.0);
        // r = 20 * (1 + 0.5 * 1.0)
        assert_relative_eq!(surface.vertex(0, 2).unwrap().distance(centre), 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_split_halves_are_offset() {
        let mut params = ParamHost::new();
        let mut shaper = ring(&SpectrumHistory::zeroed(3, 4), &mut params);
        let SurfaceSet::Split { whole, upper, lower } = &shaper.base().surfaces else {
            panic!("ring keeps split surfaces");
        };
        assert_eq!(upper.y_size(), 5);
        assert_eq!(lower.y_size(), 5);

        let w = whole.vertex(1, 3).unwrap();
        assert_relative_eq!(upper.vertex(1, 3).unwrap().y, w.y + 50.0, epsilon = 1e-4);
        // Row 3 of the whole ring lands in row (3 + 4) % 5 = 2 of the lower half
        assert_relative_eq!(lower.vertex(1, 2).unwrap().y, w.y - 50.0, epsilon = 1e-4);
        assert_relative_eq!(lower.vertex(1, 2).unwrap().x, w.x, epsilon = 1e-4);

        assert_eq!(shaper.render().len(), 1);
        shaper.set_split_mode(true);
        assert_eq!(shaper.render().len(), 2);
    }

    #[test]
    fn test_row_length_mismatch() {
        let mut params = ParamHost::new();
        let mut shaper = ring(&SpectrumHistory::zeroed(4, 4), &mut params);
        assert!(shaper.update_surface(0, &[0.0; 3], &params).is_err());
    }
}
