//! State shared by all shaper families.

use std::sync::Arc;

use crate::colour::{clamp_unit, ColourMapper};
use crate::error::{Result, SculptError};
use crate::geom::{RenderMode, Surface};
use crate::spectrum::SpectrumHistory;

/// Surfaces owned by a shaper
#[derive(Debug, Clone)]
pub enum SurfaceSet {
    Single(Surface),
    /// The whole ring plus two offset halves, all shaped together so that
    /// toggling split mode needs no rebuild
    Split {
        whole: Surface,
        upper: Surface,
        lower: Surface,
    },
}

impl SurfaceSet {
    /// Recompute dirty normals on every surface
    pub fn flush(&mut self) {
        match self {
            Self::Single(surface) => surface.update(),
            Self::Split {
                whole,
                upper,
                lower,
            } => {
                whole.update();
                upper.update();
                lower.update();
            }
        }
    }

    /// The full, unsplit surface
    pub fn whole(&self) -> &Surface {
        match self {
            Self::Single(surface) => surface,
            Self::Split { whole, .. } => whole,
        }
    }

    pub fn whole_mut(&mut self) -> &mut Surface {
        match self {
            Self::Single(surface) => surface,
            Self::Split { whole, .. } => whole,
        }
    }
}

pub struct ShaperBase {
    pub name: String,
    pub mapper: Arc<dyn ColourMapper>,
    pub surfaces: SurfaceSet,
    pub split_mode: bool,
    pub render_mode: RenderMode,
    /// Animation angle in degrees
    pub angle: f32,
}

impl ShaperBase {
    pub fn new(name: impl Into<String>, mapper: Arc<dyn ColourMapper>) -> Self {
        Self {
            name: name.into(),
            mapper,
            surfaces: SurfaceSet::Single(Surface::placeholder()),
            split_mode: false,
            render_mode: RenderMode::default(),
            angle: 0.0,
        }
    }

    pub fn reset_surfaces(&mut self) {
        self.surfaces = SurfaceSet::Single(Surface::placeholder());
    }

    pub fn active_surfaces(&self) -> Vec<&Surface> {
        match &self.surfaces {
            SurfaceSet::Split { upper, lower, .. } if self.split_mode => vec![upper, lower],
            set => vec![set.whole()],
        }
    }
}

/// History dimensions `(T, F)`, rejecting histories that cannot form a mesh
pub(crate) fn history_dims(history: &SpectrumHistory, min_freqs: usize) -> Result<(usize, usize)> {
    let (slices, freqs) = (history.len(), history.freq_count());
    if slices < 2 || freqs < min_freqs {
        return Err(SculptError::invalid(format!(
            "spectrum history of {}x{} is too small to shape",
            slices, freqs
        )));
    }
    Ok((slices, freqs))
}

/// Validate a slice against the surface and return it clamped to [0, 1]
pub(crate) fn checked_row(
    surface: &Surface,
    idx: usize,
    spectrum: &[f32],
    expected_freqs: usize,
) -> Result<Vec<f32>> {
    if idx >= surface.x_size() {
        return Err(SculptError::invalid(format!(
            "slice {} out of range (surface has {})",
            idx,
            surface.x_size()
        )));
    }
    if spectrum.len() != expected_freqs {
        return Err(SculptError::invalid(format!(
            "spectrum row has {} frequencies, surface expects {}",
            spectrum.len(),
            expected_freqs
        )));
    }
    Ok(spectrum.iter().copied().map(clamp_unit).collect())
}

/// Triangle winding per grid quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Winding {
    /// `(x0,y1,x1,y1,x0,y0)` and `(x1,y1,x1,y0,x0,y0)`
    Standard,
    /// `(x0,y1,x0,y0,x1,y1)` and `(x1,y1,x0,y0,x1,y0)`
    Cylinder,
}

/// Add two triangles per grid quad; wrapped axes also join the last row or
/// column back to the first
pub(crate) fn add_grid_triangles(
    surface: &mut Surface,
    wrap_x: bool,
    wrap_y: bool,
    winding: Winding,
) -> Result<()> {
    let (xs, ys) = (surface.x_size(), surface.y_size());
    let x_quads = if wrap_x { xs } else { xs - 1 };
    let y_quads = if wrap_y { ys } else { ys - 1 };

    for x0 in 0..x_quads {
        let x1 = (x0 + 1) % xs;
        for y0 in 0..y_quads {
            let y1 = (y0 + 1) % ys;
            match winding {
                Winding::Standard => {
                    surface.add_triangle(x0, y1, x1, y1, x0, y0)?;
                    surface.add_triangle(x1, y1, x1, y0, x0, y0)?;
                }
                Winding::Cylinder => {
                    surface.add_triangle(x0, y1, x0, y0, x1, y1)?;
                    surface.add_triangle(x1, y1, x0, y0, x1, y0)?;
                }
            }
        }
    }
    Ok(())
}

/// Shape every slice of `history` through `update`
pub(crate) fn shape_all<F>(history: &SpectrumHistory, mut update: F) -> Result<()>
where
    F: FnMut(usize, &[f32]) -> Result<()>,
{
    for (idx, row) in history.rows().enumerate() {
        update(idx, row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_triangle_counts() {
        let mut wrapped = Surface::new(4, 3).unwrap();
        add_grid_triangles(&mut wrapped, true, true, Winding::Standard).unwrap();
        assert_eq!(wrapped.triangle_count(), 2 * 4 * 3);

        let mut open = Surface::new(4, 3).unwrap();
        add_grid_triangles(&mut open, false, false, Winding::Standard).unwrap();
        assert_eq!(open.triangle_count(), 2 * 3 * 2);

        let mut tube = Surface::new(4, 3).unwrap();
        add_grid_triangles(&mut tube, true, false, Winding::Cylinder).unwrap();
        assert_eq!(tube.triangle_count(), 2 * 4 * 2);
    }

    #[test]
    fn test_checked_row_clamps() {
        let surface = Surface::new(2, 2).unwrap();
        let row = checked_row(&surface, 1, &[-1.0, f32::NAN, 0.5, 2.0], 4).unwrap();
        assert_eq!(row, vec![0.0, 0.0, 0.5, 1.0]);

        assert!(checked_row(&surface, 2, &[0.0; 4], 4).is_err());
        assert!(checked_row(&surface, 0, &[0.0; 3], 4).is_err());
    }
}
