//! Shapers turn spectrum history rows into surface geometry.
//!
//! Each family owns a [`ShaperBase`] holding its surfaces, colour mapper and
//! render state; the [`Shaper`] trait supplies the shared behaviour on top of
//! the two family-specific operations, [`Shaper::create_surface`] and
//! [`Shaper::update_surface`].

mod base;
mod cylinder;
mod plane;
mod ring;
mod ring_legacy;
mod sphere;

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use glam::Mat4;

pub use base::{ShaperBase, SurfaceSet};
pub use cylinder::CylinderShaper;
pub use plane::PlaneShaper;
pub use ring::RingShaper;
pub use ring_legacy::RingLegacyShaper;
pub use sphere::SphereShaper;

use crate::colour::ColourMapper;
use crate::error::{Result, SculptError};
use crate::geom::{RenderBatch, RenderMode, Surface};
use crate::params::{ParamHost, ParamSpec};
use crate::spectrum::SpectrumHistory;

/// Map an absolute frequency index onto `0..count`, mirroring every other lap.
///
/// `fold(i, n)` runs `0, 1, .. n-1, n-1, .. 1, 0, 0, 1, ..` so a closed ring of
/// `2n` vertices shows the spectrum once up and once back down.
pub fn fold_frequency(idx: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let m = idx % (2 * count);
    if m >= count {
        2 * count - 1 - m
    } else {
        m
    }
}

pub trait Shaper: Send {
    fn base(&self) -> &ShaperBase;

    fn base_mut(&mut self) -> &mut ShaperBase;

    /// Sliders this family exposes under `/shaper/...`
    fn param_specs(&self) -> &'static [ParamSpec];

    /// Rebuild all surfaces from scratch: allocate, add the fixed topology,
    /// shape every slice, then flush the normals.
    fn create_surface(&mut self, history: &SpectrumHistory, params: &ParamHost) -> Result<()>;

    /// Reshape slice `idx` only. Normals are flushed later by [`Shaper::update`].
    fn update_surface(&mut self, idx: usize, spectrum: &[f32], params: &ParamHost) -> Result<()>;

    /// Rigid transform applied when drawing
    fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y((-self.base().angle).to_radians())
    }

    /// Whether the family can show its surface as two offset halves
    fn supports_split(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    /// Register this family's parameters and reset to a placeholder surface
    fn initialise(&mut self, params: &mut ParamHost) {
        for spec in self.param_specs() {
            params.register(spec.parameter());
        }
        self.base_mut().reset_surfaces();
    }

    fn deinitialise(&mut self, params: &mut ParamHost) {
        for spec in self.param_specs() {
            params.remove(spec.address);
        }
    }

    fn parameters(&self) -> Vec<&'static str> {
        self.param_specs().iter().map(|spec| spec.address).collect()
    }

    fn colour_mapper(&self) -> Arc<dyn ColourMapper> {
        Arc::clone(&self.base().mapper)
    }

    /// Takes effect at the next shaping of each slice
    fn set_colour_mapper(&mut self, mapper: Arc<dyn ColourMapper>) {
        self.base_mut().mapper = mapper;
    }

    /// Store the animation angle (degrees) and flush pending normals
    fn update(&mut self, angle: f32) {
        let base = self.base_mut();
        base.angle = angle;
        base.surfaces.flush();
    }

    fn render_mode(&self) -> RenderMode {
        self.base().render_mode
    }

    fn set_render_mode(&mut self, mode: RenderMode) {
        self.base_mut().render_mode = mode;
    }

    fn split_mode(&self) -> bool {
        self.base().split_mode
    }

    /// Ignored by families without split support
    fn set_split_mode(&mut self, split: bool) {
        let supported = self.supports_split();
        self.base_mut().split_mode = split && supported;
    }

    /// Surfaces currently shown (two halves in split mode)
    fn active_surfaces(&self) -> Vec<&Surface> {
        self.base().active_surfaces()
    }

    fn render(&self) -> Vec<RenderBatch> {
        let mode = self.base().render_mode;
        self.active_surfaces()
            .into_iter()
            .map(|surface| surface.render(mode))
            .collect()
    }

    fn write_stl(&self, w: &mut dyn Write, scale: f32) -> Result<()> {
        for surface in self.active_surfaces() {
            surface.write_stl(w, scale)?;
        }
        Ok(())
    }

    /// All active surfaces in one OBJ file, face indices offset per surface
    fn write_obj(&self, w: &mut dyn Write, scale: f32) -> Result<()> {
        let mut offset = 0;
        for surface in self.active_surfaces() {
            surface.write_obj_with_offset(w, scale, offset)?;
            offset += surface.vertex_count();
        }
        Ok(())
    }
}

/// Registry of shaper families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaperKind {
    #[default]
    Ring,
    RingLegacy,
    Sphere,
    Cylinder,
    Plane,
}

impl ShaperKind {
    pub const ALL: [ShaperKind; 5] = [
        ShaperKind::Ring,
        ShaperKind::RingLegacy,
        ShaperKind::Sphere,
        ShaperKind::Cylinder,
        ShaperKind::Plane,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Ring => "RING",
            Self::RingLegacy => "RING_LEGACY",
            Self::Sphere => "SPHERE",
            Self::Cylinder => "CYLINDER",
            Self::Plane => "PLANE",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Fresh, uninitialised shaper of this family
    pub fn create(self, mapper: Arc<dyn ColourMapper>) -> Box<dyn Shaper> {
        match self {
            Self::Ring => Box::new(RingShaper::new(mapper)),
            Self::RingLegacy => Box::new(RingLegacyShaper::new(mapper)),
            Self::Sphere => Box::new(SphereShaper::new(mapper)),
            Self::Cylinder => Box::new(CylinderShaper::new(mapper)),
            Self::Plane => Box::new(PlaneShaper::new(mapper)),
        }
    }
}

impl fmt::Display for ShaperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ring => "Ring",
            Self::RingLegacy => "Ring (legacy)",
            Self::Sphere => "Sphere",
            Self::Cylinder => "Cylinder",
            Self::Plane => "Plane",
        };
        f.write_str(name)
    }
}

impl FromStr for ShaperKind {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.key() == wanted)
            .ok_or_else(|| SculptError::invalid(format!("unknown shaper '{}'", s)))
    }
}
