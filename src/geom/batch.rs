//! Draw batches handed from surfaces to the GPU renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::colour::Rgba;

/// Vertex data for sculpture meshes (position + normal + RGBA colour)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub colour: [f32; 4],
}

impl GpuVertex {
    pub fn new(position: Vec3, normal: Vec3, colour: Rgba) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            colour: colour.to_f32(),
        }
    }
}

/// Primitive topology of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    PointList,
    LineStrip,
    TriangleList,
}

/// Unindexed vertex list for one surface in one render mode
#[derive(Debug, Clone)]
pub struct RenderBatch {
    pub topology: Topology,
    pub vertices: Vec<GpuVertex>,
}

impl RenderBatch {
    pub fn with_capacity(topology: Topology, capacity: usize) -> Self {
        Self {
            topology,
            vertices: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
