//! Mesh storage and draw batches.

mod batch;
mod render_mode;
mod surface;

pub use batch::{GpuVertex, RenderBatch, Topology};
pub use render_mode::RenderMode;
pub use surface::{face_normal, Surface, Triangle};
