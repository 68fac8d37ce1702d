//! The sculpture scene: active shaper, spectrum history and parameters.

mod scheduler;
mod system;

pub use scheduler::RebuildScheduler;
pub use system::{SculptureSettings, SculptureSystem};
