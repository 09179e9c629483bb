//! Turns a [`crate::Model`] into GPU buffers and per-primitive vertex layouts.

pub mod bundle;
pub mod device;
pub mod vertex;

pub use bundle::{BufferRole, IndexBinding, PrimitiveLayout, ResourceBuilder, ResourceBundle, VertexBinding};
pub use device::{headless_device, GpuDevice};
