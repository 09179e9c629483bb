//! Loads binary glTF (GLB) assets into a typed scene graph and uploads their
//! geometry as GPU buffers.
//!
//! ```no_run
//! let model = glb_scene::load("box.glb")?;
//! for node in model.scene.flatten() {
//!     println!("{} -> {:?}", node.name, node.mesh);
//! }
//! # Ok::<(), glb_scene::GlbError>(())
//! ```

use std::fs;
use std::path::Path;

use log::info;

pub mod config;
pub mod error;
pub mod glb;
pub mod gltf;
pub mod gpu;
pub mod model;
pub mod resolver;
pub mod scene_graph;

pub use config::{BuildOptions, LoadOptions};
pub use error::{ChunkKind, GlbError, Result};
pub use gpu::{GpuDevice, PrimitiveLayout, ResourceBuilder, ResourceBundle};
pub use model::{
    Accessor, AccessorId, AccessorShape, AlphaMode, BufferId, BufferViewId, ComponentType, DrawMode, Material,
    MaterialId, Mesh, MeshId, Model, ModelSummary, Primitive, TextureRef,
};
pub use scene_graph::{Node, Scene};

/// Read and parse a GLB file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Model> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let model = Model::from_slice(&data)?;
    info!(
        "loaded {}: {} meshes, {} materials, {} root nodes",
        path.display(),
        model.meshes.len(),
        model.materials.len(),
        model.scene.nodes.len()
    );
    Ok(model)
}

/// Parse a GLB container already in memory.
pub fn load_bytes(data: &[u8]) -> Result<Model> {
    Model::from_slice(data)
}
