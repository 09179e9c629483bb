use std::fmt;
use std::io;

use thiserror::Error;

/// Which of the two mandatory GLB chunks was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Json,
    Bin,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkKind::Json => f.write_str("JSON"),
            ChunkKind::Bin => f.write_str("BIN"),
        }
    }
}

/// Errors that can occur while loading a GLB container or building GPU
/// resources from it. Every variant is terminal for the call that produced it.
#[derive(Error, Debug)]
pub enum GlbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid GLB container: {0}")]
    InvalidContainer(String),

    #[error("Unsupported GLB version: {0}")]
    UnsupportedVersion(u32),

    #[error("GLB container has no {0} chunk")]
    MissingChunk(ChunkKind),

    #[error("Buffer {index} references external uri {uri:?}")]
    UnsupportedBuffer { index: usize, uri: String },

    #[error("{collection} index {index} out of range (len {len})")]
    IndexOutOfRange {
        collection: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Buffer view {view} ends at byte {end} but the binary chunk is {available} bytes")]
    BufferViewOutOfBounds {
        view: usize,
        end: usize,
        available: usize,
    },

    #[error("Accessor {accessor} ends at byte {end} but its buffer view is {view_length} bytes")]
    AccessorOutOfBounds {
        accessor: usize,
        end: usize,
        view_length: usize,
    },

    #[error("Document declares no scenes")]
    MissingScene,

    #[error("Accessor {accessor} has unsupported component type {component_type}")]
    UnsupportedComponentType { accessor: usize, component_type: u32 },

    #[error("Accessor {accessor} has unsupported shape {shape}")]
    UnsupportedShapeType { accessor: usize, shape: String },

    #[error("Unsupported primitive mode {0}")]
    UnsupportedDrawMode(u32),

    #[error("Node {node} is its own ancestor")]
    CyclicGraph { node: usize },

    #[error("Node {node} has more than one parent")]
    SharedNode { node: usize },
}

pub type Result<T> = std::result::Result<T, GlbError>;

/// Bounds-checked lookup that reports the collection name on failure.
pub(crate) fn lookup<'a, T>(items: &'a [T], collection: &'static str, index: usize) -> Result<&'a T> {
    items.get(index).ok_or(GlbError::IndexOutOfRange {
        collection,
        index,
        len: items.len(),
    })
}
