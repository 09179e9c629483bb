#![allow(dead_code)]

use std::cell::RefCell;

use glb_scene::glb::write_container;
use glb_scene::GpuDevice;

/// Assemble a GLB container from a JSON document and a BIN payload.
pub fn glb(json: &serde_json::Value, bin: &[u8]) -> Vec<u8> {
    write_container(json.to_string().as_bytes(), bin)
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// A triangle's positions (36 bytes) followed by three u16 indices (6 bytes,
/// padded to 8).
pub fn triangle_bin() -> Vec<u8> {
    let mut bin = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    bin.extend_from_slice(bytemuck::cast_slice(&[0u16, 1, 2]));
    bin.extend_from_slice(&[0, 0]);
    bin
}

/// Buffer views and accessors over [`triangle_bin`]: accessor 0 is POSITION,
/// accessor 1 the indices.
pub fn triangle_json(meshes: serde_json::Value, nodes: serde_json::Value, roots: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "asset": {"version": "2.0"},
        "buffers": [{"byteLength": 44}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0, 0, 0], "max": [1, 1, 0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "meshes": meshes,
        "nodes": nodes,
        "scenes": [{"nodes": roots}]
    })
}

#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    pub id: usize,
    pub label: String,
    pub usage: wgpu::BufferUsages,
    pub contents: Vec<u8>,
}

/// Records every upload instead of talking to a GPU.
#[derive(Default)]
pub struct RecordingDevice {
    pub uploads: RefCell<Vec<RecordedBuffer>>,
}

impl RecordingDevice {
    pub fn upload_count(&self) -> usize {
        self.uploads.borrow().len()
    }
}

impl GpuDevice for RecordingDevice {
    type Buffer = RecordedBuffer;

    fn upload_buffer(&self, label: &str, usage: wgpu::BufferUsages, contents: &[u8]) -> RecordedBuffer {
        let mut uploads = self.uploads.borrow_mut();
        let buffer = RecordedBuffer {
            id: uploads.len(),
            label: label.to_string(),
            usage,
            contents: contents.to_vec(),
        };
        uploads.push(buffer.clone());
        buffer
    }
}
