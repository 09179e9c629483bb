//! Typed schema for the JSON chunk.
//!
//! Decoding into these records is the validating step: a field with the wrong
//! JSON type, or a missing required field, fails the whole document instead of
//! surfacing later as a bad lookup. Cross references are still plain indices
//! here; [`crate::resolver`] turns them into checked ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{AlphaMode, BufferViewTarget, TextureRef};

#[derive(Serialize, Deserialize, Debug)]
pub struct Asset {
    pub version: String,
    pub generator: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Buffer {
    pub name: Option<String>,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    pub uri: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: usize,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    #[serde(rename = "byteOffset")]
    pub byte_offset: Option<usize>,
    #[serde(rename = "byteStride")]
    pub byte_stride: Option<usize>,
    pub target: Option<BufferViewTarget>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Accessor {
    pub name: Option<String>,
    #[serde(rename = "bufferView")]
    pub buffer_view: usize,
    #[serde(rename = "byteOffset")]
    pub byte_offset: Option<usize>,
    // kept numeric so unknown codes are reported per accessor
    #[serde(rename = "componentType")]
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: String,
    pub normalized: Option<bool>,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PbrMetallicRoughness {
    #[serde(rename = "baseColorFactor")]
    pub base_color_factor: Option<[f64; 4]>,
    #[serde(rename = "metallicFactor")]
    pub metallic_factor: Option<f64>,
    #[serde(rename = "roughnessFactor")]
    pub roughness_factor: Option<f64>,
    #[serde(rename = "baseColorTexture")]
    pub base_color_texture: Option<TextureRef>,
    #[serde(rename = "metallicRoughnessTexture")]
    pub metallic_roughness_texture: Option<TextureRef>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Material {
    pub name: Option<String>,
    #[serde(rename = "pbrMetallicRoughness")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(rename = "normalTexture")]
    pub normal_texture: Option<TextureRef>,
    #[serde(rename = "occlusionTexture")]
    pub occlusion_texture: Option<TextureRef>,
    #[serde(rename = "emissiveTexture")]
    pub emissive_texture: Option<TextureRef>,
    #[serde(rename = "emissiveFactor")]
    pub emissive_factor: Option<[f64; 3]>,
    #[serde(rename = "alphaMode")]
    pub alpha_mode: Option<AlphaMode>,
    #[serde(rename = "alphaCutoff")]
    pub alpha_cutoff: Option<f64>,
    #[serde(rename = "doubleSided")]
    pub double_sided: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub translation: Option<[f64; 3]>,
    pub rotation: Option<[f64; 4]>,
    pub scale: Option<[f64; 3]>,
    /// Column-major.
    pub matrix: Option<[f64; 16]>,
    pub children: Option<Vec<usize>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Scene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SceneDescription {
    pub asset: Option<Asset>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews", default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub animations: Vec<serde_json::Value>,
}

impl SceneDescription {
    pub fn from_slice(json: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(json)
    }
}
