use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::config::LoadOptions;
use crate::error::{lookup, GlbError, Result};
use crate::glb::GlbContainer;
use crate::gltf::SceneDescription;
use crate::resolver;
use crate::scene_graph::{self, Scene};

#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize)]
pub struct BufferId(pub usize);

#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize)]
pub struct BufferViewId(pub usize);

#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize)]
pub struct AccessorId(pub usize);

#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize)]
pub struct MaterialId(pub usize);

#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize)]
pub struct MeshId(pub usize);

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    SignedByte = 5120,
    UnsignedByte = 5121,
    SignedShort = 5122,
    UnsignedShort = 5123,
    SignedInt = 5124,
    UnsignedInt = 5125,
    Float = 5126,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::SignedByte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::SignedShort),
            5123 => Some(Self::UnsignedShort),
            5124 => Some(Self::SignedInt),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    // size in bytes
    pub fn size(self) -> usize {
        match self {
            ComponentType::SignedByte => 1,
            ComponentType::UnsignedByte => 1,
            ComponentType::SignedShort => 2,
            ComponentType::UnsignedShort => 2,
            ComponentType::SignedInt => 4,
            ComponentType::UnsignedInt => 4,
            ComponentType::Float => 4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorShape {
    #[serde(rename = "SCALAR")]
    Scalar,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT2")]
    Mat2,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AccessorShape {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            AccessorShape::Scalar => "SCALAR",
            AccessorShape::Vec2 => "VEC2",
            AccessorShape::Vec3 => "VEC3",
            AccessorShape::Vec4 => "VEC4",
            AccessorShape::Mat2 => "MAT2",
            AccessorShape::Mat3 => "MAT3",
            AccessorShape::Mat4 => "MAT4",
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            AccessorShape::Scalar => 1,
            AccessorShape::Vec2 => 2,
            AccessorShape::Vec3 => 3,
            AccessorShape::Vec4 => 4,
            AccessorShape::Mat2 => 4,
            AccessorShape::Mat3 => 9,
            AccessorShape::Mat4 => 16,
        }
    }
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BufferViewTarget {
    ArrayBuffer = 34962,
    ElementArrayBuffer = 34963,
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum DrawMode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    #[default]
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

impl DrawMode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    #[serde(rename = "OPAQUE")]
    Opaque,
    #[serde(rename = "MASK")]
    Mask,
    #[serde(rename = "BLEND")]
    Blend,
}

/// A texture reference carried through without looking at the texture,
/// image or sampler it names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextureRef {
    pub index: usize,
    #[serde(rename = "texCoord", default)]
    pub tex_coord: usize,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Every buffer aliases the BIN chunk, so only the declared length is kept.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub name: Option<String>,
    pub byte_length: usize,
}

#[derive(Debug, Clone)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: BufferId,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferViewTarget>,
}

impl BufferView {
    /// Distance between consecutive elements of `element_size` bytes.
    pub fn stride_for(&self, element_size: usize) -> usize {
        self.byte_stride.unwrap_or(0).max(element_size)
    }
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub name: Option<String>,
    pub buffer_view: BufferViewId,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub shape: AccessorShape,
    pub count: usize,
    pub normalized: bool,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

impl Accessor {
    pub fn element_size(&self) -> usize {
        self.shape.component_count() * self.component_type.size()
    }

    /// Size of the tightly packed data.
    pub fn packed_length(&self) -> usize {
        self.count * self.element_size()
    }

    /// Bytes covered inside the buffer view, counting from `byte_offset`.
    pub fn span(&self, stride: usize) -> usize {
        match self.count {
            0 => 0,
            n => (n - 1) * stride + self.element_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub base_color_texture: Option<TextureRef>,
    pub metallic_roughness_texture: Option<TextureRef>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            base_color_texture: None,
            metallic_roughness_texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub double_sided: bool,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub emissive_factor: [f32; 3],
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub normal_texture: Option<TextureRef>,
    pub occlusion_texture: Option<TextureRef>,
    pub emissive_texture: Option<TextureRef>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "material".to_string(),
            double_sided: false,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            emissive_factor: [0.0, 0.0, 0.0],
            pbr_metallic_roughness: PbrMetallicRoughness::default(),
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub attributes: BTreeMap<String, AccessorId>,
    pub indices: Option<AccessorId>,
    pub material: Option<MaterialId>,
    pub mode: DrawMode,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

/// A fully resolved GLB asset.
///
/// Everything except the scene graph is stored in flat collections and
/// referenced by id; the ids handed out by a `Model` are always in range for
/// that model.
#[derive(Debug)]
pub struct Model {
    pub version: u32,
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub scene: Scene,
    /// Animation declarations, uninterpreted.
    pub animations: Vec<serde_json::Value>,
    /// The BIN chunk every buffer aliases.
    pub binary: Vec<u8>,
}

#[derive(Serialize, Debug)]
pub struct ModelSummary {
    pub version: u32,
    pub binary_bytes: usize,
    pub buffer_views: usize,
    pub accessors: usize,
    pub materials: Vec<String>,
    pub meshes: Vec<String>,
    pub primitives: usize,
    pub root_nodes: usize,
    pub nodes: Vec<String>,
    pub animations: usize,
}

impl Model {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Self::from_slice_with(data, &LoadOptions::default())
    }

    pub fn from_slice_with(data: &[u8], options: &LoadOptions) -> Result<Self> {
        let glb = GlbContainer::parse_with(data, options)?;
        let desc = SceneDescription::from_slice(glb.json)?;

        let resolved = resolver::resolve(&desc, glb.bin.len())?;
        let scene = scene_graph::build_scene(&desc.nodes, &desc.scenes, resolved.meshes.len())?;

        Ok(Self {
            version: glb.version,
            buffers: resolved.buffers,
            buffer_views: resolved.buffer_views,
            accessors: resolved.accessors,
            materials: resolved.materials,
            meshes: resolved.meshes,
            scene,
            animations: desc.animations,
            binary: glb.bin.to_vec(),
        })
    }

    pub fn accessor(&self, id: AccessorId) -> Option<&Accessor> {
        self.accessors.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    /// The accessor's elements as tightly packed bytes.
    ///
    /// Borrowed from the BIN chunk unless the buffer view interleaves other
    /// data, in which case the elements are copied out.
    pub fn accessor_data(&self, id: AccessorId) -> Result<Cow<'_, [u8]>> {
        let accessor = lookup(&self.accessors, "accessor", id.0)?;
        let view = lookup(&self.buffer_views, "bufferView", accessor.buffer_view.0)?;

        let element_size = accessor.element_size();
        let stride = view.stride_for(element_size);
        let span = accessor.span(stride);
        let view_end = view.byte_offset + view.byte_length;
        let start = view.byte_offset + accessor.byte_offset;
        let end = start + span;

        if end > view_end || view_end > self.binary.len() {
            return Err(GlbError::AccessorOutOfBounds {
                accessor: id.0,
                end: accessor.byte_offset + span,
                view_length: view.byte_length,
            });
        }

        let slice = &self.binary[start..end];
        if stride == element_size {
            return Ok(Cow::Borrowed(slice));
        }

        let mut data = Vec::with_capacity(accessor.packed_length());
        for element in slice.chunks(stride) {
            data.extend_from_slice(&element[..element_size]);
        }
        Ok(Cow::Owned(data))
    }

    /// Decode each element of an accessor with `f`.
    pub fn read_elements<F, T>(&self, id: AccessorId, f: F) -> Result<Vec<T>>
    where
        F: Fn(&[u8]) -> T,
    {
        let accessor = lookup(&self.accessors, "accessor", id.0)?;
        let data = self.accessor_data(id)?;
        let element_size = accessor.element_size();
        if element_size == 0 {
            return Ok(vec![]);
        }
        Ok(data.chunks_exact(element_size).map(f).collect())
    }

    pub fn read_indices(&self, id: AccessorId) -> Result<Vec<u32>> {
        let accessor = lookup(&self.accessors, "accessor", id.0)?;
        if accessor.shape != AccessorShape::Scalar {
            return Err(GlbError::UnsupportedShapeType {
                accessor: id.0,
                shape: accessor.shape.type_name().to_string(),
            });
        }
        match accessor.component_type {
            ComponentType::UnsignedByte => self.read_elements(id, |buf| buf[0] as u32),
            ComponentType::UnsignedShort => {
                self.read_elements(id, |buf| u16::from_le_bytes([buf[0], buf[1]]) as u32)
            }
            ComponentType::UnsignedInt => {
                self.read_elements(id, |buf| u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
            }
            other => Err(GlbError::UnsupportedComponentType {
                accessor: id.0,
                component_type: other as u32,
            }),
        }
    }

    /// Components of a float or normalized-integer accessor as `f32`,
    /// flattened element by element.
    pub fn read_f32(&self, id: AccessorId) -> Result<Vec<f32>> {
        let accessor = lookup(&self.accessors, "accessor", id.0)?;
        let data = self.accessor_data(id)?;
        let values = match (accessor.component_type, accessor.normalized) {
            (ComponentType::Float, _) => data
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<f32>)
                .collect(),
            (ComponentType::UnsignedByte, true) => {
                data.iter().map(|&b| b as f32 / 255.0).collect()
            }
            (ComponentType::SignedByte, true) => data
                .iter()
                .map(|&b| (b as i8 as f32 / 127.0).max(-1.0))
                .collect(),
            (ComponentType::UnsignedShort, true) => data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32 / 65535.0)
                .collect(),
            (ComponentType::SignedShort, true) => data
                .chunks_exact(2)
                .map(|c| (i16::from_le_bytes([c[0], c[1]]) as f32 / 32767.0).max(-1.0))
                .collect(),
            (other, _) => {
                return Err(GlbError::UnsupportedComponentType {
                    accessor: id.0,
                    component_type: other as u32,
                })
            }
        };
        Ok(values)
    }

    pub fn summary(&self) -> ModelSummary {
        let nodes = self.scene.flatten();
        ModelSummary {
            version: self.version,
            binary_bytes: self.binary.len(),
            buffer_views: self.buffer_views.len(),
            accessors: self.accessors.len(),
            materials: self.materials.iter().map(|m| m.name.clone()).collect(),
            meshes: self.meshes.iter().map(|m| m.name.clone()).collect(),
            primitives: self.meshes.iter().map(|m| m.primitives.len()).sum(),
            root_nodes: self.scene.nodes.len(),
            nodes: nodes.iter().map(|n| n.name.clone()).collect(),
            animations: self.animations.len(),
        }
    }
}
