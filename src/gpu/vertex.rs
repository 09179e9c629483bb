use std::borrow::Cow;

use crate::error::{GlbError, Result};
use crate::glb::align_to_4;
use crate::model::{AccessorShape, ComponentType, DrawMode};

pub const POSITION_LOCATION: u32 = 0;
pub const NORMAL_LOCATION: u32 = 1;
pub const TANGENT_LOCATION: u32 = 2;
pub const TEXCOORD_0_LOCATION: u32 = 3;
pub const TEXCOORD_1_LOCATION: u32 = 4;
pub const COLOR_0_LOCATION: u32 = 5;
pub const JOINTS_0_LOCATION: u32 = 6;
pub const WEIGHTS_0_LOCATION: u32 = 7;

/// Shader location for a standard attribute semantic. Custom semantics have none.
pub fn attribute_location(semantic: &str) -> Option<u32> {
    match semantic {
        "POSITION" => Some(POSITION_LOCATION),
        "NORMAL" => Some(NORMAL_LOCATION),
        "TANGENT" => Some(TANGENT_LOCATION),
        "TEXCOORD_0" => Some(TEXCOORD_0_LOCATION),
        "TEXCOORD_1" => Some(TEXCOORD_1_LOCATION),
        "COLOR_0" => Some(COLOR_0_LOCATION),
        "JOINTS_0" => Some(JOINTS_0_LOCATION),
        "WEIGHTS_0" => Some(WEIGHTS_0_LOCATION),
        _ => None,
    }
}

pub fn vertex_format(
    component_type: ComponentType,
    shape: AccessorShape,
    normalized: bool,
) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat::*;
    use AccessorShape::{Scalar, Vec2, Vec3, Vec4};
    use ComponentType::*;

    let format = match (component_type, shape, normalized) {
        (Float, Scalar, _) => Float32,
        (Float, Vec2, _) => Float32x2,
        (Float, Vec3, _) => Float32x3,
        (Float, Vec4, _) => Float32x4,

        (UnsignedInt, Scalar, _) => Uint32,
        (UnsignedInt, Vec2, _) => Uint32x2,
        (UnsignedInt, Vec3, _) => Uint32x3,
        (UnsignedInt, Vec4, _) => Uint32x4,
        (SignedInt, Scalar, _) => Sint32,
        (SignedInt, Vec2, _) => Sint32x2,
        (SignedInt, Vec3, _) => Sint32x3,
        (SignedInt, Vec4, _) => Sint32x4,

        // 3-component 8/16-bit data is uploaded padded to 4 components
        (UnsignedShort, Vec2, false) => Uint16x2,
        (UnsignedShort, Vec3 | Vec4, false) => Uint16x4,
        (UnsignedShort, Vec2, true) => Unorm16x2,
        (UnsignedShort, Vec3 | Vec4, true) => Unorm16x4,
        (SignedShort, Vec2, false) => Sint16x2,
        (SignedShort, Vec3 | Vec4, false) => Sint16x4,
        (SignedShort, Vec2, true) => Snorm16x2,
        (SignedShort, Vec3 | Vec4, true) => Snorm16x4,

        (UnsignedByte, Vec2, false) => Uint8x2,
        (UnsignedByte, Vec3 | Vec4, false) => Uint8x4,
        (UnsignedByte, Vec2, true) => Unorm8x2,
        (UnsignedByte, Vec3 | Vec4, true) => Unorm8x4,
        (SignedByte, Vec2, false) => Sint8x2,
        (SignedByte, Vec3 | Vec4, false) => Sint8x4,
        (SignedByte, Vec2, true) => Snorm8x2,
        (SignedByte, Vec3 | Vec4, true) => Snorm8x4,

        // no 8/16-bit scalar formats, and matrices span several locations
        _ => return None,
    };
    Some(format)
}

/// Vertex buffer strides must be a multiple of 4 bytes.
pub fn vertex_stride(element_size: usize) -> usize {
    align_to_4(element_size)
}

/// Re-lay tightly packed elements at `stride`, zero filling the gap.
pub fn pad_elements(data: &[u8], element_size: usize, stride: usize) -> Cow<'_, [u8]> {
    if stride == element_size || element_size == 0 {
        return Cow::Borrowed(data);
    }
    let mut padded = Vec::with_capacity(data.len() / element_size * stride);
    for element in data.chunks_exact(element_size) {
        padded.extend_from_slice(element);
        padded.resize(padded.len() + stride - element_size, 0);
    }
    Cow::Owned(padded)
}

pub fn topology(mode: DrawMode) -> Result<wgpu::PrimitiveTopology> {
    match mode {
        DrawMode::Points => Ok(wgpu::PrimitiveTopology::PointList),
        DrawMode::Lines => Ok(wgpu::PrimitiveTopology::LineList),
        DrawMode::LineStrip => Ok(wgpu::PrimitiveTopology::LineStrip),
        DrawMode::Triangles => Ok(wgpu::PrimitiveTopology::TriangleList),
        DrawMode::TriangleStrip => Ok(wgpu::PrimitiveTopology::TriangleStrip),
        DrawMode::LineLoop | DrawMode::TriangleFan => Err(GlbError::UnsupportedDrawMode(mode as u32)),
    }
}

/// 8-bit indices are uploaded widened to 16 bits.
pub fn index_format(component_type: ComponentType) -> Option<wgpu::IndexFormat> {
    match component_type {
        ComponentType::UnsignedByte | ComponentType::UnsignedShort => Some(wgpu::IndexFormat::Uint16),
        ComponentType::UnsignedInt => Some(wgpu::IndexFormat::Uint32),
        _ => None,
    }
}
