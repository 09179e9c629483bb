//! Turns the schema records of [`crate::gltf`] into checked, cross-referenced
//! model records. Nothing here recovers from a bad reference: the first one
//! aborts the load.

use std::collections::BTreeMap;

use log::warn;

use crate::error::{lookup, GlbError, Result};
use crate::gltf;
use crate::model::{
    Accessor, AccessorId, AccessorShape, Buffer, BufferId, BufferView, BufferViewId,
    ComponentType, DrawMode, Material, MaterialId, Mesh, PbrMetallicRoughness, Primitive,
};

pub struct Resolved {
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
}

pub fn resolve(desc: &gltf::SceneDescription, bin_length: usize) -> Result<Resolved> {
    let buffers = resolve_buffers(&desc.buffers, bin_length)?;
    let buffer_views = resolve_buffer_views(&desc.buffer_views, &buffers, bin_length)?;
    let accessors = resolve_accessors(&desc.accessors, &buffer_views)?;
    let materials = resolve_materials(&desc.materials);
    let meshes = resolve_meshes(&desc.meshes, accessors.len(), materials.len())?;

    Ok(Resolved {
        buffers,
        buffer_views,
        accessors,
        materials,
        meshes,
    })
}

fn resolve_buffers(buffers: &[gltf::Buffer], bin_length: usize) -> Result<Vec<Buffer>> {
    buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| {
            if let Some(uri) = &buffer.uri {
                return Err(GlbError::UnsupportedBuffer {
                    index,
                    uri: uri.clone(),
                });
            }
            if buffer.byte_length > bin_length {
                warn!(
                    "buffer {} declares {} bytes but the BIN chunk holds {}",
                    index, buffer.byte_length, bin_length
                );
            }
            Ok(Buffer {
                name: buffer.name.clone(),
                byte_length: buffer.byte_length,
            })
        })
        .collect()
}

fn resolve_buffer_views(views: &[gltf::BufferView], buffers: &[Buffer], bin_length: usize) -> Result<Vec<BufferView>> {
    views
        .iter()
        .enumerate()
        .map(|(index, view)| {
            lookup(buffers, "buffer", view.buffer)?;

            let byte_offset = view.byte_offset.unwrap_or(0);
            let end = byte_offset.saturating_add(view.byte_length);
            if end > bin_length {
                return Err(GlbError::BufferViewOutOfBounds {
                    view: index,
                    end,
                    available: bin_length,
                });
            }

            Ok(BufferView {
                name: view.name.clone(),
                buffer: BufferId(view.buffer),
                byte_offset,
                byte_length: view.byte_length,
                byte_stride: view.byte_stride,
                target: view.target,
            })
        })
        .collect()
}

fn resolve_accessors(accessors: &[gltf::Accessor], views: &[BufferView]) -> Result<Vec<Accessor>> {
    accessors
        .iter()
        .enumerate()
        .map(|(index, accessor)| {
            let view = lookup(views, "bufferView", accessor.buffer_view)?;

            let component_type = ComponentType::from_code(accessor.component_type).ok_or(
                GlbError::UnsupportedComponentType {
                    accessor: index,
                    component_type: accessor.component_type,
                },
            )?;
            let shape = AccessorShape::from_type_name(&accessor.accessor_type).ok_or_else(|| {
                GlbError::UnsupportedShapeType {
                    accessor: index,
                    shape: accessor.accessor_type.clone(),
                }
            })?;

            let resolved = Accessor {
                name: accessor.name.clone(),
                buffer_view: BufferViewId(accessor.buffer_view),
                byte_offset: accessor.byte_offset.unwrap_or(0),
                component_type,
                shape,
                count: accessor.count,
                normalized: accessor.normalized.unwrap_or(false),
                min: accessor.min.clone(),
                max: accessor.max.clone(),
            };

            let stride = view.stride_for(resolved.element_size());
            let end = accessor_end(&resolved, stride).unwrap_or(usize::MAX);
            if end > view.byte_length {
                return Err(GlbError::AccessorOutOfBounds {
                    accessor: index,
                    end,
                    view_length: view.byte_length,
                });
            }

            Ok(resolved)
        })
        .collect()
}

fn accessor_end(accessor: &Accessor, stride: usize) -> Option<usize> {
    let span = match accessor.count {
        0 => 0,
        n => (n - 1).checked_mul(stride)?.checked_add(accessor.element_size())?,
    };
    accessor.byte_offset.checked_add(span)
}

fn resolve_materials(materials: &[gltf::Material]) -> Vec<Material> {
    materials
        .iter()
        .map(|material| {
            let defaults = Material::default();
            let pbr = material
                .pbr_metallic_roughness
                .as_ref()
                .map(|pbr| {
                    let defaults = PbrMetallicRoughness::default();
                    PbrMetallicRoughness {
                        base_color_factor: pbr
                            .base_color_factor
                            .map(|f| f.map(|x| x as f32))
                            .unwrap_or(defaults.base_color_factor),
                        metallic_factor: pbr
                            .metallic_factor
                            .map_or(defaults.metallic_factor, |f| f as f32),
                        roughness_factor: pbr
                            .roughness_factor
                            .map_or(defaults.roughness_factor, |f| f as f32),
                        base_color_texture: pbr.base_color_texture.clone(),
                        metallic_roughness_texture: pbr.metallic_roughness_texture.clone(),
                    }
                })
                .unwrap_or_default();

            Material {
                name: material.name.clone().unwrap_or(defaults.name),
                double_sided: material.double_sided.unwrap_or(defaults.double_sided),
                alpha_mode: material.alpha_mode.unwrap_or(defaults.alpha_mode),
                alpha_cutoff: material
                    .alpha_cutoff
                    .map_or(defaults.alpha_cutoff, |c| c as f32),
                emissive_factor: material
                    .emissive_factor
                    .map(|f| f.map(|x| x as f32))
                    .unwrap_or(defaults.emissive_factor),
                pbr_metallic_roughness: pbr,
                normal_texture: material.normal_texture.clone(),
                occlusion_texture: material.occlusion_texture.clone(),
                emissive_texture: material.emissive_texture.clone(),
            }
        })
        .collect()
}

fn resolve_meshes(meshes: &[gltf::Mesh], accessor_count: usize, material_count: usize) -> Result<Vec<Mesh>> {
    let accessor = |index: usize| -> Result<AccessorId> {
        if index < accessor_count {
            Ok(AccessorId(index))
        } else {
            Err(GlbError::IndexOutOfRange {
                collection: "accessor",
                index,
                len: accessor_count,
            })
        }
    };

    meshes
        .iter()
        .map(|mesh| {
            let primitives = mesh
                .primitives
                .iter()
                .map(|primitive| {
                    let attributes = primitive
                        .attributes
                        .iter()
                        .map(|(name, &index)| Ok((name.clone(), accessor(index)?)))
                        .collect::<Result<BTreeMap<_, _>>>()?;

                    let indices = primitive.indices.map(accessor).transpose()?;

                    let material = primitive
                        .material
                        .map(|index| {
                            if index < material_count {
                                Ok(MaterialId(index))
                            } else {
                                Err(GlbError::IndexOutOfRange {
                                    collection: "material",
                                    index,
                                    len: material_count,
                                })
                            }
                        })
                        .transpose()?;

                    let mode = match primitive.mode {
                        Some(code) => DrawMode::from_code(code).ok_or(GlbError::UnsupportedDrawMode(code))?,
                        None => DrawMode::Triangles,
                    };

                    Ok(Primitive {
                        attributes,
                        indices,
                        material,
                        mode,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Mesh {
                name: mesh.name.clone().unwrap_or_else(|| "mesh".to_string()),
                primitives,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlphaMode;

    fn describe(json: &str) -> gltf::SceneDescription {
        gltf::SceneDescription::from_slice(json.as_bytes()).unwrap()
    }

    const GEOMETRY: &str = r#"
        "buffers": [{"byteLength": 48}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}, {"buffer": 0, "byteOffset": 36, "byteLength": 12}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ]"#;

    #[test]
    fn resolves_geometry() {
        let desc = describe(&format!(
            r#"{{ {GEOMETRY}, "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}] }}"#
        ));
        let resolved = resolve(&desc, 48).unwrap();
        assert_eq!(resolved.buffer_views[1].byte_offset, 36);
        assert_eq!(resolved.accessors[0].shape, AccessorShape::Vec3);
        assert_eq!(resolved.accessors[1].component_type, ComponentType::UnsignedShort);

        let primitive = &resolved.meshes[0].primitives[0];
        assert_eq!(primitive.attributes["POSITION"], AccessorId(0));
        assert_eq!(primitive.indices, Some(AccessorId(1)));
        assert_eq!(primitive.material, None);
        assert_eq!(primitive.mode, DrawMode::Triangles);
        assert_eq!(resolved.meshes[0].name, "mesh");
    }

    #[test]
    fn external_uri_is_unsupported() {
        let desc = describe(r#"{"buffers": [{"byteLength": 4, "uri": "mesh.bin"}]}"#);
        match resolve(&desc, 4) {
            Err(GlbError::UnsupportedBuffer { index, uri }) => {
                assert_eq!(index, 0);
                assert_eq!(uri, "mesh.bin");
            }
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn oversized_buffer_declaration_still_resolves() {
        let desc = describe(r#"{"buffers": [{"byteLength": 64}], "bufferViews": [{"buffer": 0, "byteLength": 4}]}"#);
        let resolved = resolve(&desc, 4).unwrap();
        assert_eq!(resolved.buffers[0].byte_length, 64);
        assert_eq!(resolved.buffer_views[0].byte_length, 4);
    }

    #[test]
    fn buffer_view_with_bad_buffer() {
        let desc = describe(r#"{"buffers": [{"byteLength": 4}], "bufferViews": [{"buffer": 1, "byteLength": 4}]}"#);
        assert!(matches!(
            resolve(&desc, 4),
            Err(GlbError::IndexOutOfRange { collection: "buffer", index: 1, len: 1 })
        ));
    }

    #[test]
    fn buffer_view_past_bin_chunk() {
        let desc = describe(r#"{"buffers": [{"byteLength": 4}], "bufferViews": [{"buffer": 0, "byteOffset": 2, "byteLength": 4}]}"#);
        assert!(matches!(
            resolve(&desc, 4),
            Err(GlbError::BufferViewOutOfBounds { view: 0, end: 6, available: 4 })
        ));
    }

    #[test]
    fn accessor_past_buffer_view() {
        let desc = describe(
            r#"{"buffers": [{"byteLength": 48}],
                "bufferViews": [{"buffer": 0, "byteLength": 36}],
                "accessors": [{"bufferView": 0, "byteOffset": 4, "componentType": 5126, "count": 3, "type": "VEC3"}]}"#,
        );
        assert!(matches!(
            resolve(&desc, 48),
            Err(GlbError::AccessorOutOfBounds { accessor: 0, end: 40, view_length: 36 })
        ));
    }

    #[test]
    fn unknown_component_and_shape() {
        let desc = describe(
            r#"{"buffers": [{"byteLength": 8}], "bufferViews": [{"buffer": 0, "byteLength": 8}],
                "accessors": [{"bufferView": 0, "componentType": 5130, "count": 1, "type": "SCALAR"}]}"#,
        );
        assert!(matches!(
            resolve(&desc, 8),
            Err(GlbError::UnsupportedComponentType { accessor: 0, component_type: 5130 })
        ));

        let desc = describe(
            r#"{"buffers": [{"byteLength": 8}], "bufferViews": [{"buffer": 0, "byteLength": 8}],
                "accessors": [{"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC5"}]}"#,
        );
        assert!(matches!(
            resolve(&desc, 8),
            Err(GlbError::UnsupportedShapeType { accessor: 0, .. })
        ));
    }

    #[test]
    fn attribute_with_missing_accessor() {
        let desc = describe(&format!(
            r#"{{ {GEOMETRY}, "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0, "NORMAL": 5}}}}]}}] }}"#
        ));
        assert!(matches!(
            resolve(&desc, 48),
            Err(GlbError::IndexOutOfRange { collection: "accessor", index: 5, len: 2 })
        ));
    }

    #[test]
    fn primitive_with_missing_material_or_bad_mode() {
        let desc = describe(&format!(
            r#"{{ {GEOMETRY}, "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "material": 0}}]}}] }}"#
        ));
        assert!(matches!(
            resolve(&desc, 48),
            Err(GlbError::IndexOutOfRange { collection: "material", index: 0, len: 0 })
        ));

        let desc = describe(&format!(
            r#"{{ {GEOMETRY}, "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "mode": 9}}]}}] }}"#
        ));
        assert!(matches!(
            resolve(&desc, 48),
            Err(GlbError::UnsupportedDrawMode(9))
        ));
    }

    #[test]
    fn material_defaults_and_explicit_zeroes() {
        let desc = describe(
            r#"{"materials": [
                {},
                {"name": "gold", "alphaMode": "BLEND", "alphaCutoff": 0.0, "doubleSided": true,
                 "emissiveFactor": [1, 0.5, 0],
                 "pbrMetallicRoughness": {"metallicFactor": 0.0, "baseColorTexture": {"index": 2, "texCoord": 1}}}
            ]}"#,
        );
        let resolved = resolve(&desc, 0).unwrap();

        assert_eq!(resolved.materials[0], Material::default());

        let gold = &resolved.materials[1];
        assert_eq!(gold.name, "gold");
        assert_eq!(gold.alpha_mode, AlphaMode::Blend);
        assert_eq!(gold.alpha_cutoff, 0.0);
        assert!(gold.double_sided);
        assert_eq!(gold.emissive_factor, [1.0, 0.5, 0.0]);
        assert_eq!(gold.pbr_metallic_roughness.metallic_factor, 0.0);
        assert_eq!(gold.pbr_metallic_roughness.roughness_factor, 1.0);
        let texture = gold.pbr_metallic_roughness.base_color_texture.as_ref().unwrap();
        assert_eq!((texture.index, texture.tex_coord), (2, 1));
    }
}
