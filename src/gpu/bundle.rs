use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;

use crate::config::BuildOptions;
use crate::error::{lookup, GlbError, Result};
use crate::gpu::device::GpuDevice;
use crate::gpu::vertex;
use crate::model::{AccessorId, AccessorShape, ComponentType, MaterialId, MeshId, Model, Primitive};

#[derive(Eq, Hash, PartialEq, Clone, Copy, Debug)]
pub enum BufferRole {
    Vertex,
    Index,
}

#[derive(Debug)]
pub struct VertexBinding<B> {
    pub semantic: String,
    pub accessor: AccessorId,
    pub buffer: Arc<B>,
    pub array_stride: wgpu::BufferAddress,
    pub attribute: wgpu::VertexAttribute,
}

#[derive(Debug)]
pub struct IndexBinding<B> {
    pub accessor: AccessorId,
    pub buffer: Arc<B>,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// Everything needed to record the draw of one primitive as seen from one node.
#[derive(Debug)]
pub struct PrimitiveLayout<B> {
    pub node: usize,
    pub mesh: MeshId,
    pub primitive: usize,
    pub material: Option<MaterialId>,
    pub topology: wgpu::PrimitiveTopology,
    /// Ordered by shader location.
    pub vertex_buffers: Vec<VertexBinding<B>>,
    pub index: Option<IndexBinding<B>>,
    pub vertex_count: u32,
}

impl<B> PrimitiveLayout<B> {
    /// One layout per vertex buffer, in the order of `vertex_buffers`.
    pub fn vertex_buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.vertex_buffers
            .iter()
            .map(|binding| wgpu::VertexBufferLayout {
                array_stride: binding.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(&binding.attribute),
            })
            .collect()
    }

    pub fn binding(&self, semantic: &str) -> Option<&VertexBinding<B>> {
        self.vertex_buffers.iter().find(|b| b.semantic == semantic)
    }
}

#[derive(Debug)]
pub struct ResourceBundle<B> {
    pub vertex_buffers: BTreeMap<AccessorId, Arc<B>>,
    pub index_buffers: BTreeMap<AccessorId, Arc<B>>,
    /// Accessors uploaded for each attribute semantic, in first-seen order.
    pub attributes: BTreeMap<String, Vec<AccessorId>>,
    pub primitives: Vec<PrimitiveLayout<B>>,
}

impl<B> ResourceBundle<B> {
    pub fn build<D>(device: &D, model: &Model) -> Result<Self>
    where
        D: GpuDevice<Buffer = B>,
    {
        ResourceBuilder::new(device, model).build()
    }

    pub fn attribute_buffers(&self, semantic: &str) -> Vec<&Arc<B>> {
        self.attributes
            .get(semantic)
            .map(|ids| ids.iter().filter_map(|id| self.vertex_buffers.get(id)).collect())
            .unwrap_or_default()
    }
}

/// Uploads the buffers a [`Model`] needs for drawing.
///
/// Buffers are cached by accessor, so every accessor is uploaded at most once
/// per role for the lifetime of the builder, across any number of builds.
pub struct ResourceBuilder<'a, D: GpuDevice> {
    device: &'a D,
    model: &'a Model,
    options: BuildOptions,
    cache: HashMap<(AccessorId, BufferRole), Arc<D::Buffer>>,
}

impl<'a, D: GpuDevice> ResourceBuilder<'a, D> {
    pub fn new(device: &'a D, model: &'a Model) -> Self {
        Self::with_options(device, model, BuildOptions::default())
    }

    pub fn with_options(device: &'a D, model: &'a Model, options: BuildOptions) -> Self {
        Self {
            device,
            model,
            options,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct GPU buffers created so far.
    pub fn allocated(&self) -> usize {
        self.cache.len()
    }

    pub fn build(&mut self) -> Result<ResourceBundle<D::Buffer>> {
        let model = self.model;
        let mut primitives = vec![];
        let mut attributes: BTreeMap<String, Vec<AccessorId>> = BTreeMap::new();

        for node in model.scene.flatten() {
            let Some(mesh_id) = node.mesh else {
                continue;
            };
            let mesh = lookup(&model.meshes, "mesh", mesh_id.0)?;
            for (index, primitive) in mesh.primitives.iter().enumerate() {
                let layout = self.build_primitive(node.index, mesh_id, index, primitive)?;
                for (semantic, &accessor) in &primitive.attributes {
                    if !self.cache.contains_key(&(accessor, BufferRole::Vertex)) {
                        continue;
                    }
                    let ids = attributes.entry(semantic.clone()).or_default();
                    if !ids.contains(&accessor) {
                        ids.push(accessor);
                    }
                }
                primitives.push(layout);
            }
        }

        let mut vertex_buffers = BTreeMap::new();
        for &id in attributes.values().flatten() {
            if let Some(buffer) = self.cache.get(&(id, BufferRole::Vertex)) {
                vertex_buffers.insert(id, buffer.clone());
            }
        }
        let index_buffers: BTreeMap<_, _> = primitives
            .iter()
            .filter_map(|layout| layout.index.as_ref())
            .map(|index| (index.accessor, index.buffer.clone()))
            .collect();

        debug!(
            "built {} primitive layouts from {} vertex and {} index buffers",
            primitives.len(),
            vertex_buffers.len(),
            index_buffers.len()
        );

        Ok(ResourceBundle {
            vertex_buffers,
            index_buffers,
            attributes,
            primitives,
        })
    }

    fn build_primitive(
        &mut self,
        node: usize,
        mesh: MeshId,
        primitive_index: usize,
        primitive: &Primitive,
    ) -> Result<PrimitiveLayout<D::Buffer>> {
        let topology = vertex::topology(primitive.mode)?;
        let model = self.model;

        let mut vertex_buffers = vec![];
        let mut vertex_count: Option<usize> = None;
        for (semantic, &accessor_id) in &primitive.attributes {
            let accessor = lookup(&model.accessors, "accessor", accessor_id.0)?;
            vertex_count = Some(vertex_count.map_or(accessor.count, |n| n.min(accessor.count)));

            let Some(location) = vertex::attribute_location(semantic) else {
                if self.options.upload_unbound_attributes {
                    self.vertex_buffer(accessor_id, semantic)?;
                } else {
                    debug!("skipping custom attribute {} of mesh {}", semantic, mesh.0);
                }
                continue;
            };

            let format = vertex::vertex_format(accessor.component_type, accessor.shape, accessor.normalized)
                .ok_or_else(|| GlbError::UnsupportedShapeType {
                    accessor: accessor_id.0,
                    shape: accessor.shape.type_name().to_string(),
                })?;
            let buffer = self.vertex_buffer(accessor_id, semantic)?;
            vertex_buffers.push(VertexBinding {
                semantic: semantic.clone(),
                accessor: accessor_id,
                buffer,
                array_stride: vertex::vertex_stride(accessor.element_size()) as wgpu::BufferAddress,
                attribute: wgpu::VertexAttribute {
                    format,
                    offset: 0,
                    shader_location: location,
                },
            });
        }
        vertex_buffers.sort_by_key(|b| b.attribute.shader_location);

        let index = primitive
            .indices
            .map(|accessor| self.index_buffer(accessor))
            .transpose()?;

        Ok(PrimitiveLayout {
            node,
            mesh,
            primitive: primitive_index,
            material: primitive.material,
            topology,
            vertex_buffers,
            index,
            vertex_count: vertex_count.unwrap_or(0) as u32,
        })
    }

    fn vertex_buffer(&mut self, id: AccessorId, semantic: &str) -> Result<Arc<D::Buffer>> {
        if let Some(buffer) = self.cache.get(&(id, BufferRole::Vertex)) {
            return Ok(buffer.clone());
        }

        let model = self.model;
        let accessor = lookup(&model.accessors, "accessor", id.0)?;
        let element_size = accessor.element_size();
        let data = model.accessor_data(id)?;
        let data = vertex::pad_elements(&data, element_size, vertex::vertex_stride(element_size));

        let label = format!("{} accessor {} ({})", self.options.label_prefix, id.0, semantic);
        debug!("uploading {}: {} bytes", label, data.len());
        let buffer = Arc::new(self.device.upload_buffer(&label, wgpu::BufferUsages::VERTEX, &data));
        self.cache.insert((id, BufferRole::Vertex), buffer.clone());
        Ok(buffer)
    }

    fn index_buffer(&mut self, id: AccessorId) -> Result<IndexBinding<D::Buffer>> {
        let model = self.model;
        let accessor = lookup(&model.accessors, "accessor", id.0)?;
        if accessor.shape != AccessorShape::Scalar {
            return Err(GlbError::UnsupportedShapeType {
                accessor: id.0,
                shape: accessor.shape.type_name().to_string(),
            });
        }
        let format = vertex::index_format(accessor.component_type).ok_or(GlbError::UnsupportedComponentType {
            accessor: id.0,
            component_type: accessor.component_type as u32,
        })?;

        let buffer = match self.cache.get(&(id, BufferRole::Index)) {
            Some(buffer) => buffer.clone(),
            None => {
                let data: Cow<[u8]> = match accessor.component_type {
                    ComponentType::UnsignedByte => {
                        let widened: Vec<u16> = model.read_indices(id)?.into_iter().map(|i| i as u16).collect();
                        Cow::Owned(bytemuck::cast_slice(&widened).to_vec())
                    }
                    _ => model.accessor_data(id)?,
                };

                let label = format!("{} accessor {} (indices)", self.options.label_prefix, id.0);
                debug!("uploading {}: {} bytes", label, data.len());
                let buffer = Arc::new(self.device.upload_buffer(&label, wgpu::BufferUsages::INDEX, &data));
                self.cache.insert((id, BufferRole::Index), buffer.clone());
                buffer
            }
        };

        Ok(IndexBinding {
            accessor: id,
            buffer,
            format,
            count: accessor.count as u32,
        })
    }
}
