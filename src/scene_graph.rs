use std::collections::BTreeMap;
use std::fmt;

use glam::{Mat4, Quat, Vec3};

use crate::error::{lookup, GlbError, Result};
use crate::gltf;
use crate::model::MeshId;

// SCENE GRAPH NODES
pub struct Node {
    /// Position of the node in the document's `nodes` array.
    pub index: usize,
    pub name: String,
    pub mesh: Option<MeshId>,
    pub children: Vec<Node>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Node {
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

// Children are summarized so deep hierarchies print without recursing.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("mesh", &self.mesh)
            .field("children", &self.children.len())
            .field("translation", &self.translation)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .finish()
    }
}

// Tear the tree down with a heap stack; the default drop recurses once per level.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<Node>,
}

impl Scene {
    /// Every node reachable from the roots, parents before their children.
    pub fn flatten(&self) -> Vec<&Node> {
        let mut acc = vec![];
        let mut stack: Vec<&Node> = self.nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            acc.push(node);
            stack.extend(node.children.iter().rev());
        }
        acc
    }

    /// World transforms of every mesh-carrying node, grouped by mesh.
    pub fn mesh_instances(&self) -> BTreeMap<MeshId, Vec<Mat4>> {
        let mut map: BTreeMap<MeshId, Vec<Mat4>> = BTreeMap::new();
        let mut stack: Vec<(&Node, Mat4)> = self.nodes.iter().rev().map(|n| (n, Mat4::IDENTITY)).collect();
        while let Some((node, parent)) = stack.pop() {
            let transform = parent * node.local_transform();
            if let Some(mesh) = node.mesh {
                map.entry(mesh).or_default().push(transform);
            }
            stack.extend(node.children.iter().rev().map(|child| (child, transform)));
        }
        map
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

/// A node whose children are still being built.
struct Frame<'a> {
    index: usize,
    desc: &'a gltf::Node,
    mesh: Option<MeshId>,
    child_ids: &'a [usize],
    next_child: usize,
    children: Vec<Node>,
}

impl<'a> Frame<'a> {
    fn enter(nodes: &'a [gltf::Node], index: usize, mesh_count: usize, state: &mut [Visit]) -> Result<Self> {
        let desc = lookup(nodes, "node", index)?;
        match state[index] {
            Visit::OnPath => return Err(GlbError::CyclicGraph { node: index }),
            Visit::Done => return Err(GlbError::SharedNode { node: index }),
            Visit::Unvisited => state[index] = Visit::OnPath,
        }

        let mesh = desc
            .mesh
            .map(|mesh| {
                if mesh < mesh_count {
                    Ok(MeshId(mesh))
                } else {
                    Err(GlbError::IndexOutOfRange {
                        collection: "mesh",
                        index: mesh,
                        len: mesh_count,
                    })
                }
            })
            .transpose()?;

        let child_ids = desc.children.as_deref().unwrap_or_default();
        Ok(Self {
            index,
            desc,
            mesh,
            child_ids,
            next_child: 0,
            children: Vec::with_capacity(child_ids.len()),
        })
    }

    fn next_child(&mut self) -> Option<usize> {
        let child = self.child_ids.get(self.next_child).copied()?;
        self.next_child += 1;
        Some(child)
    }

    fn finish(self, state: &mut [Visit]) -> Node {
        state[self.index] = Visit::Done;
        let (translation, rotation, scale) = node_trs(self.desc);
        Node {
            index: self.index,
            name: self.desc.name.clone().unwrap_or_else(|| "node".to_string()),
            mesh: self.mesh,
            children: self.children,
            translation,
            rotation,
            scale,
        }
    }
}

/// Materialize the first declared scene as an owned tree.
///
/// The walk keeps its own stack, so hierarchy depth is bounded by memory
/// rather than by the thread's stack.
pub fn build_scene(nodes: &[gltf::Node], scenes: &[gltf::Scene], mesh_count: usize) -> Result<Scene> {
    // Only the first scene is used
    let scene = scenes.first().ok_or(GlbError::MissingScene)?;

    let mut state = vec![Visit::Unvisited; nodes.len()];
    let mut roots = Vec::with_capacity(scene.nodes.len());
    for &root in &scene.nodes {
        let mut stack = vec![Frame::enter(nodes, root, mesh_count, &mut state)?];
        while let Some(mut frame) = stack.pop() {
            if let Some(child) = frame.next_child() {
                let child = Frame::enter(nodes, child, mesh_count, &mut state)?;
                stack.push(frame);
                stack.push(child);
                continue;
            }
            let node = frame.finish(&mut state);
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    Ok(Scene {
        name: scene.name.clone(),
        nodes: roots,
    })
}

fn node_trs(node: &gltf::Node) -> (Vec3, Quat, Vec3) {
    let has_trs = node.translation.is_some() || node.rotation.is_some() || node.scale.is_some();
    if let (Some(m), false) = (node.matrix, has_trs) {
        let (scale, rotation, translation) =
            Mat4::from_cols_array(&m.map(|x| x as f32)).to_scale_rotation_translation();
        return (translation, rotation, scale);
    }

    let translation = node.translation.map_or(Vec3::ZERO, |t| Vec3::from_array(t.map(|x| x as f32)));
    // glTF stores quaternions as [x, y, z, w]
    let rotation = node
        .rotation
        .map_or(Quat::IDENTITY, |r| Quat::from_array(r.map(|x| x as f32)));
    let scale = node.scale.map_or(Vec3::ONE, |s| Vec3::from_array(s.map(|x| x as f32)));
    (translation, rotation, scale)
}
