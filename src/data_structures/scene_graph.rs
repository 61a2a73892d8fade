//! Node hierarchy of a glTF scene.
//!
//! Nodes are stored flat and reference their children by index. Each node
//! only knows its local matrix; world matrices are accumulated on demand
//! by [`SceneGraph::node_world_matrices`].

use cgmath::Matrix4;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub local: Matrix4<f32>,
    pub children: Vec<usize>,
    /// Index into the owning model's mesh list.
    pub mesh: Option<usize>,
}

impl SceneNode {
    pub fn new(name: &str, local: Matrix4<f32>) -> Self {
        Self {
            name: name.to_string(),
            local,
            children: Vec::new(),
            mesh: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
}

impl SceneGraph {
    /// Local matrix of a glTF node, from its matrix or its TRS properties.
    pub fn local_matrix(node: &gltf::Node) -> Matrix4<f32> {
        Matrix4::from(node.transform().matrix())
    }

    /// Builds the graph of a glTF scene, keeping the document's node indices.
    pub fn from_gltf(document: &gltf::Document, scene: &gltf::Scene) -> Self {
        let nodes = document
            .nodes()
            .map(|node| SceneNode {
                name: node.name().unwrap_or("unnamed node").to_string(),
                local: Self::local_matrix(&node),
                children: node.children().map(|child| child.index()).collect(),
                mesh: node.mesh().map(|mesh| mesh.index()),
            })
            .collect();
        Self {
            nodes,
            roots: scene.nodes().map(|node| node.index()).collect(),
        }
    }

    /// World matrix `root · parent chain · local` of every node reachable
    /// from the roots. Unreachable nodes stay `None`.
    ///
    /// A node reached a second time (shared or cyclic references in a broken
    /// file) keeps its first matrix and is not descended into again.
    pub fn node_world_matrices(&self, root: Matrix4<f32>) -> Vec<Option<Matrix4<f32>>> {
        let mut world = vec![None; self.nodes.len()];
        let mut stack: Vec<(usize, Matrix4<f32>)> =
            self.roots.iter().rev().map(|index| (*index, root)).collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                log::warn!("scene graph references missing node {}", index);
                continue;
            };
            if world[index].is_some() {
                log::warn!("node {} ({}) is referenced more than once", index, node.name);
                continue;
            }
            let matrix = parent * node.local;
            world[index] = Some(matrix);
            stack.extend(node.children.iter().rev().map(|child| (*child, matrix)));
        }
        world
    }

    /// Nodes that carry a mesh, with their world matrices.
    pub fn mesh_instances(&self, root: Matrix4<f32>) -> Vec<(usize, usize, Matrix4<f32>)> {
        self.node_world_matrices(root)
            .into_iter()
            .enumerate()
            .filter_map(|(index, matrix)| {
                let mesh = self.nodes[index].mesh?;
                Some((index, mesh, matrix?))
            })
            .collect()
    }
}
