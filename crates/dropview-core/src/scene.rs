//! Live scene graph
//!
//! The scene graph is the single piece of shared state in the viewer. It is
//! only mutated through two operations: adding a top-level child and
//! retexturing existing mesh materials. The renderer drains the spawn and
//! dirty-material queues every frame to mirror those changes.

use std::fmt;
use std::sync::Arc;

use crate::asset::{AssetNode, MaterialData, TextureData};

/// Identifier of a top-level scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Address of one mesh: its top-level node plus its depth-first index
/// within that node's subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub node: NodeId,
    pub index: usize,
}

/// A top-level child of the scene root
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub asset: AssetNode,
    /// File the node was decoded from, if any
    pub source: Option<String>,
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    children: Vec<SceneNode>,
    next_id: u64,
    pending_spawns: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node as a new top-level child. Existing children are left
    /// untouched; names are not deduplicated.
    pub fn add_top_level_child(&mut self, asset: AssetNode, source: Option<String>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.children.push(SceneNode { id, asset, source });
        self.pending_spawns.push(id);
        id
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.children.iter().find(|n| n.id == id)
    }

    /// Set `texture` as the color map of every mesh outside reference
    /// helpers and mark each material dirty. Returns how many materials
    /// were updated; zero is not an error.
    pub fn apply_texture(&mut self, texture: &Arc<TextureData>) -> usize {
        let mut updated = 0;
        for node in self.children.iter_mut() {
            if node.asset.is_reference_helper() {
                continue;
            }
            retexture_subtree(&mut node.asset, texture, &mut updated);
        }
        updated
    }

    /// Nodes added since the last call, in insertion order
    pub fn take_pending_spawns(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_spawns)
    }

    /// Materials flagged `needs_update`, with the flag cleared
    pub fn take_dirty_materials(&mut self) -> Vec<(MeshKey, MaterialData)> {
        let mut dirty = Vec::new();
        for node in self.children.iter_mut() {
            let id = node.id;
            let mut index = 0;
            node.asset.visit_meshes_mut(&mut |mesh| {
                if mesh.material.needs_update {
                    mesh.material.needs_update = false;
                    dirty.push((MeshKey { node: id, index }, mesh.material.clone()));
                }
                index += 1;
            });
        }
        dirty
    }
}

fn retexture_subtree(node: &mut AssetNode, texture: &Arc<TextureData>, updated: &mut usize) {
    for mesh in node.meshes.iter_mut() {
        mesh.material.map = Some(Arc::clone(texture));
        mesh.material.needs_update = true;
        *updated += 1;
    }
    for child in node.children.iter_mut() {
        // Helper subtrees nested inside content are skipped as well
        if child.is_reference_helper() {
            continue;
        }
        retexture_subtree(child, texture, updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{MeshData, NodeRole};

    fn texture(name: &str) -> Arc<TextureData> {
        Arc::new(TextureData::rgba8(name, 1, 1, vec![255, 0, 0, 255]))
    }

    fn content(name: &str, meshes: usize) -> AssetNode {
        let mut node = AssetNode::new(name);
        for _ in 0..meshes {
            node.meshes.push(MeshData::quad(1.0, 1.0, MaterialData::default()));
        }
        node
    }

    #[test]
    fn test_add_top_level_child() {
        let mut scene = SceneGraph::new();
        let a = scene.add_top_level_child(content("a", 1), Some("a.obj".to_string()));
        let b = scene.add_top_level_child(content("a", 1), None);
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.take_pending_spawns(), vec![a, b]);
        assert!(scene.take_pending_spawns().is_empty());
        assert_eq!(scene.get(a).unwrap().source.as_deref(), Some("a.obj"));
    }

    #[test]
    fn test_apply_texture_skips_helpers() {
        let mut scene = SceneGraph::new();
        let helper = scene.add_top_level_child(AssetNode::grid_plane(10.0, 2), None);
        scene.add_top_level_child(content("model", 2), None);

        let updated = scene.apply_texture(&texture("checker"));
        assert_eq!(updated, 2);

        let helper_node = scene.get(helper).unwrap();
        assert!(helper_node.asset.meshes[0].material.map.is_none());
        assert!(!helper_node.asset.meshes[0].material.needs_update);
    }

    #[test]
    fn test_helper_position_does_not_matter() {
        let mut scene = SceneGraph::new();
        scene.add_top_level_child(content("model", 1), None);
        let helper = scene.add_top_level_child(AssetNode::axes_helper(1.0), None);

        scene.apply_texture(&texture("t"));
        let helper_node = scene.get(helper).unwrap();
        assert!(helper_node.asset.meshes.iter().all(|m| m.material.map.is_none()));
    }

    #[test]
    fn test_nested_helper_skipped() {
        let mut nested = AssetNode::axes_helper(1.0);
        nested.role = NodeRole::ReferenceHelper;
        let node = content("model", 1).with_child(nested);

        let mut scene = SceneGraph::new();
        scene.add_top_level_child(node, None);
        assert_eq!(scene.apply_texture(&texture("t")), 1);
    }

    #[test]
    fn test_apply_texture_empty_scene() {
        let mut scene = SceneGraph::new();
        assert_eq!(scene.apply_texture(&texture("t")), 0);
        scene.add_top_level_child(AssetNode::axes_helper(1.0), None);
        assert_eq!(scene.apply_texture(&texture("t")), 0);
    }

    #[test]
    fn test_take_dirty_materials() {
        let mut scene = SceneGraph::new();
        let helper = scene.add_top_level_child(AssetNode::axes_helper(1.0), None);
        let model = scene.add_top_level_child(
            content("model", 1).with_child(content("inner", 1)),
            None,
        );
        scene.apply_texture(&texture("t"));

        let dirty = scene.take_dirty_materials();
        let keys: Vec<MeshKey> = dirty.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                MeshKey { node: model, index: 0 },
                MeshKey { node: model, index: 1 },
            ]
        );
        assert!(dirty.iter().all(|(_, m)| m.map.is_some() && !m.needs_update));
        assert!(keys.iter().all(|k| k.node != helper));

        // Flags were cleared
        assert!(scene.take_dirty_materials().is_empty());
    }
}
