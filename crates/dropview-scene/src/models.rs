//! Mirrors the core scene graph into bevy entities
//!
//! The dispatcher mutates [`LiveScene`]; the systems here drain its spawn
//! and dirty-material queues every frame.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::image::CompressedImageFormats;
use bevy::prelude::*;
use bevy::render::renderer::RenderDevice;
use dropview_core::{AssetNode, MaterialData, MeshKey, NodeId, SceneGraph, TextureData};
use tracing::{debug, warn};

use crate::convert::{
    device_formats, image_from_texture, material_from_data, mesh_from_data, transform_from_node,
};

/// The live scene graph shared by the dispatcher and the renderer
#[derive(Resource, Default, Deref, DerefMut)]
pub struct LiveScene(pub SceneGraph);

/// Root entity of a top-level scene node
#[derive(Component)]
pub struct SceneNodeEntity {
    pub node: NodeId,
}

/// Mesh entity and the scene-graph mesh it was built from
#[derive(Component)]
pub struct SceneMeshRef(pub MeshKey);

/// Marker for axes / grid entities
#[derive(Component)]
pub struct ReferenceHelper;

/// Systems that copy scene-graph changes into the ECS. Anything mutating
/// [`LiveScene`] should run before this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneSyncSet;

/// GPU images for decoded textures, shared by every material using them
#[derive(Resource, Default)]
pub struct TextureCache {
    entries: Vec<(Arc<TextureData>, Handle<Image>)>,
}

impl TextureCache {
    fn handle(
        &mut self,
        texture: &Arc<TextureData>,
        images: &mut Assets<Image>,
        formats: CompressedImageFormats,
    ) -> Option<Handle<Image>> {
        if let Some((_, handle)) = self.entries.iter().find(|(t, _)| Arc::ptr_eq(t, texture)) {
            return Some(handle.clone());
        }
        match image_from_texture(texture, formats) {
            Ok(image) => {
                let handle = images.add(image);
                self.entries.push((Arc::clone(texture), handle.clone()));
                Some(handle)
            }
            Err(e) => {
                warn!(texture = %texture.name, "Failed to upload texture: {}", e);
                None
            }
        }
    }

    /// Forget textures no longer referenced by the scene graph
    fn prune(&mut self) {
        self.entries.retain(|(texture, _)| Arc::strong_count(texture) > 1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plugin for scene-graph synchronization
pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LiveScene>()
            .init_resource::<TextureCache>()
            .add_systems(
                Update,
                (sync_dirty_materials, spawn_pending_nodes)
                    .chain()
                    .in_set(SceneSyncSet),
            );
    }
}

struct SpawnAssets<'a> {
    meshes: &'a mut Assets<Mesh>,
    materials: &'a mut Assets<StandardMaterial>,
    images: &'a mut Assets<Image>,
    textures: &'a mut TextureCache,
    formats: CompressedImageFormats,
}

fn spawn_pending_nodes(
    mut commands: Commands,
    mut live: ResMut<LiveScene>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<TextureCache>,
    render_device: Option<Res<RenderDevice>>,
) {
    let pending = live.take_pending_spawns();
    if pending.is_empty() {
        return;
    }

    let mut assets = SpawnAssets {
        meshes: &mut *meshes,
        materials: &mut *materials,
        images: &mut *images,
        textures: &mut *textures,
        formats: device_formats(render_device.as_deref()),
    };

    for id in pending {
        let Some(node) = live.get(id) else {
            continue;
        };
        let mut mesh_index = 0;
        let root = spawn_node(&mut commands, &mut assets, id, &node.asset, None, &mut mesh_index);
        commands.entity(root).insert(SceneNodeEntity { node: id });
        if node.asset.is_reference_helper() {
            commands.entity(root).insert(ReferenceHelper);
        }
        debug!(%id, name = %node.asset.name, meshes = mesh_index, "Spawned scene node");
    }
}

/// Spawn `node` and its subtree. Mesh indices follow the scene graph's
/// depth-first order: own meshes first, then children.
fn spawn_node(
    commands: &mut Commands,
    assets: &mut SpawnAssets,
    id: NodeId,
    node: &AssetNode,
    parent: Option<Entity>,
    mesh_index: &mut usize,
) -> Entity {
    let mut entity = commands.spawn((
        Name::new(node.name.clone()),
        transform_from_node(&node.transform),
        Visibility::default(),
    ));
    if let Some(parent) = parent {
        entity.insert(ChildOf(parent));
    }
    let entity = entity.id();

    for mesh in &node.meshes {
        let key = MeshKey {
            node: id,
            index: *mesh_index,
        };
        *mesh_index += 1;
        if mesh.is_empty() {
            continue;
        }

        let texture = mesh
            .material
            .map
            .as_ref()
            .and_then(|t| assets.textures.handle(t, assets.images, assets.formats));
        commands.spawn((
            Name::new(mesh.name.clone().unwrap_or_else(|| "mesh".to_string())),
            Mesh3d(assets.meshes.add(mesh_from_data(mesh))),
            MeshMaterial3d(assets.materials.add(material_from_data(&mesh.material, texture))),
            Transform::default(),
            SceneMeshRef(key),
            ChildOf(entity),
        ));
    }

    for child in &node.children {
        spawn_node(commands, assets, id, child, Some(entity), mesh_index);
    }
    entity
}

fn sync_dirty_materials(
    mut live: ResMut<LiveScene>,
    mesh_refs: Query<(&SceneMeshRef, &MeshMaterial3d<StandardMaterial>)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<TextureCache>,
    render_device: Option<Res<RenderDevice>>,
) {
    let dirty = live.take_dirty_materials();
    if !dirty.is_empty() {
        let formats = device_formats(render_device.as_deref());
        let dirty: HashMap<MeshKey, MaterialData> = dirty.into_iter().collect();
        let mut updated = 0;
        for (mesh_ref, handle) in &mesh_refs {
            let Some(data) = dirty.get(&mesh_ref.0) else {
                continue;
            };
            let texture = data
                .map
                .as_ref()
                .and_then(|t| textures.handle(t, &mut images, formats));
            if let Some(material) = materials.get_mut(&handle.0) {
                material.base_color_texture = texture;
                updated += 1;
            }
        }
        debug!(updated, "Refreshed material textures");
    }
    textures.prune();
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropview_core::MeshData;

    fn test_app() -> App {
        let mut app = App::new();
        app.init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<Assets<Image>>()
            .add_plugins(ModelsPlugin);
        app
    }

    fn content() -> AssetNode {
        AssetNode::new("box")
            .with_mesh(MeshData::quad(1.0, 1.0, MaterialData::default()))
            .with_child(
                AssetNode::new("lid").with_mesh(MeshData::quad(1.0, 1.0, MaterialData::default())),
            )
    }

    fn textured_materials(app: &mut App) -> usize {
        let handles: Vec<Handle<StandardMaterial>> = app
            .world_mut()
            .query::<&MeshMaterial3d<StandardMaterial>>()
            .iter(app.world())
            .map(|m| m.0.clone())
            .collect();
        let materials = app.world().resource::<Assets<StandardMaterial>>();
        handles
            .iter()
            .filter_map(|h| materials.get(h))
            .filter(|m| m.base_color_texture.is_some())
            .count()
    }

    #[test]
    fn test_pending_nodes_are_spawned_once() {
        let mut app = test_app();
        let id = app
            .world_mut()
            .resource_mut::<LiveScene>()
            .add_top_level_child(content(), Some("box.obj".to_string()));

        app.update();
        app.update();

        let roots: Vec<NodeId> = app
            .world_mut()
            .query::<&SceneNodeEntity>()
            .iter(app.world())
            .map(|n| n.node)
            .collect();
        assert_eq!(roots, vec![id]);

        let mut keys: Vec<usize> = app
            .world_mut()
            .query::<&SceneMeshRef>()
            .iter(app.world())
            .map(|m| m.0.index)
            .collect();
        keys.sort();
        assert_eq!(keys, vec![0, 1]);

        let parented = app
            .world_mut()
            .query_filtered::<Entity, (With<SceneMeshRef>, With<ChildOf>)>()
            .iter(app.world())
            .count();
        assert_eq!(parented, 2);
    }

    #[test]
    fn test_helpers_are_marked() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<LiveScene>()
            .add_top_level_child(AssetNode::axes_helper(10.0), None);
        app.update();

        let helpers = app
            .world_mut()
            .query_filtered::<Entity, With<ReferenceHelper>>()
            .iter(app.world())
            .count();
        assert_eq!(helpers, 1);
    }

    #[test]
    fn test_dirty_materials_get_texture() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<LiveScene>()
            .add_top_level_child(content(), None);
        app.update();
        assert_eq!(textured_materials(&mut app), 0);

        let texture = Arc::new(TextureData::rgba8("t.png", 1, 1, vec![255; 4]));
        let applied = app
            .world_mut()
            .resource_mut::<LiveScene>()
            .apply_texture(&texture);
        assert_eq!(applied, 2);
        app.update();

        assert_eq!(textured_materials(&mut app), 2);
        // One upload shared by both materials
        assert_eq!(app.world().resource::<TextureCache>().len(), 1);
    }
}
