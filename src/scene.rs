//! Render-side model of the widget scene.
//!
//! The native compositor is external; `Scene` is the reference consumer of
//! the command queue used by the harness and the tests. It resolves each
//! placement into a world size and a transform the way the compositor does:
//!
//! ```text
//! t  = translation × WORLD_DPI_RATIO
//! t -= ((anchor.x − 0.5) × world_w, anchor.y × world_h, 0)
//! t += (parent_w × parent_anchor.x − parent_w × 0.5, parent_h × parent_anchor.y, 0)
//! transform = translate(t) then parent.transform
//! ```
//!
//! A child's transform is resolved against its parent's transform at the time
//! the child is applied; moving a parent does not re-resolve its children.

use std::thread::{self, JoinHandle};

use euclid::default::{Point3D, Size2D, Transform3D, Vector3D};
use tracing::{debug, info, warn};

use crate::command::{Command, CommandReceiver};
use crate::placement::{Placement, WORLD_DPI_RATIO, WidgetHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub handle: WidgetHandle,
    pub placement: Placement,
    pub texture_size: Size2D<u32>,
    pub world_size: Size2D<f32>,
    pub transform: Transform3D<f32>,
    pub resizing: bool,
}

impl SceneNode {
    pub fn is_visible(&self) -> bool {
        self.placement.visible
    }

    /// World-space position of the node's origin.
    pub fn origin(&self) -> Vector3D<f32> {
        self.transform
            .transform_point3d(Point3D::origin())
            .map(Point3D::to_vector)
            .unwrap_or_else(Vector3D::zero)
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    /// In creation order.
    nodes: Vec<SceneNode>,
    faded: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Create { handle, placement } => {
                if self.index_of(handle).is_some() {
                    debug!(%handle, "Node already created, updating it");
                } else {
                    self.nodes.push(SceneNode {
                        handle,
                        texture_size: placement.texture_size(),
                        world_size: Size2D::zero(),
                        transform: Transform3D::identity(),
                        resizing: false,
                        placement: placement.clone(),
                    });
                }
                self.update(handle, placement);
            }
            Command::Update { handle, placement } => self.update(handle, placement),
            Command::Remove(handle) => match self.index_of(handle) {
                Some(index) => {
                    self.nodes.remove(index);
                }
                None => debug!(%handle, "Remove for unknown node"),
            },
            Command::BeginResize(handle) => self.set_resizing(handle, true),
            Command::EndResize(handle) => self.set_resizing(handle, false),
            Command::FadeOut => self.faded = true,
            Command::FadeIn => self.faded = false,
        }
    }

    fn update(&mut self, handle: WidgetHandle, placement: Placement) {
        let Some(index) = self.index_of(handle) else {
            warn!(%handle, "Update for unknown node, ignoring");
            return;
        };

        let parent = placement
            .parent_handle
            .and_then(|parent| self.node(parent))
            .map(|parent| (parent.world_size, parent.transform));
        if placement.parent_handle.is_some() && parent.is_none() {
            debug!(%handle, "Parent node not found, placing at root");
        }

        let texture_size = placement.texture_size();
        let world_width = placement.resolved_world_width();
        let world_height = if placement.world_height > 0.0 {
            placement.world_height
        } else if texture_size.width > 0 {
            world_width * texture_size.height as f32 / texture_size.width as f32
        } else {
            0.0
        };
        let world_size = Size2D::new(world_width, world_height);

        let mut translation = placement.translation * WORLD_DPI_RATIO;
        translation -= Vector3D::new(
            (placement.anchor.x - 0.5) * world_size.width,
            placement.anchor.y * world_size.height,
            0.0,
        );
        let local = match parent {
            Some((parent_size, parent_transform)) => {
                translation += Vector3D::new(
                    parent_size.width * placement.parent_anchor.x - parent_size.width * 0.5,
                    parent_size.height * placement.parent_anchor.y,
                    0.0,
                );
                Transform3D::translation(translation.x, translation.y, translation.z)
                    .then(&parent_transform)
            }
            None => Transform3D::translation(translation.x, translation.y, translation.z),
        };

        let node = &mut self.nodes[index];
        node.texture_size = texture_size;
        node.world_size = world_size;
        node.transform = local;
        node.placement = placement;
    }

    fn set_resizing(&mut self, handle: WidgetHandle, resizing: bool) {
        match self.index_of(handle) {
            Some(index) => self.nodes[index].resizing = resizing,
            None => warn!(%handle, resizing, "Resize marker for unknown node, ignoring"),
        }
    }

    fn index_of(&self, handle: WidgetHandle) -> Option<usize> {
        self.nodes.iter().position(|node| node.handle == handle)
    }

    pub fn node(&self, handle: WidgetHandle) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.handle == handle)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_faded(&self) -> bool {
        self.faded
    }

    /// Applies every command queued so far. Returns how many were applied.
    pub fn drain_from(&mut self, receiver: &CommandReceiver) -> usize {
        let commands = receiver.drain();
        let count = commands.len();
        for command in commands {
            self.apply(command);
        }
        count
    }
}

/// Applies commands on a dedicated thread until every sender is dropped, then
/// hands the final scene back.
pub fn spawn_render_thread(receiver: CommandReceiver) -> std::io::Result<JoinHandle<Scene>> {
    thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let mut scene = Scene::new();
            let mut applied = 0usize;
            while let Some(command) = receiver.recv() {
                scene.apply(command);
                applied += 1;
            }
            info!(applied, nodes = scene.len(), "Render thread stopped");
            scene
        })
}
