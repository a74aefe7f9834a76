//! Handle-indexed widget registry.
//!
//! The registry is the control thread's source of truth for widget geometry.
//! Every mutation is mirrored to the renderer through the [`CommandSender`]:
//!
//! ```text
//! add(h, p)            → surface.resize, surface.set_visible, Create(h, p)
//! update(h, p)         → [surface.resize if texture size changed], Update(h, p),
//!                        surface.set_visible, widget-update listeners
//! remove(h)            → surface.detach, Remove(h)
//! start/finish_resize  → BeginResize(h) / EndResize(h)
//! ```
//!
//! The local surface is always resized before the renderer learns about the
//! new size, so it never samples a backing store that is still the old size.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use euclid::default::Size2D;
use tracing::{debug, warn};

use crate::command::{Command, CommandSender};
use crate::observer::Listeners;
use crate::placement::{Placement, WidgetHandle};

/// Dependent updates triggered by a single `update()` before the chain is cut.
const MAX_DEPENDENT_UPDATES: usize = 16;

/// Local render target behind a widget (the view side of the widget).
pub trait WidgetSurface {
    /// Resizes the backing store to `size` texture pixels.
    fn resize(&self, size: Size2D<u32>);

    fn set_visible(&self, visible: bool);

    /// Called when the widget leaves the registry.
    fn detach(&self) {}
}

/// A placement change requested by a widget-update listener.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementChange {
    pub handle: WidgetHandle,
    pub placement: Placement,
}

/// Read-only view of the registry handed to widget-update listeners.
#[derive(Clone, Copy)]
pub struct Placements<'a>(&'a HashMap<WidgetHandle, Widget>);

impl<'a> Placements<'a> {
    pub fn get(&self, handle: WidgetHandle) -> Option<&'a Placement> {
        self.0.get(&handle).map(|widget| &widget.placement)
    }
}

/// Observes placement updates of other widgets.
pub trait WidgetUpdateListener {
    /// Called after `handle` was updated. Returning a change schedules it
    /// through the same update path.
    fn on_widget_update(
        &self,
        handle: WidgetHandle,
        placement: &Placement,
        placements: Placements<'_>,
    ) -> Option<PlacementChange>;
}

/// A live widget.
pub struct Widget {
    handle: WidgetHandle,
    placement: Placement,
    surface: Rc<dyn WidgetSurface>,
    visible: bool,
    /// Texture size the surface was last resized to.
    applied_texture_size: Size2D<u32>,
    resizing: bool,
}

impl Widget {
    pub fn handle(&self) -> WidgetHandle {
        self.handle
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn surface(&self) -> &Rc<dyn WidgetSurface> {
        &self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing
    }
}

pub struct WidgetRegistry {
    next_handle: u32,
    widgets: HashMap<WidgetHandle, Widget>,
    commands: CommandSender,
    listeners: Listeners<dyn WidgetUpdateListener>,
}

impl WidgetRegistry {
    pub fn new(commands: CommandSender) -> Self {
        Self {
            next_handle: 1,
            widgets: HashMap::new(),
            commands,
            listeners: Listeners::default(),
        }
    }

    /// Returns a fresh handle. Handles start at 1 and are never reused.
    pub fn allocate_handle(&mut self) -> WidgetHandle {
        let handle = WidgetHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Registers a widget and asks the renderer to create it.
    pub fn add(
        &mut self,
        handle: WidgetHandle,
        placement: Placement,
        surface: Rc<dyn WidgetSurface>,
    ) -> bool {
        if self.widgets.contains_key(&handle) {
            warn!(%handle, "Widget already added, ignoring");
            return false;
        }
        if handle.get() == 0 || handle.get() >= self.next_handle {
            warn!(%handle, "Handle was not allocated by this registry, ignoring");
            return false;
        }

        let texture_size = placement.texture_size();
        surface.resize(texture_size);
        surface.set_visible(placement.visible);

        self.widgets.insert(
            handle,
            Widget {
                handle,
                placement: placement.clone(),
                surface,
                visible: placement.visible,
                applied_texture_size: texture_size,
                resizing: false,
            },
        );
        debug!(%handle, width = placement.width, height = placement.height, "Widget added");
        self.commands.push(Command::Create { handle, placement });
        true
    }

    /// Applies a new placement and forwards a snapshot to the renderer.
    ///
    /// Widget-update listeners run afterwards; the changes they return are
    /// applied through this same path.
    pub fn update(&mut self, handle: WidgetHandle, placement: Placement) {
        let mut pending = VecDeque::from([PlacementChange { handle, placement }]);
        let mut applied = 0;

        while let Some(change) = pending.pop_front() {
            if applied == MAX_DEPENDENT_UPDATES {
                warn!(
                    %handle,
                    dropped = pending.len() + 1,
                    "Dependent placement chain too long (parent cycle?), stopping"
                );
                break;
            }
            if !self.apply_update(change.handle, change.placement) {
                continue;
            }
            applied += 1;

            let Some(widget) = self.widgets.get(&change.handle) else {
                continue;
            };
            let placements = Placements(&self.widgets);
            for listener in self.listeners.iter() {
                if let Some(dependent) =
                    listener.on_widget_update(change.handle, &widget.placement, placements)
                {
                    pending.push_back(dependent);
                }
            }
        }
    }

    fn apply_update(&mut self, handle: WidgetHandle, placement: Placement) -> bool {
        let Some(widget) = self.widgets.get_mut(&handle) else {
            warn!(%handle, "Update for a widget that is not live, ignoring");
            return false;
        };

        let texture_size = placement.texture_size();
        if texture_size != widget.applied_texture_size {
            widget.surface.resize(texture_size);
            widget.applied_texture_size = texture_size;
        }

        widget.placement = placement.clone();
        let visible = placement.visible;
        self.commands.push(Command::Update { handle, placement });

        if visible != widget.visible {
            widget.surface.set_visible(visible);
            widget.visible = visible;
        }
        true
    }

    /// Removes a widget. The handle stays retired.
    pub fn remove(&mut self, handle: WidgetHandle) -> Option<Placement> {
        let Some(widget) = self.widgets.remove(&handle) else {
            warn!(%handle, "Remove for unknown widget, ignoring");
            return None;
        };
        widget.surface.detach();
        self.commands.push(Command::Remove(handle));
        debug!(%handle, "Widget removed");
        Some(widget.placement)
    }

    pub fn start_resize(&mut self, handle: WidgetHandle) {
        let Some(widget) = self.widgets.get_mut(&handle) else {
            warn!(%handle, "Resize start for unknown widget, ignoring");
            return;
        };
        if widget.resizing {
            debug!(%handle, "Resize already in progress");
            return;
        }
        widget.resizing = true;
        self.commands.push(Command::BeginResize(handle));
    }

    pub fn finish_resize(&mut self, handle: WidgetHandle) {
        let Some(widget) = self.widgets.get_mut(&handle) else {
            warn!(%handle, "Resize finish for unknown widget, ignoring");
            return;
        };
        if !widget.resizing {
            warn!(%handle, "Resize finish without a matching start, ignoring");
            return;
        }
        widget.resizing = false;
        self.commands.push(Command::EndResize(handle));
    }

    pub fn fade_out_world(&self) {
        self.commands.push(Command::FadeOut);
    }

    pub fn fade_in_world(&self) {
        self.commands.push(Command::FadeIn);
    }

    /// Lookup that tolerates handles the renderer still references after removal.
    pub fn get(&self, handle: WidgetHandle) -> Option<&Widget> {
        self.widgets.get(&handle)
    }

    pub fn placement(&self, handle: WidgetHandle) -> Option<&Placement> {
        self.widgets.get(&handle).map(Widget::placement)
    }

    pub fn contains(&self, handle: WidgetHandle) -> bool {
        self.widgets.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Live handles, ascending.
    pub fn handles(&self) -> Vec<WidgetHandle> {
        let mut handles: Vec<_> = self.widgets.keys().copied().collect();
        handles.sort();
        handles
    }

    pub fn add_listener(&mut self, listener: Rc<dyn WidgetUpdateListener>) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, listener: &Rc<dyn WidgetUpdateListener>) -> bool {
        self.listeners.remove(listener)
    }
}
