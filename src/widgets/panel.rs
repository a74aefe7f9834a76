//! Plain surfaces: keyboard, settings panel, top bar.

use std::cell::Cell;

use euclid::default::Size2D;

use crate::config::PanelConfig;
use crate::placement::{Placement, WidgetHandle};
use crate::registry::WidgetSurface;

/// A surface that only tracks what the registry applied to it.
#[derive(Debug)]
pub struct Panel {
    handle: WidgetHandle,
    size: Cell<Size2D<u32>>,
    visible: Cell<bool>,
    attached: Cell<bool>,
}

impl Panel {
    pub fn new(handle: WidgetHandle) -> Self {
        Self {
            handle,
            size: Cell::new(Size2D::zero()),
            visible: Cell::new(false),
            attached: Cell::new(true),
        }
    }

    pub fn handle(&self) -> WidgetHandle {
        self.handle
    }

    pub fn size(&self) -> Size2D<u32> {
        self.size.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }
}

impl WidgetSurface for Panel {
    fn resize(&self, size: Size2D<u32>) {
        self.size.set(size);
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    fn detach(&self) {
        self.attached.set(false);
        self.visible.set(false);
    }
}

/// Placement of a hidden panel. With a parent, a negative `translation_y`
/// hangs it below the parent and a positive one stacks it on top.
pub fn panel_placement(config: &PanelConfig, parent: Option<WidgetHandle>) -> Placement {
    let mut placement = Placement {
        width: config.width,
        height: config.height,
        world_width: config.world_width,
        opaque: false,
        visible: false,
        parent_handle: parent,
        ..Placement::default()
    };
    placement.translation.y = config.translation_y;
    placement.translation.z = config.translation_z;
    if parent.is_some() {
        placement.anchor.y = if config.translation_y < 0.0 { 1.0 } else { 0.0 };
        placement.parent_anchor.y = if config.translation_y < 0.0 { 0.0 } else { 1.0 };
    }
    placement
}
