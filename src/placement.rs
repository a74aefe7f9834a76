//! Widget geometry: the placement descriptor snapshotted into every render command.
//!
//! A [`Placement`] is a plain value. The registry keeps the authoritative copy on
//! the control thread and every command carries a full clone, so the renderer
//! never sees a partially updated widget.
//!
//! ```text
//!        parent (browser)
//!   ┌──────────────────────────┐
//!   │                          │
//!   │     parent_anchor (0.5, 0.0)
//!   └────────────●─────────────┘
//!        ┌───────●───────┐   anchor (0.5, 1.0)
//!        │  child (nav)  │
//!        └───────────────┘
//! ```

use std::fmt;

use euclid::default::{Point2D, Size2D, Vector3D};
use serde::{Deserialize, Serialize};

/// Scene units per pixel when a placement carries no explicit world width.
pub const WORLD_DPI_RATIO: f32 = 2.0 / 720.0;

/// Area multipliers offered by the navigation bar's resize mode.
pub const RESIZE_PRESETS: [f32; 4] = [0.5, 1.0, 2.0, 3.0];

/// Preset applied when the page requests fullscreen.
pub const FULLSCREEN_PRESET: f32 = 2.0;

/// Identifies a widget to both the control-thread registry and the renderer.
///
/// Handles are allocated by [`crate::registry::WidgetRegistry::allocate_handle`]
/// and are never reused by the registry that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WidgetHandle(u32);

impl WidgetHandle {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Full geometric and visibility descriptor of a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Scene-space width. `<= 0` lets the renderer derive it from `width`.
    pub world_width: f32,
    /// Scene-space height. `<= 0` keeps the texture aspect ratio.
    pub world_height: f32,
    pub density: f32,
    /// Offset from the anchor point, in pixels.
    pub translation: Vector3D<f32>,
    /// Point of this widget that is pinned, in `[0, 1]`.
    pub anchor: Point2D<f32>,
    /// Point of the parent this widget is pinned to, in `[0, 1]`.
    pub parent_anchor: Point2D<f32>,
    /// Non-owning reference resolved through the registry at apply time.
    pub parent_handle: Option<WidgetHandle>,
    pub opaque: bool,
    pub visible: bool,
    pub show_pointer: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            world_width: 0.0,
            world_height: 0.0,
            density: 1.0,
            translation: Vector3D::zero(),
            anchor: Point2D::new(0.5, 0.5),
            parent_anchor: Point2D::new(0.5, 0.5),
            parent_handle: None,
            opaque: false,
            visible: true,
            show_pointer: true,
        }
    }
}

impl Placement {
    pub fn texture_width(&self) -> u32 {
        (self.width as f32 * self.density).round() as u32
    }

    pub fn texture_height(&self) -> u32 {
        (self.height as f32 * self.density).round() as u32
    }

    /// Backing-store size of the widget's surface.
    pub fn texture_size(&self) -> Size2D<u32> {
        Size2D::new(self.texture_width(), self.texture_height())
    }

    /// World width as the renderer resolves it.
    pub fn resolved_world_width(&self) -> f32 {
        if self.world_width > 0.0 {
            self.world_width
        } else {
            self.width as f32 * WORLD_DPI_RATIO
        }
    }
}

/// Converts a distance in meters to placement translation units.
pub fn units_from_meters(meters: f32) -> f32 {
    meters / WORLD_DPI_RATIO
}

/// Width of a dependent widget that follows its parent's world width.
///
/// The parent may grow past its baseline (interactive resize); the child grows
/// by the same ratio. A parent smaller than its baseline leaves the child at
/// its baseline width.
pub fn scaled_width(
    baseline_width: u32,
    parent_world_width: f32,
    parent_baseline_world_width: f32,
) -> u32 {
    if parent_baseline_world_width <= 0.0 {
        return baseline_width;
    }
    let ratio = parent_world_width.max(parent_baseline_world_width) / parent_baseline_world_width;
    (baseline_width as f32 * ratio) as u32
}

/// World size of the browser surface for a resize preset.
///
/// `preset` multiplies the baseline area; the aspect ratio is taken from
/// configuration rather than from the surface, so a surface whose pixel
/// aspect differs from `aspect_ratio` is reshaped to it.
pub fn preset_world_size(baseline_world_width: f32, aspect_ratio: f32, preset: f32) -> Size2D<f32> {
    if aspect_ratio <= 0.0 || preset <= 0.0 {
        return Size2D::new(baseline_world_width, baseline_world_width);
    }
    let baseline_world_height = baseline_world_width / aspect_ratio;
    let area = baseline_world_width * baseline_world_height * preset;
    Size2D::new((area * aspect_ratio).sqrt(), (area / aspect_ratio).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_size_rounds_density() {
        let placement = Placement {
            width: 11,
            height: 4,
            density: 1.5,
            ..Placement::default()
        };
        assert_eq!(placement.texture_width(), 17);
        assert_eq!(placement.texture_height(), 6);
        assert_eq!(placement.texture_size(), Size2D::new(17, 6));
    }

    #[test]
    fn test_resolved_world_width_falls_back_to_pixels() {
        let placement = Placement {
            width: 720,
            ..Placement::default()
        };
        assert!((placement.resolved_world_width() - 2.0).abs() < 1e-5);

        let explicit = Placement {
            width: 720,
            world_width: 3.5,
            ..Placement::default()
        };
        assert_eq!(explicit.resolved_world_width(), 3.5);
    }

    #[test]
    fn test_scaled_width_follows_growth() {
        assert_eq!(scaled_width(720, 8.0, 4.0), 1440);
        assert_eq!(scaled_width(720, 6.0, 4.0), 1080);
    }

    #[test]
    fn test_scaled_width_never_shrinks_below_baseline() {
        assert_eq!(scaled_width(720, 2.0, 4.0), 720);
        assert_eq!(scaled_width(720, 4.0, 4.0), 720);
        assert_eq!(scaled_width(720, 9.0, 0.0), 720);
    }

    #[test]
    fn test_preset_one_is_identity() {
        let size = preset_world_size(4.0, 16.0 / 9.0, 1.0);
        assert!((size.width - 4.0).abs() < 1e-4);
        assert!((size.height - 2.25).abs() < 1e-4);
    }

    #[test]
    fn test_preset_scales_area() {
        let base = preset_world_size(4.0, 2.0, 1.0);
        let double = preset_world_size(4.0, 2.0, 2.0);
        let base_area = base.width * base.height;
        let double_area = double.width * double.height;
        assert!((double_area - 2.0 * base_area).abs() < 1e-3);
        // Aspect ratio is preserved.
        assert!((double.width / double.height - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_placement_partial_toml() {
        let placement: Placement = toml::from_str("width = 300\nvisible = false").unwrap();
        assert_eq!(placement.width, 300);
        assert!(!placement.visible);
        assert_eq!(placement.density, 1.0);
        assert_eq!(placement.anchor, Point2D::new(0.5, 0.5));
    }
}
