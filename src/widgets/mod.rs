//! Widgets placed in the scene.
//!
//! Each widget is its own [`crate::registry::WidgetSurface`] and subscribes to
//! the listener roles it needs.

pub mod browser;
pub mod navigation;
pub mod panel;

pub use browser::BrowserWidget;
pub use navigation::NavigationBar;
pub use panel::Panel;
