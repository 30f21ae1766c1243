// Composekey Window Context
// Classification of the focused window for output strategy selection

pub mod classifier;
pub mod focus;
pub mod provider;

#[cfg(feature = "wayland")]
mod wayland;
#[cfg(feature = "x11-backend")]
mod x11;

pub use classifier::{WindowClassifier, WindowPatterns};
pub use focus::{connect_first, default_sources, FocusSource, WindowError};
pub use provider::{StaticWindow, WindowClass, WindowInfo, WindowInspector, WindowTracker};

#[cfg(feature = "wayland")]
pub use wayland::WaylandFocus;
#[cfg(feature = "x11-backend")]
pub use x11::X11Focus;
