// Composekey Event Handling
// evdev grab loop feeding raw key events to the composer

#[cfg(feature = "evdev-backend")]
pub mod r#loop;

#[cfg(feature = "evdev-backend")]
pub use r#loop::{DeviceInfo, EventLoop, EventLoopError, EventLoopResult, PolledEvent};
