// Composekey Output Layer
// Sinks, clipboard access and the strategies that deliver composed text

mod clipboard;
mod sink;
mod strategy;
mod synth;

#[cfg(feature = "evdev-backend")]
mod uinput;

pub use clipboard::{
    open_clipboard, Clipboard, ClipboardError, ClipboardImage, ClipboardSnapshot, MemoryClipboard,
    NoClipboard,
};
pub use sink::{InputSink, OutputError, UnicodeInput};
pub use strategy::{select_strategy, Strategy};
pub use synth::OutputSynthesizer;

#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;

#[cfg(feature = "evdev-backend")]
pub use uinput::{VirtualKeyboard, VIRTUAL_DEVICE_NAME};
