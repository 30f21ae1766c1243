// Composekey Core Library
// Compose key engine and the keyboard plumbing around it

pub mod action;
pub mod composer;
pub mod indicator;
pub mod input;
pub mod key;
pub mod keycode;
pub mod layout;
pub mod modifier;
pub mod normalize;
pub mod output;
pub mod sequence;
pub mod settings;
pub mod state;
pub mod stats;
pub mod table;
pub mod window;

#[cfg(feature = "evdev-backend")]
pub mod event;

pub use action::Action;
pub use composer::{Composer, ComposerState, ExpiryOutcome, StateChange};
pub use indicator::{led_state, IndicatorDevice, IndicatorError, IndicatorSynchronizer};
pub use input::{is_keyboard, is_virtual_device, DeviceCapabilities, DeviceFilter};
pub use key::{Key, KeySym};
pub use keycode::{KeyCode, UnknownKeyName};
pub use layout::{KeyboardLayout, LayoutInput, TableLayout};
pub use normalize::{normalize, ModifierSnapshot, NormalizedKey, RawKeyEvent};
pub use output::{Clipboard, InputSink, OutputError, OutputSynthesizer, Strategy, UnicodeInput};
pub use sequence::KeySequence;
pub use settings::{ClipboardBackend, ComposerSettings, SettingsError};
pub use state::LockState;
pub use stats::{NoStats, StatsSink, UsageStats};
pub use table::{GenericSequences, SequenceTable, TableError};
pub use window::{
    FocusSource, StaticWindow, WindowClass, WindowClassifier, WindowError, WindowInfo,
    WindowInspector, WindowTracker,
};

#[cfg(feature = "evdev-backend")]
pub use event::{EventLoop, EventLoopError, EventLoopResult};
#[cfg(feature = "evdev-backend")]
pub use indicator::EvdevIndicator;
#[cfg(feature = "evdev-backend")]
pub use output::VirtualKeyboard;
