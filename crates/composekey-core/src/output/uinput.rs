// Composekey uinput Output Layer
// Virtual keyboard creation and key event emission

use super::sink::{InputSink, OutputError, UnicodeInput};
use crate::state::{LockState, PressedKeys};
use crate::{modifier, Action, KeyCode};

use evdev::{EventType, InputEvent};

/// Name prefix of the virtual device; the input side skips devices with it
pub const VIRTUAL_DEVICE_NAME: &str = "Composekey (virtual) Keyboard";

const BELL_DURATION: std::time::Duration = std::time::Duration::from_millis(80);

/// Virtual uinput keyboard.
///
/// Carries both forwarded physical events and synthesized output, so its
/// pressed and lock state is what applications observe.
pub struct VirtualKeyboard {
    device: evdev::uinput::VirtualDevice,
    pressed_keys: PressedKeys,
    pressed_modifiers: PressedKeys,
    locks: LockState,
    bells: Vec<std::path::PathBuf>,
}

impl VirtualKeyboard {
    /// Create a new virtual uinput keyboard
    pub fn new() -> Result<Self, OutputError> {
        use evdev::uinput::VirtualDeviceBuilder;
        use evdev::AttributeSet;

        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            device,
            pressed_keys: PressedKeys::new(),
            pressed_modifiers: PressedKeys::new(),
            locks: LockState::default(),
            bells: Vec::new(),
        })
    }

    /// Register every input device with a bell, such as the PC speaker
    pub fn add_system_bells(&mut self) -> usize {
        let before = self.bells.len();
        for (path, device) in evdev::enumerate() {
            if Self::has_bell(&device) {
                log::debug!("Bell: {} ({})", device.name().unwrap_or("Unknown"), path.display());
                self.bells.push(path);
            }
        }
        self.bells.len() - before
    }

    fn has_bell(device: &evdev::Device) -> bool {
        device
            .supported_sounds()
            .is_some_and(|sounds| sounds.contains(evdev::SoundType::SND_BELL))
    }

    /// Start from lock state read off the physical keyboard
    pub fn set_locks(&mut self, locks: LockState) {
        self.locks = locks;
    }

    pub fn locks(&self) -> LockState {
        self.locks
    }

    fn write_key_event(&mut self, code: KeyCode, action: Action) -> Result<(), OutputError> {
        let key_event = InputEvent::new(EventType::KEY, code.code(), action.value());
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| OutputError::WriteError(e.to_string()))?;

        if action == Action::Press && code.is_lock() {
            self.locks.toggle(code);
        }
        if modifier::is_modifier(code) {
            self.pressed_modifiers.apply(code, action);
        } else {
            self.pressed_keys.apply(code, action);
        }
        Ok(())
    }

    /// Pass a physical event through unchanged
    pub fn forward(&mut self, code: KeyCode, action: Action) -> Result<(), OutputError> {
        log::trace!("forward {} {}", code, action);
        self.write_key_event(code, action)
    }

    fn ascii_key_and_shift(ch: char) -> Option<(KeyCode, bool)> {
        if ch.is_ascii_alphabetic() {
            let lower = ch.to_ascii_lowercase().to_string();
            return KeyCode::from_name(&lower).map(|k| (k, ch.is_ascii_uppercase()));
        }
        if ch.is_ascii_digit() {
            return KeyCode::from_name(&ch.to_string()).map(|k| (k, false));
        }

        let mapped = match ch {
            ' ' => (KeyCode::SPACE, false),
            '\n' => (KeyCode::ENTER, false),
            '\t' => (KeyCode::TAB, false),
            '-' => (KeyCode::MINUS, false),
            '_' => (KeyCode::MINUS, true),
            '=' => (KeyCode::EQUAL, false),
            '+' => (KeyCode::EQUAL, true),
            '[' => (KeyCode::LEFT_BRACE, false),
            '{' => (KeyCode::LEFT_BRACE, true),
            ']' => (KeyCode::RIGHT_BRACE, false),
            '}' => (KeyCode::RIGHT_BRACE, true),
            '\\' => (KeyCode::BACKSLASH, false),
            '|' => (KeyCode::BACKSLASH, true),
            ';' => (KeyCode::SEMICOLON, false),
            ':' => (KeyCode::SEMICOLON, true),
            '\'' => (KeyCode::APOSTROPHE, false),
            '"' => (KeyCode::APOSTROPHE, true),
            ',' => (KeyCode::COMMA, false),
            '<' => (KeyCode::COMMA, true),
            '.' => (KeyCode::DOT, false),
            '>' => (KeyCode::DOT, true),
            '/' => (KeyCode::SLASH, false),
            '?' => (KeyCode::SLASH, true),
            '`' => (KeyCode::GRAVE, false),
            '~' => (KeyCode::GRAVE, true),
            '!' => (KeyCode::KEY_1, true),
            '@' => (KeyCode::KEY_2, true),
            '#' => (KeyCode::KEY_3, true),
            '$' => (KeyCode::KEY_4, true),
            '%' => (KeyCode::KEY_5, true),
            '^' => (KeyCode::KEY_6, true),
            '&' => (KeyCode::KEY_7, true),
            '*' => (KeyCode::KEY_8, true),
            '(' => (KeyCode::KEY_9, true),
            ')' => (KeyCode::KEY_0, true),
            _ => return None,
        };
        Some(mapped)
    }

    fn send_ascii_char(&mut self, ch: char) -> Result<bool, OutputError> {
        let Some((key, mut needs_shift)) = Self::ascii_key_and_shift(ch) else {
            return Ok(false);
        };
        // Caps Lock inverts Shift for letters
        if ch.is_ascii_alphabetic() && self.locks.caps {
            needs_shift = !needs_shift;
        }

        if needs_shift {
            self.write_key_event(KeyCode::LEFT_SHIFT, Action::Press)?;
            self.tap(key)?;
            self.write_key_event(KeyCode::LEFT_SHIFT, Action::Release)?;
        } else {
            self.tap(key)?;
        }
        Ok(true)
    }

    /// Send a character via Ctrl+Shift+U hex entry, committed with Enter
    fn send_unicode(&mut self, ch: char) -> Result<(), OutputError> {
        self.write_key_event(KeyCode::LEFT_CTRL, Action::Press)?;
        self.write_key_event(KeyCode::LEFT_SHIFT, Action::Press)?;
        self.tap(KeyCode::U)?;
        self.write_key_event(KeyCode::LEFT_SHIFT, Action::Release)?;
        self.write_key_event(KeyCode::LEFT_CTRL, Action::Release)?;

        for digit in format!("{:x}", u32::from(ch)).chars() {
            let key = KeyCode::for_hex_digit(digit).ok_or(OutputError::UnsupportedChar(ch))?;
            self.tap(key)?;
        }
        self.tap(KeyCode::ENTER)
    }

    /// Release all pressed keys (for shutdown)
    pub fn release_all(&mut self) -> Result<(), OutputError> {
        for code in self.pressed_keys.all().into_iter().rev() {
            self.write_key_event(code, Action::Release)?;
        }
        for code in self.pressed_modifiers.all().into_iter().rev() {
            self.write_key_event(code, Action::Release)?;
        }
        Ok(())
    }
}

impl InputSink for VirtualKeyboard {
    fn key_down(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.write_key_event(code, Action::Press)
    }

    fn key_up(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.write_key_event(code, Action::Release)
    }

    /// ASCII goes out as plain key taps; everything else through hex entry,
    /// with held modifiers lifted for the duration
    fn unicode_batch(&mut self, inputs: &[UnicodeInput]) -> Result<(), OutputError> {
        let held = self.pressed_modifiers.all();
        for code in held.iter().rev() {
            self.write_key_event(*code, Action::Release)?;
        }

        for input in inputs {
            match *input {
                UnicodeInput::Key(code) => self.tap(code)?,
                UnicodeInput::Char(ch) => {
                    if !self.send_ascii_char(ch)? {
                        self.send_unicode(ch)?;
                    }
                }
            }
            // Some apps drop characters when virtual key events arrive with zero gap
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        for code in &held {
            self.write_key_event(*code, Action::Press)?;
        }
        Ok(())
    }

    fn is_down(&self, code: KeyCode) -> bool {
        self.pressed_keys.is_pressed(code) || self.pressed_modifiers.is_pressed(code)
    }

    fn is_toggled(&self, code: KeyCode) -> bool {
        self.locks.is_on(code)
    }

    /// Rings each bell from its own thread
    fn beep(&mut self) {
        log::info!("Invalid compose sequence");
        for path in self.bells.clone() {
            std::thread::spawn(move || {
                let bell = |on: bool| {
                    InputEvent::new(EventType::SOUND, evdev::SoundType::SND_BELL.0, i32::from(on))
                };
                let syn = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
                let result = evdev::Device::open(&path).and_then(|mut device| {
                    device.send_events(&[bell(true), syn])?;
                    std::thread::sleep(BELL_DURATION);
                    device.send_events(&[bell(false), syn])
                });
                if let Err(e) = result {
                    log::warn!("Failed to ring bell on {}: {}", path.display(), e);
                }
            });
        }
    }
}
