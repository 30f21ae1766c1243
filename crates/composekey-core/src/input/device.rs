// Composekey Input Layer - Device Detection
// Capability checks deciding which devices are keyboards

use std::collections::HashSet;

use crate::KeyCode;

/// What a device reports it can do
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    pub has_ev_key: bool,
    pub supported_keys: HashSet<u16>,
    /// LED codes (EV_LED capability codes)
    pub supported_leds: HashSet<u16>,
}

impl DeviceCapabilities {
    pub fn new<I: IntoIterator<Item = u16>>(has_ev_key: bool, supported_keys: I) -> Self {
        Self {
            has_ev_key,
            supported_keys: supported_keys.into_iter().collect(),
            supported_leds: HashSet::new(),
        }
    }

    pub fn with_leds<I: IntoIterator<Item = u16>>(mut self, leds: I) -> Self {
        self.supported_leds = leds.into_iter().collect();
        self
    }

    pub fn supports_key(&self, code: KeyCode) -> bool {
        self.supported_keys.contains(&code.code())
    }

    /// Whether the device has any of the Caps, Num or Scroll Lock LEDs
    pub fn supports_lock_leds(&self) -> bool {
        LOCK_LED_CODES
            .iter()
            .any(|code| self.supported_leds.contains(code))
    }
}

const QWERTY_CODES: &[KeyCode] = &[
    KeyCode::Q,
    KeyCode::W,
    KeyCode::E,
    KeyCode::R,
    KeyCode::T,
    KeyCode::Y,
];

const A_Z_SPACE_CODES: &[KeyCode] = &[KeyCode::SPACE, KeyCode::A, KeyCode::Z];

/// LED_NUML, LED_CAPSL, LED_SCROLLL
const LOCK_LED_CODES: &[u16] = &[0x00, 0x01, 0x02];

/// A device is a keyboard when it sends key events and has the QWERTY row,
/// A, Z and Space
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    capabilities.has_ev_key
        && QWERTY_CODES
            .iter()
            .chain(A_Z_SPACE_CODES)
            .all(|code| capabilities.supports_key(*code))
}

/// Devices named with `prefix` are ours; grabbing them would loop output
/// back into input
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_caps() -> DeviceCapabilities {
        let mut keys: Vec<u16> = vec![0];
        keys.extend(QWERTY_CODES.iter().map(|k| k.code()));
        keys.extend(A_Z_SPACE_CODES.iter().map(|k| k.code()));
        keys.extend_from_slice(&[14, 15, 28, 29, 42, 56, 100]);
        DeviceCapabilities::new(true, keys)
    }

    #[test]
    fn test_full_keyboard() {
        assert!(is_keyboard(&keyboard_caps()));
    }

    #[test]
    fn test_mouse_is_not_keyboard() {
        let caps = DeviceCapabilities::new(true, [272, 273, 274]);
        assert!(!is_keyboard(&caps));
    }

    #[test]
    fn test_missing_row_or_ev_key() {
        let caps = DeviceCapabilities::new(true, A_Z_SPACE_CODES.iter().map(|k| k.code()));
        assert!(!is_keyboard(&caps));

        let mut caps = keyboard_caps();
        caps.has_ev_key = false;
        assert!(!is_keyboard(&caps));
    }

    #[test]
    fn test_lock_leds() {
        assert!(!keyboard_caps().supports_lock_leds());
        assert!(keyboard_caps().with_leds([0x01]).supports_lock_leds());
        // LED_COMPOSE alone does not count
        assert!(!keyboard_caps().with_leds([0x03]).supports_lock_leds());
    }

    #[test]
    fn test_virtual_device_name() {
        assert!(is_virtual_device(
            "Composekey (virtual) Keyboard",
            "Composekey (virtual)"
        ));
        assert!(!is_virtual_device("Logitech USB Keyboard", "Composekey (virtual)"));
    }
}
