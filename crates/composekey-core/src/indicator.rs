// Composekey Indicator Synchronizer
// Keyboard LEDs follow lock state, and light up a lock key used for composing

use crate::composer::StateChange;
use crate::state::LockState;
use crate::KeyCode;

#[derive(Debug, thiserror::Error)]
pub enum IndicatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device {0} has no lock LEDs")]
    NoLeds(String),
}

/// A device with Caps, Num and Scroll Lock LEDs
pub trait IndicatorDevice: Send {
    fn name(&self) -> &str;

    fn set_leds(&mut self, leds: LockState) -> Result<(), IndicatorError>;
}

/// LED state for a composer state: a lock LED is on when the lock is on,
/// or while composing with that lock key
pub fn led_state(change: &StateChange) -> LockState {
    let composing_with = |code: KeyCode| change.is_composing() && change.compose_key == Some(code);
    LockState {
        caps: change.locks.caps || composing_with(KeyCode::CAPSLOCK),
        num: change.locks.num || composing_with(KeyCode::NUMLOCK),
        scroll: change.locks.scroll || composing_with(KeyCode::SCROLLLOCK),
    }
}

/// Pushes LED state to every keyboard
#[derive(Default)]
pub struct IndicatorSynchronizer {
    devices: Vec<Box<dyn IndicatorDevice>>,
    last: Option<LockState>,
}

impl IndicatorSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device<D: IndicatorDevice + 'static>(&mut self, device: D) {
        self.devices.push(Box::new(device));
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Update the LEDs if they changed; returns the state pushed
    pub fn sync(&mut self, change: &StateChange) -> LockState {
        let leds = led_state(change);
        if self.last != Some(leds) {
            self.push(leds);
        }
        leds
    }

    /// Update the LEDs unconditionally
    pub fn force_sync(&mut self, change: &StateChange) -> LockState {
        let leds = led_state(change);
        self.push(leds);
        leds
    }

    fn push(&mut self, leds: LockState) {
        log::debug!("Setting LEDs {:?}", leds);
        // One failing device does not stop the others
        for device in &mut self.devices {
            if let Err(e) = device.set_leds(leds) {
                log::warn!("Failed to set LEDs on {}: {}", device.name(), e);
            }
        }
        self.last = Some(leds);
    }
}

/// LEDs of an evdev keyboard, written as EV_LED events
#[cfg(feature = "evdev-backend")]
pub struct EvdevIndicator {
    device: evdev::Device,
    name: String,
}

#[cfg(feature = "evdev-backend")]
impl EvdevIndicator {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, IndicatorError> {
        let device = evdev::Device::open(path.as_ref())?;
        let name = device
            .name()
            .unwrap_or_else(|| path.as_ref().to_str().unwrap_or("Unknown"))
            .to_string();
        let has_leds = device.supported_leds().is_some_and(|leds| {
            leds.contains(evdev::LedType::LED_CAPSL)
                || leds.contains(evdev::LedType::LED_NUML)
                || leds.contains(evdev::LedType::LED_SCROLLL)
        });
        if !has_leds {
            return Err(IndicatorError::NoLeds(name));
        }
        Ok(Self { device, name })
    }
}

#[cfg(feature = "evdev-backend")]
impl IndicatorDevice for EvdevIndicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_leds(&mut self, leds: LockState) -> Result<(), IndicatorError> {
        use evdev::{EventType, InputEvent, LedType};

        let led = |code: LedType, on: bool| InputEvent::new(EventType::LED, code.0, i32::from(on));
        self.device.send_events(&[
            led(LedType::LED_NUML, leds.num),
            led(LedType::LED_CAPSL, leds.caps),
            led(LedType::LED_SCROLLL, leds.scroll),
            InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
        ])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ComposerState;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FakeLeds {
        name: String,
        fail: bool,
        pushed: Arc<Mutex<Vec<LockState>>>,
    }

    impl IndicatorDevice for FakeLeds {
        fn name(&self) -> &str {
            &self.name
        }

        fn set_leds(&mut self, leds: LockState) -> Result<(), IndicatorError> {
            if self.fail {
                return Err(IndicatorError::NoLeds(self.name.clone()));
            }
            self.pushed.lock().push(leds);
            Ok(())
        }
    }

    fn change(state: ComposerState, compose_key: KeyCode, caps: bool) -> StateChange {
        StateChange {
            state,
            compose_key: Some(compose_key),
            disabled: false,
            locks: LockState {
                caps,
                ..LockState::default()
            },
        }
    }

    #[test]
    fn test_led_lit_while_composing_with_lock_key() {
        let leds = led_state(&change(ComposerState::Sequence, KeyCode::CAPSLOCK, false));
        assert!(leds.caps);
        assert!(!leds.num);

        let leds = led_state(&change(ComposerState::Idle, KeyCode::CAPSLOCK, false));
        assert!(!leds.caps);

        let leds = led_state(&change(ComposerState::Sequence, KeyCode::RIGHT_ALT, false));
        assert_eq!(leds, LockState::default());

        let leds = led_state(&change(ComposerState::Idle, KeyCode::RIGHT_ALT, true));
        assert!(leds.caps);
    }

    #[test]
    fn test_failing_device_does_not_block_others() {
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let mut sync = IndicatorSynchronizer::new();
        sync.add_device(FakeLeds {
            name: "broken".to_string(),
            fail: true,
            pushed: pushed.clone(),
        });
        sync.add_device(FakeLeds {
            name: "working".to_string(),
            fail: false,
            pushed: pushed.clone(),
        });

        sync.sync(&change(ComposerState::Sequence, KeyCode::SCROLLLOCK, false));
        assert_eq!(pushed.lock().len(), 1);
        assert!(pushed.lock()[0].scroll);
    }

    #[test]
    fn test_unchanged_state_not_pushed_again() {
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let mut sync = IndicatorSynchronizer::new();
        sync.add_device(FakeLeds {
            name: "kbd".to_string(),
            fail: false,
            pushed: pushed.clone(),
        });

        let idle = change(ComposerState::Idle, KeyCode::CAPSLOCK, false);
        sync.sync(&idle);
        sync.sync(&idle);
        assert_eq!(pushed.lock().len(), 1);
        sync.force_sync(&idle);
        assert_eq!(pushed.lock().len(), 2);
    }
}
