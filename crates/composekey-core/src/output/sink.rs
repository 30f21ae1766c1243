// Composekey Output Sink
// The seam between the composer and whatever emits key events

use parking_lot::Mutex;
use std::sync::Arc;

use crate::KeyCode;

/// One element of a Unicode batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnicodeInput {
    /// Insert this character, however the sink manages to
    Char(char),
    /// Tap this key
    Key(KeyCode),
}

/// Error types for output operations
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Cannot type character {0:?}")]
    UnsupportedChar(char),
}

/// Synthetic input collaborator.
///
/// Key state queries answer for the synthetic device, which is what
/// applications see.
pub trait InputSink: Send {
    fn key_down(&mut self, code: KeyCode) -> Result<(), OutputError>;

    fn key_up(&mut self, code: KeyCode) -> Result<(), OutputError>;

    fn tap(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.key_down(code)?;
        self.key_up(code)
    }

    /// Deliver a batch of characters and keys as one unit
    fn unicode_batch(&mut self, inputs: &[UnicodeInput]) -> Result<(), OutputError>;

    fn is_down(&self, code: KeyCode) -> bool;

    /// Toggle state of a lock key
    fn is_toggled(&self, code: KeyCode) -> bool;

    /// Audible alert for an unmatched sequence; sinks without a bell only log it
    fn beep(&mut self) {
        log::info!("Invalid compose sequence");
    }
}

/// A sink shared with the host, which forwards unhandled events through it
impl<T: InputSink> InputSink for Arc<Mutex<T>> {
    fn key_down(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.lock().key_down(code)
    }

    fn key_up(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.lock().key_up(code)
    }

    fn tap(&mut self, code: KeyCode) -> Result<(), OutputError> {
        self.lock().tap(code)
    }

    fn unicode_batch(&mut self, inputs: &[UnicodeInput]) -> Result<(), OutputError> {
        self.lock().unicode_batch(inputs)
    }

    fn is_down(&self, code: KeyCode) -> bool {
        self.lock().is_down(code)
    }

    fn is_toggled(&self, code: KeyCode) -> bool {
        self.lock().is_toggled(code)
    }

    fn beep(&mut self) {
        self.lock().beep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Silent {
        bells: usize,
    }

    impl InputSink for Silent {
        fn key_down(&mut self, _code: KeyCode) -> Result<(), OutputError> {
            Ok(())
        }

        fn key_up(&mut self, _code: KeyCode) -> Result<(), OutputError> {
            Ok(())
        }

        fn unicode_batch(&mut self, _inputs: &[UnicodeInput]) -> Result<(), OutputError> {
            Ok(())
        }

        fn is_down(&self, _code: KeyCode) -> bool {
            false
        }

        fn is_toggled(&self, _code: KeyCode) -> bool {
            false
        }
    }

    struct Ringing(Silent);

    impl InputSink for Ringing {
        fn key_down(&mut self, code: KeyCode) -> Result<(), OutputError> {
            self.0.key_down(code)
        }

        fn key_up(&mut self, code: KeyCode) -> Result<(), OutputError> {
            self.0.key_up(code)
        }

        fn unicode_batch(&mut self, inputs: &[UnicodeInput]) -> Result<(), OutputError> {
            self.0.unicode_batch(inputs)
        }

        fn is_down(&self, code: KeyCode) -> bool {
            self.0.is_down(code)
        }

        fn is_toggled(&self, code: KeyCode) -> bool {
            self.0.is_toggled(code)
        }

        fn beep(&mut self) {
            self.0.bells += 1;
        }
    }

    #[test]
    fn test_default_beep_only_logs() {
        let mut sink = Silent::default();
        sink.beep();
        assert_eq!(sink.bells, 0);
    }

    #[test]
    fn test_shared_sink_rings_inner_bell() {
        let shared = Arc::new(Mutex::new(Ringing(Silent::default())));
        let mut handle = shared.clone();
        handle.beep();
        handle.beep();
        assert_eq!(shared.lock().0.bells, 2);
    }
}
