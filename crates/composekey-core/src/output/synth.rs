// Composekey Output Synthesizer
// Delivers result strings using the strategy the focused window needs

use super::clipboard::Clipboard;
use super::sink::{InputSink, OutputError, UnicodeInput};
use super::strategy::{select_strategy, Strategy};
use crate::modifier::TYPING_MODIFIERS;
use crate::window::WindowClass;
use crate::KeyCode;

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Types text through a sink, borrowing the sink and clipboard for one call
pub struct OutputSynthesizer<'a> {
    sink: &'a mut dyn InputSink,
    clipboard: &'a mut dyn Clipboard,
}

impl<'a> OutputSynthesizer<'a> {
    pub fn new(sink: &'a mut dyn InputSink, clipboard: &'a mut dyn Clipboard) -> Self {
        Self { sink, clipboard }
    }

    /// Type `text` into the window described by `class`, returning the
    /// strategy that delivered it
    pub fn send_string(
        &mut self,
        text: &str,
        class: &WindowClass,
        insert_zwsp: bool,
    ) -> Result<Strategy, OutputError> {
        if text.is_empty() {
            return Ok(Strategy::Batch);
        }

        let strategy = select_strategy(class, insert_zwsp, text);
        log::debug!("Sending {:?} via {:?}", text, strategy);

        match strategy {
            Strategy::UnicodeEntry => {
                self.with_modifiers_released(|s| s.unicode_entry(text))?;
                Ok(Strategy::UnicodeEntry)
            }
            Strategy::Clipboard => {
                if self.paste(text)? {
                    Ok(Strategy::Clipboard)
                } else {
                    self.batch(text, false)?;
                    Ok(Strategy::Batch)
                }
            }
            Strategy::ZwspBatch => {
                self.with_modifiers_released(|s| s.batch(text, true))?;
                Ok(Strategy::ZwspBatch)
            }
            Strategy::Batch => {
                self.batch(text, false)?;
                Ok(Strategy::Batch)
            }
        }
    }

    /// Release held modifiers around `f` and press them again afterwards.
    /// Caps Lock keeps the toggle state it had before the release.
    fn with_modifiers_released<F>(&mut self, f: F) -> Result<(), OutputError>
    where
        F: FnOnce(&mut Self) -> Result<(), OutputError>,
    {
        let held: Vec<KeyCode> = TYPING_MODIFIERS
            .iter()
            .copied()
            .filter(|code| self.sink.is_down(*code))
            .collect();
        let caps_on = self.sink.is_toggled(KeyCode::CAPSLOCK);
        for code in &held {
            self.sink.key_up(*code)?;
        }

        let result = f(self);

        for &code in &held {
            self.sink.key_down(code)?;
            // A re-press that flips the lock is undone by a second press
            if code == KeyCode::CAPSLOCK && self.sink.is_toggled(KeyCode::CAPSLOCK) != caps_on {
                self.sink.key_up(code)?;
                self.sink.key_down(code)?;
            }
        }
        result
    }

    /// Ctrl+Shift+U entry with Caps Lock forced off, since it would
    /// uppercase the hex digits' letters into shortcuts
    fn unicode_entry(&mut self, text: &str) -> Result<(), OutputError> {
        let caps_on = self.sink.is_toggled(KeyCode::CAPSLOCK);
        if caps_on {
            self.sink.tap(KeyCode::CAPSLOCK)?;
        }

        for ch in text.chars() {
            self.sink.key_down(KeyCode::LEFT_CTRL)?;
            self.sink.key_down(KeyCode::LEFT_SHIFT)?;
            self.sink.tap(KeyCode::U)?;
            self.sink.key_up(KeyCode::LEFT_SHIFT)?;
            self.sink.key_up(KeyCode::LEFT_CTRL)?;

            for digit in format!("{:04X}", u32::from(ch)).chars() {
                let key = KeyCode::for_hex_digit(digit).ok_or(OutputError::UnsupportedChar(ch))?;
                self.sink.tap(key)?;
            }
            self.sink.tap(KeyCode::SPACE)?;
        }

        if caps_on {
            self.sink.tap(KeyCode::CAPSLOCK)?;
        }
        Ok(())
    }

    /// Paste through the clipboard; `false` when it could not be used and
    /// nothing was typed
    fn paste(&mut self, text: &str) -> Result<bool, OutputError> {
        let saved = match self.clipboard.snapshot() {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Clipboard snapshot failed, typing instead: {}", e);
                return Ok(false);
            }
        };
        if let Err(e) = self.clipboard.set_text(text) {
            log::warn!("Clipboard write failed, typing instead: {}", e);
            return Ok(false);
        }

        self.sink.key_down(KeyCode::LEFT_SHIFT)?;
        self.sink.tap(KeyCode::INSERT)?;
        self.sink.key_up(KeyCode::LEFT_SHIFT)?;

        if let Err(e) = self.clipboard.clear() {
            log::warn!("Clipboard clear failed: {}", e);
        }
        if let Err(e) = self.clipboard.restore(saved) {
            log::warn!("Clipboard restore failed: {}", e);
        }
        Ok(true)
    }

    fn batch(&mut self, text: &str, zwsp: bool) -> Result<(), OutputError> {
        let mut inputs = Vec::with_capacity(text.len() + 3);
        if zwsp {
            inputs.push(UnicodeInput::Char(ZERO_WIDTH_SPACE));
            inputs.push(UnicodeInput::Key(KeyCode::LEFT));
        }
        inputs.extend(text.chars().map(UnicodeInput::Char));
        if zwsp {
            inputs.push(UnicodeInput::Key(KeyCode::RIGHT));
        }
        self.sink.unicode_batch(&inputs)
    }
}
