// Composekey Test Support
// A sink that records everything the composer types

#![allow(dead_code)]

use indexmap::IndexSet;
use parking_lot::Mutex;
use std::sync::Arc;

use composekey_core::{InputSink, KeyCode, LockState, OutputError, UnicodeInput};

/// One output operation, in the order the composer issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Down(KeyCode),
    Up(KeyCode),
    Batch(Vec<UnicodeInput>),
    Beep,
}

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<Event>,
    down: IndexSet<KeyCode>,
    locks: LockState,
}

/// Recording sink; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    /// Characters delivered through batches, concatenated
    pub fn typed_text(&self) -> String {
        self.inner
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Batch(inputs) => Some(inputs),
                _ => None,
            })
            .flatten()
            .filter_map(|input| match input {
                UnicodeInput::Char(ch) => Some(*ch),
                UnicodeInput::Key(_) => None,
            })
            .collect()
    }

    pub fn beeps(&self) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| **event == Event::Beep)
            .count()
    }

    pub fn clear(&self) {
        self.inner.lock().events.clear();
    }

    pub fn set_caps(&self, on: bool) {
        self.inner.lock().locks.caps = on;
    }

    pub fn caps(&self) -> bool {
        self.inner.lock().locks.caps
    }
}

impl InputSink for RecordingSink {
    fn key_down(&mut self, code: KeyCode) -> Result<(), OutputError> {
        let mut inner = self.inner.lock();
        if code.is_lock() && !inner.down.contains(&code) {
            inner.locks.toggle(code);
        }
        inner.down.insert(code);
        inner.events.push(Event::Down(code));
        Ok(())
    }

    fn key_up(&mut self, code: KeyCode) -> Result<(), OutputError> {
        let mut inner = self.inner.lock();
        inner.down.shift_remove(&code);
        inner.events.push(Event::Up(code));
        Ok(())
    }

    fn unicode_batch(&mut self, inputs: &[UnicodeInput]) -> Result<(), OutputError> {
        self.inner.lock().events.push(Event::Batch(inputs.to_vec()));
        Ok(())
    }

    fn is_down(&self, code: KeyCode) -> bool {
        self.inner.lock().down.contains(&code)
    }

    fn is_toggled(&self, code: KeyCode) -> bool {
        self.inner.lock().locks.is_on(code)
    }

    fn beep(&mut self) {
        self.inner.lock().events.push(Event::Beep);
    }
}

