// Composekey Output Strategy Selection

use crate::window::WindowClass;

/// How a result string reaches the focused application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One character-insert input per character, sent as a batch
    Batch,
    /// Batch bracketed by a zero-width space and cursor moves
    ZwspBatch,
    /// Ctrl+Shift+U, hex code point, Space; per character
    UnicodeEntry,
    /// Place the text on the clipboard and paste it
    Clipboard,
}

fn has_astral(text: &str) -> bool {
    text.chars().any(|c| u32::from(c) > 0xFFFF)
}

pub fn select_strategy(class: &WindowClass, insert_zwsp: bool, text: &str) -> Strategy {
    if class.gtk {
        Strategy::UnicodeEntry
    } else if class.npp_or_libreoffice && has_astral(text) {
        Strategy::Clipboard
    } else if class.office && insert_zwsp {
        Strategy::ZwspBatch
    } else {
        Strategy::Batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_batch() {
        assert_eq!(select_strategy(&WindowClass::default(), true, "é"), Strategy::Batch);
    }

    #[test]
    fn test_quirky_windows() {
        let gtk = WindowClass {
            gtk: true,
            office: true,
            ..WindowClass::default()
        };
        assert_eq!(select_strategy(&gtk, true, "😀"), Strategy::UnicodeEntry);

        let libreoffice = WindowClass {
            office: true,
            npp_or_libreoffice: true,
            ..WindowClass::default()
        };
        assert_eq!(select_strategy(&libreoffice, true, "😀"), Strategy::Clipboard);
        assert_eq!(select_strategy(&libreoffice, true, "é"), Strategy::ZwspBatch);
        assert_eq!(select_strategy(&libreoffice, false, "é"), Strategy::Batch);
    }
}
