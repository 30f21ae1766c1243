// Composekey Composer State

/// Mode of a composer session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ComposerState {
    /// Not composing; events pass through
    #[default]
    Idle,
    /// The compose key was pressed and keys are being collected
    Sequence,
    /// The compose key is being used as an ordinary modifier
    KeyCombination,
}

impl ComposerState {
    pub fn is_composing(self) -> bool {
        self == ComposerState::Sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_default() {
        assert_eq!(ComposerState::default(), ComposerState::Idle);
        assert_eq!(ComposerState::KeyCombination.to_string(), "KeyCombination");
        assert!(ComposerState::Sequence.is_composing());
        assert!(!ComposerState::KeyCombination.is_composing());
    }
}
