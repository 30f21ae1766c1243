use std::fmt;

/// Key transition as reported by the kernel in `EV_KEY` event values.
///
///   0 == released
///   1 == pressed
///   2 == autorepeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    /// Press and autorepeat both count as the key being down
    pub fn is_down(self) -> bool {
        matches!(self, Action::Press | Action::Repeat)
    }

    pub fn is_up(self) -> bool {
        matches!(self, Action::Release)
    }

    pub fn is_repeat(self) -> bool {
        matches!(self, Action::Repeat)
    }

    /// Map an `EV_KEY` value; anything outside 0..=2 is not a key transition
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Action::Release),
            1 => Some(Action::Press),
            2 => Some(Action::Repeat),
            _ => None,
        }
    }

    pub fn value(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Release => write!(f, "up"),
            Action::Press => write!(f, "down"),
            Action::Repeat => write!(f, "repeat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_counts_as_down() {
        assert!(Action::Press.is_down());
        assert!(Action::Repeat.is_down());
        assert!(!Action::Release.is_down());
        assert!(Action::Release.is_up());
        assert!(Action::Repeat.is_repeat());
    }

    #[test]
    fn test_action_from_value() {
        assert_eq!(Action::from_value(0), Some(Action::Release));
        assert_eq!(Action::from_value(1), Some(Action::Press));
        assert_eq!(Action::from_value(2), Some(Action::Repeat));
        assert_eq!(Action::from_value(7), None);
        assert_eq!(Action::Repeat.value(), 2);
    }
}
