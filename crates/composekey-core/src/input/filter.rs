// Composekey Input Layer - Device Filtering
// Which keyboards to grab: autodetected, or named on the command line

/// Device selection. With no names every physical keyboard is used;
/// otherwise exactly the devices whose path or name is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    names: Vec<String>,
}

impl DeviceFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn autodetect() -> Self {
        Self::default()
    }

    pub fn is_autodetect(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Explicit names win over detection, so a listed virtual device is used
    pub fn matches(&self, name: &str, path: &str, is_keyboard: bool, is_virtual: bool) -> bool {
        if !self.names.is_empty() {
            return self.names.iter().any(|n| n == path || n == name);
        }
        is_keyboard && !is_virtual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_path_or_name() {
        let filter = DeviceFilter::new(["/dev/input/event0", "Logitech Keyboard"]);
        assert!(filter.matches("Other", "/dev/input/event0", true, false));
        assert!(filter.matches("Logitech Keyboard", "/dev/input/event5", true, false));
        assert!(!filter.matches("Other", "/dev/input/event1", true, false));
    }

    #[test]
    fn test_autodetect_keyboards_only() {
        let filter = DeviceFilter::autodetect();
        assert!(filter.is_autodetect());
        assert!(filter.matches("Generic Keyboard", "/dev/input/event0", true, false));
        assert!(!filter.matches("Generic Mouse", "/dev/input/event1", false, false));
        assert!(!filter.matches(
            "Composekey (virtual) Keyboard",
            "/dev/input/event2",
            true,
            true
        ));
    }

    #[test]
    fn test_explicit_match_includes_virtual() {
        let filter = DeviceFilter::new(["Composekey (virtual) Keyboard"]);
        assert!(filter.matches(
            "Composekey (virtual) Keyboard",
            "/dev/input/event2",
            true,
            true
        ));
    }
}
