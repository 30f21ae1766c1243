// Window Inspection Trait
//
// This module defines the interface for window inspectors, which tell the
// output layer which quirks the focused application needs.

use parking_lot::Mutex;
use std::sync::Arc;

use super::classifier::WindowClassifier;

/// Identification of the focused window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    /// Window class/app_id (e.g., "libreoffice-writer", "org.gnome.TextEditor")
    pub wm_class: Option<String>,

    /// Window title
    pub wm_name: Option<String>,
}

impl WindowInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_details(wm_class: Option<String>, wm_name: Option<String>) -> Self {
        Self { wm_class, wm_name }
    }
}

/// Quirk flags of the focused window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowClass {
    /// Remote desktop or nested display; keys must pass through untouched
    pub other_desktop: bool,
    /// Needs Ctrl+Shift+U code point entry
    pub gtk: bool,
    /// Office suite; may need zero-width space bracketing
    pub office: bool,
    /// Mangles characters outside the BMP unless pasted
    pub npp_or_libreoffice: bool,
}

/// Window inspection collaborator
pub trait WindowInspector: Send {
    /// Classification of the currently focused window
    fn active_class(&self) -> WindowClass;
}

/// Inspector that always reports the same classification
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticWindow(pub WindowClass);

impl WindowInspector for StaticWindow {
    fn active_class(&self) -> WindowClass {
        self.0
    }
}

/// Inspector fed by whoever tracks focus.
///
/// The host calls [`WindowTracker::set_active`] on focus changes; the
/// composer classifies the last reported window on each event.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    active: Arc<Mutex<WindowInfo>>,
    classifier: Arc<WindowClassifier>,
}

impl WindowTracker {
    pub fn new(classifier: WindowClassifier) -> Self {
        Self {
            active: Arc::new(Mutex::new(WindowInfo::new())),
            classifier: Arc::new(classifier),
        }
    }

    pub fn set_active(&self, info: WindowInfo) {
        log::debug!("Focused window: {:?}", info);
        *self.active.lock() = info;
    }

    pub fn active(&self) -> WindowInfo {
        self.active.lock().clone()
    }
}

impl WindowInspector for WindowTracker {
    fn active_class(&self) -> WindowClass {
        self.classifier.classify(&self.active.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_window() {
        let class = WindowClass {
            gtk: true,
            ..WindowClass::default()
        };
        assert_eq!(StaticWindow(class).active_class(), class);
    }

    #[test]
    fn test_tracker_classifies_latest_window() {
        let tracker = WindowTracker::new(WindowClassifier::default());
        assert_eq!(tracker.active_class(), WindowClass::default());

        let handle = tracker.clone();
        handle.set_active(WindowInfo::with_details(
            Some("libreoffice-writer".to_string()),
            Some("Untitled 1".to_string()),
        ));

        let class = tracker.active_class();
        assert!(class.office);
        assert!(class.npp_or_libreoffice);
        assert!(!class.gtk);
    }
}
