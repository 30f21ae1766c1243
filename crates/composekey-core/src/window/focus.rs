// Focus Tracking
//
// Sources that watch the desktop for focus changes and report the newly
// focused window to a WindowTracker.

use super::provider::WindowTracker;

/// Error types for focus sources
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Failed to connect to display server: {0}")]
    ConnectionFailed(String),

    #[error("Display server does not support {0}")]
    Unsupported(&'static str),
}

/// A background watcher of the focused window.
///
/// Once connected, the source pushes every focus change into the tracker it
/// was created with until the display connection goes away.
pub trait FocusSource: Send {
    fn name(&self) -> &'static str;

    fn connect(&mut self) -> Result<(), WindowError>;

    fn is_connected(&self) -> bool;
}

/// Connect the first source that works, in order
pub fn connect_first(sources: Vec<Box<dyn FocusSource>>) -> Option<Box<dyn FocusSource>> {
    for mut source in sources {
        match source.connect() {
            Ok(()) => {
                log::info!("Tracking focused window via {}", source.name());
                return Some(source);
            }
            Err(e) => log::debug!("{} focus tracking unavailable: {}", source.name(), e),
        }
    }
    log::warn!("No focus source available; window-specific output is disabled");
    None
}

/// Every focus source compiled in, Wayland first
#[cfg_attr(
    not(any(feature = "wayland", feature = "x11-backend")),
    allow(unused_variables, unused_mut)
)]
pub fn default_sources(tracker: &WindowTracker) -> Vec<Box<dyn FocusSource>> {
    let mut sources: Vec<Box<dyn FocusSource>> = Vec::new();
    #[cfg(feature = "wayland")]
    sources.push(Box::new(super::wayland::WaylandFocus::new(tracker.clone())));
    #[cfg(feature = "x11-backend")]
    sources.push(Box::new(super::x11::X11Focus::new(tracker.clone())));
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{WindowClassifier, WindowInfo};

    struct FakeSource {
        name: &'static str,
        available: bool,
        connected: bool,
        tracker: WindowTracker,
    }

    impl FocusSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn connect(&mut self) -> Result<(), WindowError> {
            if !self.available {
                return Err(WindowError::ConnectionFailed("no display".to_string()));
            }
            self.connected = true;
            self.tracker
                .set_active(WindowInfo::with_details(Some(self.name.to_string()), None));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn fake(name: &'static str, available: bool, tracker: &WindowTracker) -> Box<dyn FocusSource> {
        Box::new(FakeSource {
            name,
            available,
            connected: false,
            tracker: tracker.clone(),
        })
    }

    #[test]
    fn test_first_working_source_wins() {
        let tracker = WindowTracker::new(WindowClassifier::default());
        let source = connect_first(vec![
            fake("wayland", false, &tracker),
            fake("x11", true, &tracker),
            fake("other", true, &tracker),
        ])
        .unwrap();

        assert_eq!(source.name(), "x11");
        assert!(source.is_connected());
        assert_eq!(tracker.active().wm_class.as_deref(), Some("x11"));
    }

    #[test]
    fn test_no_source_available() {
        let tracker = WindowTracker::new(WindowClassifier::default());
        assert!(connect_first(vec![fake("wayland", false, &tracker)]).is_none());
        assert!(connect_first(Vec::new()).is_none());
        assert_eq!(tracker.active(), WindowInfo::new());
    }
}
