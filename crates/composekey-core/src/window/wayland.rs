// Wayland Focus Tracking
//
// Follows the activated toplevel on wlroots-based compositors through
// wlr-foreign-toplevel-management-unstable-v1.

use std::collections::HashMap;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use wayland_backend::rs::client::ObjectId;
use wayland_client::{
    event_created_child,
    globals::{registry_queue_init, GlobalListContents},
    protocol::wl_registry,
    Connection, Dispatch, Proxy, QueueHandle,
};
use wayland_protocols_wlr::foreign_toplevel::v1::client::{
    zwlr_foreign_toplevel_handle_v1, zwlr_foreign_toplevel_manager_v1,
};

use super::focus::{FocusSource, WindowError};
use super::provider::{WindowInfo, WindowTracker};

/// Value of the `activated` entry in a toplevel's state array
const STATE_ACTIVATED: u32 = 2;

/// The state array is a list of native-endian u32 values
fn is_activated(flags: &[u8]) -> bool {
    flags
        .chunks_exact(4)
        .any(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) == STATE_ACTIVATED)
}

#[derive(Debug, Clone, Default)]
struct Toplevel {
    app_id: Option<String>,
    title: Option<String>,
}

impl Toplevel {
    fn info(&self) -> WindowInfo {
        let present = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
        WindowInfo::with_details(present(&self.app_id), present(&self.title))
    }
}

/// Event queue state; owned by the dispatch thread
struct ToplevelState {
    toplevels: HashMap<ObjectId, Toplevel>,
    active: Option<ObjectId>,
    tracker: WindowTracker,
}

impl ToplevelState {
    fn new(tracker: WindowTracker) -> Self {
        Self {
            toplevels: HashMap::new(),
            active: None,
            tracker,
        }
    }

    fn publish(&self, id: &ObjectId) {
        if self.active.as_ref() == Some(id) {
            if let Some(toplevel) = self.toplevels.get(id) {
                self.tracker.set_active(toplevel.info());
            }
        }
    }

    fn forget_active(&mut self, id: &ObjectId) {
        if self.active.as_ref() == Some(id) {
            self.active = None;
            self.tracker.set_active(WindowInfo::new());
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for ToplevelState {
    fn event(
        _state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _globals: &GlobalListContents,
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, ()>
    for ToplevelState
{
    fn event(
        state: &mut Self,
        _manager: &zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        if let zwlr_foreign_toplevel_manager_v1::Event::Toplevel { toplevel } = event {
            state.toplevels.insert(toplevel.id(), Toplevel::default());
        }
    }

    event_created_child!(ToplevelState, zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, [
        0 => (zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1, ())
    ]);
}

impl Dispatch<zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1, ()> for ToplevelState {
    fn event(
        state: &mut Self,
        handle: &zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        use zwlr_foreign_toplevel_handle_v1::Event;

        let id = handle.id();
        match event {
            Event::Title { title } => {
                if let Some(toplevel) = state.toplevels.get_mut(&id) {
                    toplevel.title = Some(title);
                }
            }
            Event::AppId { app_id } => {
                if let Some(toplevel) = state.toplevels.get_mut(&id) {
                    toplevel.app_id = Some(app_id);
                }
            }
            Event::State { state: flags } => {
                if is_activated(&flags) {
                    state.active = Some(id);
                } else {
                    state.forget_active(&id);
                }
            }
            // Title, app_id and state changes arrive as one batch closed by done
            Event::Done => state.publish(&id),
            Event::Closed => {
                state.toplevels.remove(&id);
                state.forget_active(&id);
                handle.destroy();
            }
            _ => {}
        }
    }
}

/// Focus source for wlroots compositors (Sway, Hyprland, river, ...)
pub struct WaylandFocus {
    tracker: WindowTracker,
    connected: Arc<AtomicBool>,
}

impl WaylandFocus {
    pub fn new(tracker: WindowTracker) -> Self {
        Self {
            tracker,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn parse_display_suffix(name: &str) -> Option<u32> {
        let suffix = name.strip_prefix("wayland-")?;
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        suffix.parse::<u32>().ok()
    }

    /// `wayland-N` sockets under the runtime directory, highest N first
    fn discover_sockets() -> Vec<PathBuf> {
        let runtime_dir = match std::env::var("XDG_RUNTIME_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => return Vec::new(),
        };

        let mut sockets: Vec<(u32, PathBuf)> = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&runtime_dir) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if let Some(order) = name.to_str().and_then(Self::parse_display_suffix) {
                    sockets.push((order, entry.path()));
                }
            }
        }

        sockets.sort_by(|a, b| b.0.cmp(&a.0));
        sockets.into_iter().map(|(_, path)| path).collect()
    }

    /// `WAYLAND_DISPLAY` first, then whatever sockets the runtime directory holds
    fn open_connection() -> Result<Connection, WindowError> {
        if let Ok(connection) = Connection::connect_to_env() {
            return Ok(connection);
        }
        for path in Self::discover_sockets() {
            if let Ok(stream) = UnixStream::connect(&path) {
                if let Ok(connection) = Connection::from_socket(stream) {
                    log::debug!("Connected to Wayland socket {}", path.display());
                    return Ok(connection);
                }
            }
        }
        Err(WindowError::ConnectionFailed(
            "no Wayland display found".to_string(),
        ))
    }
}

impl FocusSource for WaylandFocus {
    fn name(&self) -> &'static str {
        "Wayland"
    }

    /// Binds the toplevel manager and spawns the dispatch thread
    fn connect(&mut self) -> Result<(), WindowError> {
        let connection = Self::open_connection()?;
        let (globals, mut event_queue) = registry_queue_init::<ToplevelState>(&connection)
            .map_err(|e| WindowError::ConnectionFailed(e.to_string()))?;
        let qhandle = event_queue.handle();

        globals
            .bind::<zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, _, _>(
                &qhandle,
                3..=3,
                (),
            )
            .map_err(|_| WindowError::Unsupported("wlr-foreign-toplevel-management"))?;

        let mut state = ToplevelState::new(self.tracker.clone());
        let connected = self.connected.clone();
        connected.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("composekey-wayland".to_string())
            .spawn(move || {
                // Keeps the connection alive for as long as the thread runs
                let _connection = connection;
                if let Err(e) = event_queue.roundtrip(&mut state) {
                    log::warn!("Wayland roundtrip failed: {}", e);
                }
                while event_queue.blocking_dispatch(&mut state).is_ok() {}
                log::warn!("Lost connection to the Wayland compositor");
                connected.store(false, Ordering::SeqCst);
            })
            .map_err(|e| WindowError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowClassifier;

    #[test]
    fn test_toplevel_info() {
        let toplevel = Toplevel {
            app_id: Some("org.remmina.Remmina".to_string()),
            title: Some(String::new()),
        };
        let info = toplevel.info();
        assert_eq!(info.wm_class.as_deref(), Some("org.remmina.Remmina"));
        assert_eq!(info.wm_name, None);
        assert_eq!(Toplevel::default().info(), WindowInfo::new());
    }

    #[test]
    fn test_activated_flag() {
        let flags: Vec<u8> = [0u32, 2].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert!(is_activated(&flags));
        let flags: Vec<u8> = [1u32, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert!(!is_activated(&flags));
        assert!(!is_activated(&[]));
    }

    #[test]
    fn test_wayland_focus_new() {
        let focus = WaylandFocus::new(WindowTracker::new(WindowClassifier::default()));
        assert!(!focus.is_connected());
        assert_eq!(focus.name(), "Wayland");
    }

    #[test]
    fn test_parse_display_suffix() {
        assert_eq!(WaylandFocus::parse_display_suffix("wayland-0"), Some(0));
        assert_eq!(WaylandFocus::parse_display_suffix("wayland-12"), Some(12));
        assert_eq!(WaylandFocus::parse_display_suffix("wayland-1.lock"), None);
        assert_eq!(WaylandFocus::parse_display_suffix("wayland-"), None);
        assert_eq!(WaylandFocus::parse_display_suffix("not-wayland-1"), None);
    }

    #[test]
    fn test_discover_sockets() {
        let tmp = std::env::temp_dir().join(format!(
            "composekey-wayland-sockets-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        for name in ["wayland-1", "wayland-0", "wayland-1.lock", "wayland-abc", "pulse"] {
            std::fs::write(tmp.join(name), b"").unwrap();
        }

        let prev = std::env::var("XDG_RUNTIME_DIR").ok();
        std::env::set_var("XDG_RUNTIME_DIR", &tmp);
        let sockets = WaylandFocus::discover_sockets();
        match prev {
            Some(v) => std::env::set_var("XDG_RUNTIME_DIR", v),
            None => std::env::remove_var("XDG_RUNTIME_DIR"),
        }

        assert_eq!(sockets, vec![tmp.join("wayland-1"), tmp.join("wayland-0")]);
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
