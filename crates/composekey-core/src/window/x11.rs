// X11 Focus Tracking
//
// Watches _NET_ACTIVE_WINDOW on the root window and reports the WM_CLASS
// and title of each newly focused window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ConnectionExt as _, EventMask, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::focus::{FocusSource, WindowError};
use super::provider::{WindowInfo, WindowTracker};

/// Longest property read, in 32-bit units
const PROPERTY_LENGTH: u32 = 1024;

struct Atoms {
    net_active_window: Atom,
    net_wm_name: Atom,
    utf8_string: Atom,
}

impl Atoms {
    fn intern(conn: &RustConnection) -> Result<Self, WindowError> {
        let intern = |name: &[u8]| -> Result<Atom, WindowError> {
            Ok(conn
                .intern_atom(false, name)
                .map_err(failed)?
                .reply()
                .map_err(failed)?
                .atom)
        };
        Ok(Self {
            net_active_window: intern(b"_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern(b"_NET_WM_NAME")?,
            utf8_string: intern(b"UTF8_STRING")?,
        })
    }
}

fn failed<E: std::fmt::Display>(e: E) -> WindowError {
    WindowError::ConnectionFailed(e.to_string())
}

/// The class half of WM_CLASS (`instance\0class\0`), else the instance
fn parse_wm_class(value: &[u8]) -> Option<String> {
    let mut parts = value
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned());
    let instance = parts.next();
    parts.next().or(instance)
}

fn text_property(value: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(value).trim_end_matches('\0').to_string();
    (!text.is_empty()).then_some(text)
}

/// Focus source for X11 window managers that publish _NET_ACTIVE_WINDOW
pub struct X11Focus {
    tracker: WindowTracker,
    connected: Arc<AtomicBool>,
}

impl X11Focus {
    pub fn new(tracker: WindowTracker) -> Self {
        Self {
            tracker,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn active_window(
        conn: &RustConnection,
        root: Window,
        atoms: &Atoms,
    ) -> Result<Option<Window>, WindowError> {
        let reply = conn
            .get_property(false, root, atoms.net_active_window, AtomEnum::WINDOW, 0, 1)
            .map_err(failed)?
            .reply()
            .map_err(failed)?;
        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|window| *window != x11rb::NONE))
    }

    fn window_info(
        conn: &RustConnection,
        window: Window,
        atoms: &Atoms,
    ) -> Result<WindowInfo, WindowError> {
        let property = |property: Atom, type_: Atom| -> Result<Vec<u8>, WindowError> {
            Ok(conn
                .get_property(false, window, property, type_, 0, PROPERTY_LENGTH)
                .map_err(failed)?
                .reply()
                .map_err(failed)?
                .value)
        };

        let wm_class = parse_wm_class(&property(AtomEnum::WM_CLASS.into(), AtomEnum::STRING.into())?);
        let wm_name = match text_property(&property(atoms.net_wm_name, atoms.utf8_string)?) {
            Some(name) => Some(name),
            None => text_property(&property(AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())?),
        };
        Ok(WindowInfo::with_details(wm_class, wm_name))
    }

    fn report(conn: &RustConnection, root: Window, atoms: &Atoms, tracker: &WindowTracker) {
        let info = match Self::active_window(conn, root, atoms) {
            Ok(Some(window)) => Self::window_info(conn, window, atoms),
            Ok(None) => Ok(WindowInfo::new()),
            Err(e) => Err(e),
        };
        match info {
            Ok(info) => tracker.set_active(info),
            // The window may close between the two requests
            Err(e) => log::debug!("Cannot read the focused window: {}", e),
        }
    }
}

impl FocusSource for X11Focus {
    fn name(&self) -> &'static str {
        "X11"
    }

    fn connect(&mut self) -> Result<(), WindowError> {
        let (conn, screen) = x11rb::connect(None).map_err(failed)?;
        let root = conn.setup().roots[screen].root;
        let atoms = Atoms::intern(&conn)?;

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )
        .map_err(failed)?
        .check()
        .map_err(failed)?;
        if Self::active_window(&conn, root, &atoms)?.is_none() {
            log::debug!("No _NET_ACTIVE_WINDOW yet; the window manager may set it later");
        }

        let tracker = self.tracker.clone();
        let connected = self.connected.clone();
        connected.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("composekey-x11".to_string())
            .spawn(move || {
                Self::report(&conn, root, &atoms, &tracker);
                loop {
                    match conn.wait_for_event() {
                        Ok(Event::PropertyNotify(event))
                            if event.atom == atoms.net_active_window =>
                        {
                            Self::report(&conn, root, &atoms, &tracker);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log::warn!("Lost connection to the X server: {}", e);
                            break;
                        }
                    }
                }
                connected.store(false, Ordering::SeqCst);
            })
            .map_err(failed)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
