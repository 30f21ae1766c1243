// Composekey Event Loop
// Grabs keyboards and polls them for key events

use evdev::{Device, EventType, InputEvent};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use crate::input::{
    is_keyboard, is_virtual_device, DeviceCapabilities, DeviceFilter, VIRTUAL_DEVICE_PREFIX,
};
use crate::normalize::RawKeyEvent;
use crate::{Action, KeyCode};

/// MSC_SCAN, the scan code reported before a key event
const MSC_SCAN: u16 = 0x04;

pub type EventLoopResult<T> = Result<T, EventLoopError>;

#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A keyboard, for `--list-devices`
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: PathBuf,
    pub has_leds: bool,
}

/// Key event annotated with its source device
#[derive(Debug, Clone)]
pub struct PolledEvent {
    pub event: RawKeyEvent,
    pub device_name: String,
}

struct GrabbedDevice {
    device: Device,
    path: PathBuf,
    name: String,
    /// Scan code of the key event that follows
    pending_scan: Option<u32>,
}

/// Grabbed keyboards; ungrabbed on drop so the keyboard never stays dead
pub struct EventLoop {
    devices: Vec<GrabbedDevice>,
    poll_fds: Vec<libc::pollfd>,
    grabbed: bool,
}

impl EventLoop {
    /// Open the keyboards selected by `filter` without grabbing them
    pub fn open(filter: &DeviceFilter) -> EventLoopResult<Self> {
        let devices = Self::find_keyboards(filter)?;
        let poll_fds = devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        Ok(Self {
            devices,
            poll_fds,
            grabbed: false,
        })
    }

    /// Open and grab the keyboards selected by `filter`
    pub fn new_with_grab(filter: &DeviceFilter) -> EventLoopResult<Self> {
        let mut event_loop = Self::open(filter)?;

        // A crashed previous instance may have left a grab behind
        for d in &mut event_loop.devices {
            let _ = d.device.ungrab();
        }
        for d in &mut event_loop.devices {
            d.device.grab()?;
            log::info!("Grabbed {} ({})", d.name, d.path.display());
        }
        event_loop.grabbed = true;
        Ok(event_loop)
    }

    pub fn ungrab_all(&mut self) {
        if self.grabbed {
            for d in &mut self.devices {
                let _ = d.device.ungrab();
            }
            self.grabbed = false;
        }
    }

    fn capabilities(device: &Device) -> DeviceCapabilities {
        let keys = device
            .supported_keys()
            .map(|keys| keys.iter().map(|k| k.code()).collect::<Vec<u16>>())
            .unwrap_or_default();
        let leds = device
            .supported_leds()
            .map(|leds| leds.iter().map(|l| l.0).collect::<Vec<u16>>())
            .unwrap_or_default();
        DeviceCapabilities::new(device.supported_events().contains(EventType::KEY), keys)
            .with_leds(leds)
    }

    /// Every physical keyboard on the system
    pub fn list_devices() -> EventLoopResult<Vec<DeviceInfo>> {
        let infos: Vec<DeviceInfo> = evdev::enumerate()
            .filter_map(|(path, device)| {
                let name = device.name().unwrap_or("Unknown").to_string();
                let caps = Self::capabilities(&device);
                (is_keyboard(&caps) && !is_virtual_device(&name, VIRTUAL_DEVICE_PREFIX))
                    .then(|| (path, name, caps.supports_lock_leds()))
            })
            .enumerate()
            .map(|(index, (path, name, has_leds))| DeviceInfo {
                index,
                name,
                path,
                has_leds,
            })
            .collect();

        if infos.is_empty() {
            return Err(EventLoopError::DeviceNotFound(
                "No keyboard devices found".to_string(),
            ));
        }
        Ok(infos)
    }

    fn find_keyboards(filter: &DeviceFilter) -> EventLoopResult<Vec<GrabbedDevice>> {
        let mut keyboards = Vec::new();

        for (path, device) in evdev::enumerate() {
            let name = device.name().unwrap_or("Unknown").to_string();
            let caps = Self::capabilities(&device);
            let is_virtual = is_virtual_device(&name, VIRTUAL_DEVICE_PREFIX);
            let path_str = path.to_str().unwrap_or_default();

            if filter.matches(&name, path_str, is_keyboard(&caps), is_virtual) {
                keyboards.push(GrabbedDevice {
                    device,
                    path,
                    name,
                    pending_scan: None,
                });
            }
        }

        if keyboards.is_empty() {
            let wanted = if filter.is_autodetect() {
                "No keyboard devices found".to_string()
            } else {
                format!("No device matches {:?}", filter.names())
            };
            return Err(EventLoopError::DeviceNotFound(wanted));
        }
        Ok(keyboards)
    }

    fn to_raw(d: &mut GrabbedDevice, event: &InputEvent) -> Option<RawKeyEvent> {
        match event.event_type() {
            EventType::MISC if event.code() == MSC_SCAN => {
                d.pending_scan = u32::try_from(event.value()).ok();
                None
            }
            EventType::KEY => {
                let action = Action::from_value(event.value())?;
                let mut raw = RawKeyEvent::new(KeyCode(event.code()), action);
                if let Some(scan) = d.pending_scan.take() {
                    raw = raw.with_scan(scan);
                }
                Some(raw)
            }
            _ => None,
        }
    }

    /// Wait up to `timeout_ms` (-1 blocks) for key events from any device.
    /// A signal interrupting the wait yields no events.
    pub fn poll_for_events(&mut self, timeout_ms: i32) -> EventLoopResult<Vec<PolledEvent>> {
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(EventLoopError::Io(err));
        }
        if poll_result == 0 {
            return Ok(events);
        }

        for (i, d) in self.devices.iter_mut().enumerate() {
            if self.poll_fds[i].revents & libc::POLLIN == 0 {
                continue;
            }
            let fetched: Vec<InputEvent> = match d.device.fetch_events() {
                Ok(iter) => iter.collect(),
                Err(e) => {
                    log::warn!("Failed to read from {}: {}", d.name, e);
                    continue;
                }
            };
            for event in &fetched {
                if let Some(raw) = Self::to_raw(d, event) {
                    events.push(PolledEvent {
                        event: raw,
                        device_name: d.name.clone(),
                    });
                }
            }
        }

        Ok(events)
    }

    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    /// Paths of the grabbed devices, for opening their LEDs
    pub fn device_paths(&self) -> Vec<PathBuf> {
        self.devices.iter().map(|d| d.path.clone()).collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.ungrab_all();
    }
}
