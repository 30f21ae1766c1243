// Composekey Clipboard Access
// Save, replace and restore the clipboard around a paste

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::settings::ClipboardBackend;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable")]
    Unavailable,

    #[error("Clipboard error: {0}")]
    Backend(String),
}

/// RGBA image held on the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

/// Everything a paste may clobber
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub text: Option<String>,
    pub image: Option<ClipboardImage>,
    pub audio: Option<Vec<u8>>,
    pub files: Vec<PathBuf>,
}

impl ClipboardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none() && self.audio.is_none() && self.files.is_empty()
    }
}

/// Clipboard collaborator
pub trait Clipboard: Send {
    fn snapshot(&mut self) -> Result<ClipboardSnapshot, ClipboardError>;

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;

    fn clear(&mut self) -> Result<(), ClipboardError>;

    /// Put back the non-empty parts of `snapshot`
    fn restore(&mut self, snapshot: ClipboardSnapshot) -> Result<(), ClipboardError>;
}

/// No clipboard; every operation fails so callers fall back
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn snapshot(&mut self) -> Result<ClipboardSnapshot, ClipboardError> {
        Err(ClipboardError::Unavailable)
    }

    fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }

    fn restore(&mut self, _snapshot: ClipboardSnapshot) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}

/// In-process clipboard. Clones share contents, and every `set_text` is
/// remembered so hosts and tests can see what was pasted.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    inner: Arc<Mutex<MemoryContents>>,
}

#[derive(Debug, Default)]
struct MemoryContents {
    current: ClipboardSnapshot,
    pasted: Vec<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: ClipboardSnapshot) -> Self {
        let clipboard = Self::new();
        clipboard.inner.lock().current = contents;
        clipboard
    }

    pub fn contents(&self) -> ClipboardSnapshot {
        self.inner.lock().current.clone()
    }

    /// Every text placed on the clipboard, oldest first
    pub fn pasted(&self) -> Vec<String> {
        self.inner.lock().pasted.clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn snapshot(&mut self) -> Result<ClipboardSnapshot, ClipboardError> {
        Ok(self.inner.lock().current.clone())
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut inner = self.inner.lock();
        inner.current = ClipboardSnapshot {
            text: Some(text.to_string()),
            ..ClipboardSnapshot::default()
        };
        inner.pasted.push(text.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.inner.lock().current = ClipboardSnapshot::default();
        Ok(())
    }

    fn restore(&mut self, snapshot: ClipboardSnapshot) -> Result<(), ClipboardError> {
        if !snapshot.is_empty() {
            self.inner.lock().current = snapshot;
        }
        Ok(())
    }
}

/// The desktop clipboard. Text and images survive a round trip; audio and
/// file lists are not exposed by the backend and are left untouched.
#[cfg(feature = "clipboard")]
pub struct SystemClipboard {
    clipboard: arboard::Clipboard,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Backend(e.to_string()))?;
        Ok(Self { clipboard })
    }
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn snapshot(&mut self) -> Result<ClipboardSnapshot, ClipboardError> {
        let text = self.clipboard.get_text().ok();
        let image = self.clipboard.get_image().ok().map(|image| ClipboardImage {
            width: image.width,
            height: image.height,
            bytes: image.bytes.into_owned(),
        });
        Ok(ClipboardSnapshot {
            text,
            image,
            ..ClipboardSnapshot::default()
        })
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Backend(e.to_string()))
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.clipboard
            .clear()
            .map_err(|e| ClipboardError::Backend(e.to_string()))
    }

    fn restore(&mut self, snapshot: ClipboardSnapshot) -> Result<(), ClipboardError> {
        if let Some(text) = snapshot.text {
            self.clipboard
                .set_text(text)
                .map_err(|e| ClipboardError::Backend(e.to_string()))?;
        }
        if let Some(image) = snapshot.image {
            self.clipboard
                .set_image(arboard::ImageData {
                    width: image.width,
                    height: image.height,
                    bytes: image.bytes.into(),
                })
                .map_err(|e| ClipboardError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

/// Open the configured clipboard, falling back to none if it is unavailable
pub fn open_clipboard(backend: ClipboardBackend) -> Box<dyn Clipboard> {
    match backend {
        ClipboardBackend::None => Box::new(NoClipboard),
        #[cfg(feature = "clipboard")]
        ClipboardBackend::System => match SystemClipboard::new() {
            Ok(clipboard) => Box::new(clipboard),
            Err(e) => {
                log::warn!("System clipboard unavailable: {}", e);
                Box::new(NoClipboard)
            }
        },
        #[cfg(not(feature = "clipboard"))]
        ClipboardBackend::System => {
            log::warn!("Built without clipboard support; clipboard output disabled");
            Box::new(NoClipboard)
        }
    }
}
