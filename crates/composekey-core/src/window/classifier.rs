// Window Classification
//
// Maps window class names to output quirks using regular expressions.

use regex::Regex;

use super::provider::{WindowClass, WindowInfo};

/// Regular expressions matched against the window class, per quirk.
///
/// Deserialized from the `[windows]` settings section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct WindowPatterns {
    pub other_desktop: Vec<String>,
    pub gtk: Vec<String>,
    pub office: Vec<String>,
    pub npp_or_libreoffice: Vec<String>,
}

impl Default for WindowPatterns {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }
        Self {
            other_desktop: owned(&[
                r"(?i)^(org\.)?remmina",
                r"(?i)^(xfreerdp|wlfreerdp|vncviewer|tigervnc)",
                r"(?i)^xephyr",
                r"(?i)^virt-viewer",
            ]),
            gtk: owned(&[r"(?i)^(gimp|inkscape)", r"^gdkWindow"]),
            office: owned(&[r"(?i)^(libreoffice|soffice)", r"(?i)^onlyoffice"]),
            npp_or_libreoffice: owned(&[r"(?i)^(libreoffice|soffice)", r"(?i)^notepad\+\+"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowClassifier {
    other_desktop: Vec<Regex>,
    gtk: Vec<Regex>,
    office: Vec<Regex>,
    npp_or_libreoffice: Vec<Regex>,
}

impl Default for WindowClassifier {
    fn default() -> Self {
        Self::new(&WindowPatterns::default()).unwrap_or_else(|_| Self::empty())
    }
}

impl WindowClassifier {
    pub fn new(patterns: &WindowPatterns) -> Result<Self, regex::Error> {
        fn compile(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        }
        Ok(Self {
            other_desktop: compile(&patterns.other_desktop)?,
            gtk: compile(&patterns.gtk)?,
            office: compile(&patterns.office)?,
            npp_or_libreoffice: compile(&patterns.npp_or_libreoffice)?,
        })
    }

    /// Classifier with no patterns; every window gets the default class
    pub fn empty() -> Self {
        Self {
            other_desktop: Vec::new(),
            gtk: Vec::new(),
            office: Vec::new(),
            npp_or_libreoffice: Vec::new(),
        }
    }

    pub fn classify(&self, window: &WindowInfo) -> WindowClass {
        let Some(class) = window.wm_class.as_deref() else {
            return WindowClass::default();
        };
        let any = |set: &[Regex]| set.iter().any(|re| re.is_match(class));
        WindowClass {
            other_desktop: any(&self.other_desktop),
            gtk: any(&self.gtk),
            office: any(&self.office),
            npp_or_libreoffice: any(&self.npp_or_libreoffice),
        }
    }
}
