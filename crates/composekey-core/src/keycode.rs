// Composekey Key Codes
// Physical key identities from Linux input-event-codes.h

use std::fmt;
use std::str::FromStr;

/// A physical keyboard key code.
///
/// The numeric values match Linux `input-event-codes.h` definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const RESERVED: KeyCode = KeyCode(0);
    pub const ESC: KeyCode = KeyCode(1);
    pub const KEY_1: KeyCode = KeyCode(2);
    pub const KEY_2: KeyCode = KeyCode(3);
    pub const KEY_3: KeyCode = KeyCode(4);
    pub const KEY_4: KeyCode = KeyCode(5);
    pub const KEY_5: KeyCode = KeyCode(6);
    pub const KEY_6: KeyCode = KeyCode(7);
    pub const KEY_7: KeyCode = KeyCode(8);
    pub const KEY_8: KeyCode = KeyCode(9);
    pub const KEY_9: KeyCode = KeyCode(10);
    pub const KEY_0: KeyCode = KeyCode(11);
    pub const MINUS: KeyCode = KeyCode(12);
    pub const EQUAL: KeyCode = KeyCode(13);
    pub const BACKSPACE: KeyCode = KeyCode(14);
    pub const TAB: KeyCode = KeyCode(15);
    pub const Q: KeyCode = KeyCode(16);
    pub const W: KeyCode = KeyCode(17);
    pub const E: KeyCode = KeyCode(18);
    pub const R: KeyCode = KeyCode(19);
    pub const T: KeyCode = KeyCode(20);
    pub const Y: KeyCode = KeyCode(21);
    pub const U: KeyCode = KeyCode(22);
    pub const I: KeyCode = KeyCode(23);
    pub const O: KeyCode = KeyCode(24);
    pub const P: KeyCode = KeyCode(25);
    pub const LEFT_BRACE: KeyCode = KeyCode(26);
    pub const RIGHT_BRACE: KeyCode = KeyCode(27);
    pub const ENTER: KeyCode = KeyCode(28);
    pub const LEFT_CTRL: KeyCode = KeyCode(29);
    pub const A: KeyCode = KeyCode(30);
    pub const S: KeyCode = KeyCode(31);
    pub const D: KeyCode = KeyCode(32);
    pub const F: KeyCode = KeyCode(33);
    pub const G: KeyCode = KeyCode(34);
    pub const H: KeyCode = KeyCode(35);
    pub const J: KeyCode = KeyCode(36);
    pub const K: KeyCode = KeyCode(37);
    pub const L: KeyCode = KeyCode(38);
    pub const SEMICOLON: KeyCode = KeyCode(39);
    pub const APOSTROPHE: KeyCode = KeyCode(40);
    pub const GRAVE: KeyCode = KeyCode(41);
    pub const LEFT_SHIFT: KeyCode = KeyCode(42);
    pub const BACKSLASH: KeyCode = KeyCode(43);
    pub const Z: KeyCode = KeyCode(44);
    pub const X: KeyCode = KeyCode(45);
    pub const C: KeyCode = KeyCode(46);
    pub const V: KeyCode = KeyCode(47);
    pub const B: KeyCode = KeyCode(48);
    pub const N: KeyCode = KeyCode(49);
    pub const M: KeyCode = KeyCode(50);
    pub const COMMA: KeyCode = KeyCode(51);
    pub const DOT: KeyCode = KeyCode(52);
    pub const SLASH: KeyCode = KeyCode(53);
    pub const RIGHT_SHIFT: KeyCode = KeyCode(54);
    pub const KPASTERISK: KeyCode = KeyCode(55);
    pub const LEFT_ALT: KeyCode = KeyCode(56);
    pub const SPACE: KeyCode = KeyCode(57);
    pub const CAPSLOCK: KeyCode = KeyCode(58);
    pub const NUMLOCK: KeyCode = KeyCode(69);
    pub const SCROLLLOCK: KeyCode = KeyCode(70);
    pub const KEY_102ND: KeyCode = KeyCode(86);
    pub const KPENTER: KeyCode = KeyCode(96);
    pub const RIGHT_CTRL: KeyCode = KeyCode(97);
    pub const RIGHT_ALT: KeyCode = KeyCode(100);
    pub const HOME: KeyCode = KeyCode(102);
    pub const UP: KeyCode = KeyCode(103);
    pub const PAGE_UP: KeyCode = KeyCode(104);
    pub const LEFT: KeyCode = KeyCode(105);
    pub const RIGHT: KeyCode = KeyCode(106);
    pub const END: KeyCode = KeyCode(107);
    pub const DOWN: KeyCode = KeyCode(108);
    pub const PAGE_DOWN: KeyCode = KeyCode(109);
    pub const INSERT: KeyCode = KeyCode(110);
    pub const DELETE: KeyCode = KeyCode(111);
    pub const PAUSE: KeyCode = KeyCode(119);
    pub const LEFT_META: KeyCode = KeyCode(125);
    pub const RIGHT_META: KeyCode = KeyCode(126);
    pub const COMPOSE: KeyCode = KeyCode(127);
    pub const MENU: KeyCode = KeyCode(139);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Canonical name, or `"UNKNOWN"` for codes outside the table
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Look up a key by name, case-insensitively.
    ///
    /// Accepts canonical names (`RIGHT_ALT`), a handful of aliases
    /// (`AltGr`, `Escape`, `Caps`), bare digits and `KEY_`-prefixed names.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        let canonical = match upper.as_str() {
            "ALTGR" | "RALT" | "ISO_LEVEL3_SHIFT" => "RIGHT_ALT",
            "LALT" | "ALT" => "LEFT_ALT",
            "LCTRL" | "CTRL" => "LEFT_CTRL",
            "RCTRL" => "RIGHT_CTRL",
            "LSHIFT" | "SHIFT" => "LEFT_SHIFT",
            "RSHIFT" => "RIGHT_SHIFT",
            "LWIN" | "LSUPER" | "SUPER" => "LEFT_META",
            "RWIN" | "RSUPER" => "RIGHT_META",
            "ESCAPE" => "ESC",
            "CAPS" | "CAPS_LOCK" => "CAPSLOCK",
            "NUM_LOCK" => "NUMLOCK",
            "SCROLL_LOCK" => "SCROLLLOCK",
            "RETURN" => "ENTER",
            "MULTI_KEY" => "COMPOSE",
            "PAUSE_BREAK" => "PAUSE",
            other => other,
        };

        let find = |wanted: &str| {
            KEY_NAMES
                .iter()
                .find(|(_, n)| *n == wanted)
                .map(|(code, _)| KeyCode(*code))
        };

        if let Some(code) = find(canonical) {
            return Some(code);
        }
        if canonical.len() == 1 && canonical.chars().all(|c| c.is_ascii_digit()) {
            return find(&format!("KEY_{canonical}"));
        }
        canonical.strip_prefix("KEY_").and_then(find)
    }

    /// Caps Lock, Num Lock or Scroll Lock
    pub fn is_lock(self) -> bool {
        matches!(self, KeyCode::CAPSLOCK | KeyCode::NUMLOCK | KeyCode::SCROLLLOCK)
    }

    /// Key that types a hexadecimal digit on a US row, used for code point entry
    pub fn for_hex_digit(digit: char) -> Option<Self> {
        let code = match digit.to_ascii_lowercase() {
            '0' => KeyCode::KEY_0,
            '1' => KeyCode::KEY_1,
            '2' => KeyCode::KEY_2,
            '3' => KeyCode::KEY_3,
            '4' => KeyCode::KEY_4,
            '5' => KeyCode::KEY_5,
            '6' => KeyCode::KEY_6,
            '7' => KeyCode::KEY_7,
            '8' => KeyCode::KEY_8,
            '9' => KeyCode::KEY_9,
            'a' => KeyCode::A,
            'b' => KeyCode::B,
            'c' => KeyCode::C,
            'd' => KeyCode::D,
            'e' => KeyCode::E,
            'f' => KeyCode::F,
            _ => return None,
        };
        Some(code)
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        KeyCode(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "UNKNOWN" => write!(f, "KEY({})", self.0),
            name => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0}")]
pub struct UnknownKeyName(pub String);

impl FromStr for KeyCode {
    type Err = UnknownKeyName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyCode::from_name(s).ok_or_else(|| UnknownKeyName(s.to_string()))
    }
}

const KEY_NAMES: &[(u16, &str)] = &[
    (0, "RESERVED"),
    (1, "ESC"),
    (2, "KEY_1"),
    (3, "KEY_2"),
    (4, "KEY_3"),
    (5, "KEY_4"),
    (6, "KEY_5"),
    (7, "KEY_6"),
    (8, "KEY_7"),
    (9, "KEY_8"),
    (10, "KEY_9"),
    (11, "KEY_0"),
    (12, "MINUS"),
    (13, "EQUAL"),
    (14, "BACKSPACE"),
    (15, "TAB"),
    (16, "Q"),
    (17, "W"),
    (18, "E"),
    (19, "R"),
    (20, "T"),
    (21, "Y"),
    (22, "U"),
    (23, "I"),
    (24, "O"),
    (25, "P"),
    (26, "LEFT_BRACE"),
    (27, "RIGHT_BRACE"),
    (28, "ENTER"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (31, "S"),
    (32, "D"),
    (33, "F"),
    (34, "G"),
    (35, "H"),
    (36, "J"),
    (37, "K"),
    (38, "L"),
    (39, "SEMICOLON"),
    (40, "APOSTROPHE"),
    (41, "GRAVE"),
    (42, "LEFT_SHIFT"),
    (43, "BACKSLASH"),
    (44, "Z"),
    (45, "X"),
    (46, "C"),
    (47, "V"),
    (48, "B"),
    (49, "N"),
    (50, "M"),
    (51, "COMMA"),
    (52, "DOT"),
    (53, "SLASH"),
    (54, "RIGHT_SHIFT"),
    (55, "KPASTERISK"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPSLOCK"),
    (59, "F1"),
    (60, "F2"),
    (61, "F3"),
    (62, "F4"),
    (63, "F5"),
    (64, "F6"),
    (65, "F7"),
    (66, "F8"),
    (67, "F9"),
    (68, "F10"),
    (69, "NUMLOCK"),
    (70, "SCROLLLOCK"),
    (71, "KP7"),
    (72, "KP8"),
    (73, "KP9"),
    (74, "KPMINUS"),
    (75, "KP4"),
    (76, "KP5"),
    (77, "KP6"),
    (78, "KPPLUS"),
    (79, "KP1"),
    (80, "KP2"),
    (81, "KP3"),
    (82, "KP0"),
    (83, "KPDOT"),
    (86, "KEY_102ND"),
    (87, "F11"),
    (88, "F12"),
    (96, "KPENTER"),
    (97, "RIGHT_CTRL"),
    (98, "KPSLASH"),
    (99, "SYSRQ"),
    (100, "RIGHT_ALT"),
    (102, "HOME"),
    (103, "UP"),
    (104, "PAGE_UP"),
    (105, "LEFT"),
    (106, "RIGHT"),
    (107, "END"),
    (108, "DOWN"),
    (109, "PAGE_DOWN"),
    (110, "INSERT"),
    (111, "DELETE"),
    (119, "PAUSE"),
    (125, "LEFT_META"),
    (126, "RIGHT_META"),
    (127, "COMPOSE"),
    (139, "MENU"),
    (183, "F13"),
    (184, "F14"),
    (185, "F15"),
    (186, "F16"),
    (187, "F17"),
    (188, "F18"),
    (189, "F19"),
    (190, "F20"),
];
