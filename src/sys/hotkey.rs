use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CONTROL = 0b0010;
        const ALT = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    fn from_token(token: &str) -> Option<Modifiers> {
        match token.to_lowercase().as_str() {
            "alt" | "option" => Some(Modifiers::ALT),
            "ctrl" | "control" => Some(Modifiers::CONTROL),
            "shift" => Some(Modifiers::SHIFT),
            "super" | "meta" | "win" | "logo" => Some(Modifiers::SUPER),
            _ => None,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.contains(Modifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::SUPER) {
            parts.push("Super");
        }
        write!(f, "{}", parts.join(" + "))
    }
}

impl FromStr for Modifiers {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mods = Modifiers::empty();
        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            let Some(m) = Modifiers::from_token(part) else {
                anyhow::bail!("Unrecognized modifier: {part}");
            };
            mods.insert(m);
        }
        if mods.is_empty() {
            anyhow::bail!("No modifier specified: {s}");
        }
        Ok(mods)
    }
}

impl Serialize for Modifiers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Modifiers {
    fn deserialize<D>(deserializer: D) -> Result<Modifiers, D::Error>
    where D: serde::Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Modifiers::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Semicolon,
    Quote,
    Backquote,
    Backslash,
    BracketLeft,
    BracketRight,
    Enter,
    Tab,
    Space,
    Backspace,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    SuperLeft,
    SuperRight,
}

impl KeyCode {
    const LETTERS: [KeyCode; 26] = [
        KeyCode::KeyA,
        KeyCode::KeyB,
        KeyCode::KeyC,
        KeyCode::KeyD,
        KeyCode::KeyE,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyI,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::KeyM,
        KeyCode::KeyN,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::KeyQ,
        KeyCode::KeyR,
        KeyCode::KeyS,
        KeyCode::KeyT,
        KeyCode::KeyU,
        KeyCode::KeyV,
        KeyCode::KeyW,
        KeyCode::KeyX,
        KeyCode::KeyY,
        KeyCode::KeyZ,
    ];
    const DIGITS: [KeyCode; 10] = [
        KeyCode::Digit0,
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    const FUNCTION: [KeyCode; 12] = [
        KeyCode::F1,
        KeyCode::F2,
        KeyCode::F3,
        KeyCode::F4,
        KeyCode::F5,
        KeyCode::F6,
        KeyCode::F7,
        KeyCode::F8,
        KeyCode::F9,
        KeyCode::F10,
        KeyCode::F11,
        KeyCode::F12,
    ];

    fn from_token(token: &str) -> Option<KeyCode> {
        let upper = token.to_uppercase();
        let mut chars = upper.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_uppercase() {
                return Some(Self::LETTERS[(c as u8 - b'A') as usize]);
            }
            if c.is_ascii_digit() {
                return Some(Self::DIGITS[(c as u8 - b'0') as usize]);
            }
        }
        if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<usize>().ok())
            && (1..=12).contains(&n)
        {
            return Some(Self::FUNCTION[n - 1]);
        }
        let code = match upper.as_str() {
            "LEFT" | "ARROWLEFT" => KeyCode::ArrowLeft,
            "RIGHT" | "ARROWRIGHT" => KeyCode::ArrowRight,
            "UP" | "ARROWUP" => KeyCode::ArrowUp,
            "DOWN" | "ARROWDOWN" => KeyCode::ArrowDown,
            "TAB" => KeyCode::Tab,
            "SPACE" => KeyCode::Space,
            "ENTER" | "RETURN" => KeyCode::Enter,
            "ESC" | "ESCAPE" => KeyCode::Escape,
            "BACKSPACE" => KeyCode::Backspace,
            "-" | "MINUS" | "HYPHEN" => KeyCode::Minus,
            "=" | "EQUAL" | "EQUALS" => KeyCode::Equal,
            "," | "COMMA" => KeyCode::Comma,
            "." | "DOT" | "PERIOD" => KeyCode::Period,
            "/" | "SLASH" => KeyCode::Slash,
            ";" | "SEMICOLON" => KeyCode::Semicolon,
            "'" | "QUOTE" | "APOSTROPHE" => KeyCode::Quote,
            "`" | "BACKQUOTE" | "GRAVE" => KeyCode::Backquote,
            "\\" | "BACKSLASH" => KeyCode::Backslash,
            "[" | "BRACKETLEFT" => KeyCode::BracketLeft,
            "]" | "BRACKETRIGHT" => KeyCode::BracketRight,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KeyCode::*;
        if let Some(i) = Self::LETTERS.iter().position(|k| k == self) {
            return write!(f, "{}", (b'A' + i as u8) as char);
        }
        if let Some(i) = Self::DIGITS.iter().position(|k| k == self) {
            return write!(f, "{i}");
        }
        if let Some(i) = Self::FUNCTION.iter().position(|k| k == self) {
            return write!(f, "F{}", i + 1);
        }
        let s = match self {
            ArrowLeft => "Left",
            ArrowRight => "Right",
            ArrowUp => "Up",
            ArrowDown => "Down",
            Tab => "Tab",
            Space => "Space",
            Enter => "Enter",
            Escape => "Escape",
            Backspace => "Backspace",
            Minus => "-",
            Equal => "=",
            Comma => ",",
            Period => ".",
            Slash => "/",
            Semicolon => ";",
            Quote => "'",
            Backquote => "`",
            Backslash => "\\",
            BracketLeft => "[",
            BracketRight => "]",
            other => return write!(f, "{other:?}"),
        };
        write!(f, "{}", s)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { modifiers, key_code } }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
        let mut mods = Modifiers::empty();
        let mut key_opt: Option<KeyCode> = None;

        for part in parts {
            if let Some(m) = Modifiers::from_token(part) {
                mods.insert(m);
                continue;
            }
            let Some(code) = KeyCode::from_token(part) else {
                return Err(anyhow::anyhow!("Unrecognized key token: {}", part));
            };
            if key_opt.replace(code).is_some() {
                return Err(anyhow::anyhow!("More than one key in hotkey: {}", s));
            }
        }

        let key_code =
            key_opt.ok_or_else(|| anyhow::anyhow!("No key specified in hotkey: {}", s))?;
        Ok(Hotkey::new(mods, key_code))
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where D: serde::Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum HotkeyRepr {
            Str(String),
            Map {
                modifiers: Modifiers,
                key_code: KeyCode,
            },
        }

        let repr = HotkeyRepr::deserialize(deserializer)?;
        match repr {
            HotkeyRepr::Str(s) => Hotkey::from_str(&s).map_err(serde::de::Error::custom),
            HotkeyRepr::Map { modifiers, key_code } => Ok(Hotkey::new(modifiers, key_code)),
        }
    }
}

/// Handle returned by [`HotkeyRegistrar::register`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Registration(pub u64);

pub type HotkeyCallback = Box<dyn FnMut() + Send>;

/// Global hotkey registration provided by the desktop.
pub trait HotkeyRegistrar {
    fn register(&mut self, hotkey: &Hotkey, callback: HotkeyCallback)
    -> anyhow::Result<Registration>;

    /// Unknown registrations are ignored.
    fn unregister(&mut self, registration: Registration);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_modifiers_and_key() {
        let hotkey: Hotkey = "Ctrl + Alt + 3".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::CONTROL | Modifiers::ALT, KeyCode::Digit3));

        let hotkey: Hotkey = "super+shift+Left".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::SUPER | Modifiers::SHIFT, KeyCode::ArrowLeft));

        let hotkey: Hotkey = "F11".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::empty(), KeyCode::F11));
    }

    #[test]
    fn rejects_bad_hotkeys() {
        assert!("Ctrl + Alt".parse::<Hotkey>().is_err());
        assert!("Ctrl + Banana".parse::<Hotkey>().is_err());
        assert!("A + B".parse::<Hotkey>().is_err());
        assert!("F13".parse::<Hotkey>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for s in ["Ctrl + Alt + Z", "Shift + Super + Tab", "Escape", "Alt + ]"] {
            let hotkey: Hotkey = s.parse().unwrap();
            assert_eq!(hotkey.to_string().parse::<Hotkey>().unwrap(), hotkey);
        }
        assert_eq!(Hotkey::new(Modifiers::ALT, KeyCode::KeyQ).to_string(), "Alt + Q");
    }

    #[test]
    fn modifiers_parse_alone() {
        assert_eq!("Alt + Shift".parse::<Modifiers>().unwrap(), Modifiers::ALT | Modifiers::SHIFT);
        assert!("".parse::<Modifiers>().is_err());
        assert!("Alt + X".parse::<Modifiers>().is_err());
    }
}
