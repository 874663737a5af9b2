//! Key combination parsing.

use std::fmt;

/// Named keys and their Windows virtual-key codes.
const NAMED_KEYS: &[(&str, &[&str], u32)] = &[
    ("Backspace", &["BACKSPACE", "BACK"], 0x08),
    ("Tab", &["TAB"], 0x09),
    ("Enter", &["ENTER", "RETURN"], 0x0D),
    ("Pause", &["PAUSE"], 0x13),
    ("Escape", &["ESCAPE", "ESC"], 0x1B),
    ("Space", &["SPACE"], 0x20),
    ("PageUp", &["PAGEUP", "PGUP"], 0x21),
    ("PageDown", &["PAGEDOWN", "PGDN"], 0x22),
    ("End", &["END"], 0x23),
    ("Home", &["HOME"], 0x24),
    ("Left", &["LEFT"], 0x25),
    ("Up", &["UP"], 0x26),
    ("Right", &["RIGHT"], 0x27),
    ("Down", &["DOWN"], 0x28),
    ("PrintScreen", &["PRINTSCREEN", "PRTSC", "PRINT"], 0x2C),
    ("Insert", &["INSERT", "INS"], 0x2D),
    ("Delete", &["DELETE", "DEL"], 0x2E),
];

/// Canonical name and virtual-key code for a key name.
fn lookup_key(name: &str) -> Option<(String, u32)> {
    let upper = name.trim().to_ascii_uppercase();

    if let [c] = upper.as_bytes()
        && (c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Some((upper.clone(), u32::from(*c)));
    }

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u32>().ok())
        && (1..=24).contains(&n)
    {
        return Some((format!("F{n}"), 0x70 + n - 1));
    }

    NAMED_KEYS
        .iter()
        .find(|(_, aliases, _)| aliases.contains(&upper.as_str()))
        .map(|(canonical, _, vk)| (canonical.to_string(), *vk))
}

/// Canonical name for a virtual-key code.
fn name_for_vk(vk: u32) -> Option<String> {
    match vk {
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(vk).map(|c| c.to_string()),
        0x70..=0x87 => Some(format!("F{}", vk - 0x70 + 1)),
        _ => NAMED_KEYS
            .iter()
            .find(|(_, _, code)| *code == vk)
            .map(|(canonical, _, _)| canonical.to_string()),
    }
}

/// A key with a set of modifiers, e.g. `Ctrl+Shift+F1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    key: String,
    vk: u32,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl KeyCombo {
    /// Parse a keybinding string like "Ctrl+Shift+S" or "Escape".
    /// Modifiers can appear in any order and any case: "shift+ctrl+s".
    /// Supports spaces around '+' (e.g., "Ctrl + Shift + S")
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty keybinding string".to_string());
        }

        let s_normalized = s.replace(" + ", "+").replace("+ ", "+").replace(" +", "+");

        let mut ctrl = false;
        let mut shift = false;
        let mut alt = false;
        let mut win = false;
        let mut key_parts = Vec::new();

        for part in s_normalized.split('+') {
            match part.trim().to_lowercase().as_str() {
                "ctrl" | "control" => ctrl = true,
                "shift" => shift = true,
                "alt" => alt = true,
                "win" | "super" | "meta" => win = true,
                _ => key_parts.push(part),
            }
        }

        let key_name = match key_parts.as_slice() {
            [] => return Err(format!("No key specified in: {}", s)),
            [key] if key.trim().is_empty() => return Err(format!("No key specified in: {}", s)),
            [key] => *key,
            _ => return Err(format!("More than one key in: {}", s)),
        };

        let (key, vk) =
            lookup_key(key_name).ok_or_else(|| format!("Unknown key '{}' in: {}", key_name, s))?;

        Ok(Self {
            key,
            vk,
            ctrl,
            shift,
            alt,
            win,
        })
    }

    /// Build a combo from a virtual-key code, as reported by a key-down event.
    pub fn from_virtual_key(vk: u32, ctrl: bool, shift: bool, alt: bool, win: bool) -> Option<Self> {
        Some(Self {
            key: name_for_vk(vk)?,
            vk,
            ctrl,
            shift,
            alt,
            win,
        })
    }

    /// Canonical key name without modifiers.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn virtual_key(&self) -> u32 {
        self.vk
    }

    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.win
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.win {
            f.write_str("Win+")?;
        }
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let combo = KeyCombo::parse("Escape").unwrap();
        assert_eq!(combo.key(), "Escape");
        assert_eq!(combo.virtual_key(), 0x1B);
        assert!(!combo.has_modifiers());
    }

    #[test]
    fn test_parse_ctrl_key() {
        let combo = KeyCombo::parse("Ctrl+F1").unwrap();
        assert_eq!(combo.key(), "F1");
        assert_eq!(combo.virtual_key(), 0x70);
        assert!(combo.ctrl);
        assert!(!combo.shift);
        assert!(!combo.alt);
    }

    #[test]
    fn test_parse_all_modifiers() {
        let combo = KeyCombo::parse("Ctrl+Shift+Alt+Win+A").unwrap();
        assert_eq!(combo.key(), "A");
        assert_eq!(combo.virtual_key(), 0x41);
        assert!(combo.ctrl && combo.shift && combo.alt && combo.win);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let combo = KeyCombo::parse("ctrl+shift+s").unwrap();
        assert_eq!(combo.key(), "S");
        assert!(combo.ctrl);
        assert!(combo.shift);
    }

    #[test]
    fn test_parse_with_spaces() {
        let combo = KeyCombo::parse("Ctrl + Shift + F24").unwrap();
        assert_eq!(combo.key(), "F24");
        assert_eq!(combo.virtual_key(), 0x87);
    }

    #[test]
    fn test_parse_modifier_order_independence() {
        let a = KeyCombo::parse("Ctrl+Alt+Shift+W").unwrap();
        let b = KeyCombo::parse("Shift+Alt+Ctrl+W").unwrap();
        let c = KeyCombo::parse("alt+shift+control+w").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(KeyCombo::parse("Esc").unwrap(), KeyCombo::parse("Escape").unwrap());
        assert_eq!(KeyCombo::parse("Super+D").unwrap(), KeyCombo::parse("Win+D").unwrap());
        assert_eq!(KeyCombo::parse("PrtSc").unwrap().virtual_key(), 0x2C);
        assert_eq!(KeyCombo::parse("7").unwrap().virtual_key(), 0x37);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(KeyCombo::parse("").is_err());
        assert!(KeyCombo::parse("Ctrl+Shift").is_err());
        assert!(KeyCombo::parse("Ctrl+").is_err());
        assert!(KeyCombo::parse("Ctrl+A+B").is_err());
        assert!(KeyCombo::parse("F25").is_err());
        assert!(KeyCombo::parse("Hyper+K").is_err());
    }

    #[test]
    fn display_is_normalized() {
        let combo = KeyCombo::parse("win + alt + shift + ctrl + pgup").unwrap();
        assert_eq!(combo.to_string(), "Ctrl+Shift+Alt+Win+PageUp");
        assert_eq!(KeyCombo::parse(&combo.to_string()).unwrap(), combo);
    }

    #[test]
    fn from_virtual_key_matches_parsed() {
        let parsed = KeyCombo::parse("Ctrl+Shift+S").unwrap();
        let pressed = KeyCombo::from_virtual_key(0x53, true, true, false, false).unwrap();
        assert_eq!(parsed, pressed);

        let escape = KeyCombo::from_virtual_key(0x1B, false, false, false, false).unwrap();
        assert_eq!(escape.key(), "Escape");
        assert!(KeyCombo::from_virtual_key(0xFF, false, false, false, false).is_none());
    }
}
