//! Keybinding configuration types.
//!
//! Every [`Action`] has exactly one binding. Global actions are registered with
//! the OS and fire from anywhere; local actions only apply while mycap itself
//! has focus (the selection overlay or the daemon console).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::hotkey::KeyCombo;

/// All possible actions that can be bound to keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // Global capture actions
    RegionSelect,
    FullScreen,
    WindowCapture,
    RepeatRegion,
    OpenSaveFolder,

    // Local actions
    SaveAs,
    Copy,
    About,
    CloseDialog,
    ExitApplication,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::RegionSelect,
        Action::FullScreen,
        Action::WindowCapture,
        Action::RepeatRegion,
        Action::OpenSaveFolder,
        Action::SaveAs,
        Action::Copy,
        Action::About,
        Action::CloseDialog,
        Action::ExitApplication,
    ];

    /// Global actions need OS-level registration.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Action::RegionSelect
                | Action::FullScreen
                | Action::WindowCapture
                | Action::RepeatRegion
                | Action::OpenSaveFolder
        )
    }

    /// Identifier used in the settings file.
    pub fn name(self) -> &'static str {
        match self {
            Action::RegionSelect => "region_select",
            Action::FullScreen => "full_screen",
            Action::WindowCapture => "window_capture",
            Action::RepeatRegion => "repeat_region",
            Action::OpenSaveFolder => "open_save_folder",
            Action::SaveAs => "save_as",
            Action::Copy => "copy",
            Action::About => "about",
            Action::CloseDialog => "close_dialog",
            Action::ExitApplication => "exit_application",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().replace('-', "_").to_lowercase();
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::RegionSelect => "Capture region",
            Action::FullScreen => "Capture full screen",
            Action::WindowCapture => "Capture window",
            Action::RepeatRegion => "Repeat last region",
            Action::OpenSaveFolder => "Open save folder",
            Action::SaveAs => "Save as",
            Action::Copy => "Copy to clipboard",
            Action::About => "About",
            Action::CloseDialog => "Close dialog",
            Action::ExitApplication => "Exit",
        }
    }

    pub fn default_binding(self) -> &'static str {
        match self {
            Action::RegionSelect => "Ctrl+F1",
            Action::FullScreen => "Ctrl+F2",
            Action::WindowCapture => "Ctrl+F3",
            Action::RepeatRegion => "Ctrl+Shift+F1",
            Action::OpenSaveFolder => "Ctrl+Shift+O",
            Action::SaveAs => "Ctrl+Shift+S",
            Action::Copy => "Ctrl+C",
            Action::About => "F1",
            Action::CloseDialog => "Escape",
            Action::ExitApplication => "Alt+F4",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One key combination per action.
///
/// Stored in settings.toml as:
/// ```toml
/// [shortcuts]
/// region_select = "Ctrl+F1"
/// full_screen = "Ctrl+F2"
/// close_dialog = "Escape"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Shortcuts(BTreeMap<Action, String>);

impl Default for Shortcuts {
    fn default() -> Self {
        Self(
            Action::ALL
                .into_iter()
                .map(|action| (action, action.default_binding().to_string()))
                .collect(),
        )
    }
}

impl Shortcuts {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, action: Action) -> Option<&str> {
        self.0.get(&action).map(String::as_str)
    }

    /// Replace the binding of `action`, storing the normalized spelling.
    pub fn set(&mut self, action: Action, binding: &str) -> Result<KeyCombo, String> {
        let combo = KeyCombo::parse(binding)?;
        self.0.insert(action, combo.to_string());
        Ok(combo)
    }

    pub fn remove(&mut self, action: Action) -> Option<String> {
        self.0.remove(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, &str)> {
        self.0.iter().map(|(action, binding)| (*action, binding.as_str()))
    }

    /// Parse every binding, requiring all actions to be present and distinct.
    ///
    /// Returns an error naming the first missing action, unparsable binding or
    /// duplicate combination.
    pub fn build_action_map(&self) -> Result<HashMap<KeyCombo, Action>, String> {
        let mut map = HashMap::new();

        for action in Action::ALL {
            let binding_str = self
                .get(action)
                .ok_or_else(|| format!("Missing keybinding for '{}'", action))?;
            let combo = KeyCombo::parse(binding_str)
                .map_err(|e| format!("Invalid keybinding for '{}': {}", action, e))?;
            if let Some(existing_action) = map.insert(combo.clone(), action) {
                return Err(format!(
                    "Duplicate keybinding '{}' assigned to both {} and {}",
                    binding_str, existing_action, action
                ));
            }
        }

        Ok(map)
    }

    /// Parsed bindings of the global actions, skipping any that fail to parse.
    pub fn globals(&self) -> Vec<(Action, KeyCombo)> {
        Action::ALL
            .into_iter()
            .filter(|action| action.is_global())
            .filter_map(|action| {
                let binding = self.get(action)?;
                match KeyCombo::parse(binding) {
                    Ok(combo) => Some((action, combo)),
                    Err(e) => {
                        log::warn!("Ignoring keybinding for {}: {}", action, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// The local action bound to `combo`, if any.
    pub fn local_action(&self, combo: &KeyCombo) -> Option<Action> {
        self.iter()
            .filter(|(action, _)| !action.is_global())
            .find(|(_, binding)| KeyCombo::parse(binding).is_ok_and(|c| &c == combo))
            .map(|(action, _)| action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_action() {
        let shortcuts = Shortcuts::default();
        for action in Action::ALL {
            assert!(shortcuts.get(action).is_some(), "{action} has no default");
        }
        assert_eq!(shortcuts.get(Action::RegionSelect), Some("Ctrl+F1"));
        assert_eq!(shortcuts.get(Action::CloseDialog), Some("Escape"));
    }

    #[test]
    fn test_build_action_map() {
        let map = Shortcuts::default().build_action_map().unwrap();
        let ctrl_f2 = KeyCombo::parse("Ctrl+F2").unwrap();
        assert_eq!(map.get(&ctrl_f2), Some(&Action::FullScreen));
        assert_eq!(map.len(), Action::ALL.len());
    }

    #[test]
    fn missing_action_is_reported() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.remove(Action::WindowCapture);
        let err = shortcuts.build_action_map().unwrap_err();
        assert!(err.contains("window_capture"));
    }

    #[test]
    fn test_duplicate_keybinding_detection() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.set(Action::Copy, "Ctrl+F1").unwrap();

        let err = shortcuts.build_action_map().unwrap_err();
        assert!(err.contains("Duplicate keybinding"));
        assert!(err.contains("Ctrl+F1"));
    }

    #[test]
    fn test_duplicate_with_different_modifier_order() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.set(Action::RegionSelect, "Ctrl+Shift+W").unwrap();
        shortcuts.0.insert(Action::FullScreen, "Shift+Ctrl+W".to_string());

        let err = shortcuts.build_action_map().unwrap_err();
        assert!(err.contains("Duplicate keybinding"));
    }

    #[test]
    fn globals_and_locals_are_split() {
        let shortcuts = Shortcuts::default();
        let globals: Vec<Action> = shortcuts.globals().into_iter().map(|(a, _)| a).collect();
        assert_eq!(
            globals,
            vec![
                Action::RegionSelect,
                Action::FullScreen,
                Action::WindowCapture,
                Action::RepeatRegion,
                Action::OpenSaveFolder
            ]
        );

        let escape = KeyCombo::parse("esc").unwrap();
        assert_eq!(shortcuts.local_action(&escape), Some(Action::CloseDialog));
        let ctrl_f1 = KeyCombo::parse("Ctrl+F1").unwrap();
        assert_eq!(shortcuts.local_action(&ctrl_f1), None);
    }

    #[test]
    fn set_stores_normalized_spelling() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.set(Action::About, "shift + ctrl + f12").unwrap();
        assert_eq!(shortcuts.get(Action::About), Some("Ctrl+Shift+F12"));
        assert!(shortcuts.set(Action::About, "Ctrl+").is_err());
    }

    #[test]
    fn action_names_round_trip_through_from_name() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("open-save-folder"), Some(Action::OpenSaveFolder));
        assert_eq!(Action::from_name("undo"), None);
    }
}
