use mycap::config::{Action, ImageFormat, LoadStatus, SettingsStore, Shortcuts};
use mycap::geometry::Rect;
use mycap::hotkey::KeyCombo;
use mycap::Settings;
use tempfile::TempDir;

#[test]
fn schema_describes_every_settings_field() {
    let schema = serde_json::to_value(schemars::schema_for!(Settings)).unwrap();
    let properties = schema["properties"].as_object().unwrap();

    for field in [
        "save_directory",
        "auto_save",
        "default_format",
        "quiet_mode",
        "auto_start",
        "last_region",
        "shortcuts",
    ] {
        assert!(properties.contains_key(field), "schema lacks {field}");
    }
}

#[test]
fn external_tools_can_validate_edited_shortcuts() {
    let mut shortcuts = Shortcuts::default();
    shortcuts.set(Action::FullScreen, "ctrl+shift+p").unwrap();
    assert_eq!(shortcuts.get(Action::FullScreen), Some("Ctrl+Shift+P"));

    let settings = Settings {
        shortcuts: shortcuts.clone(),
        ..Settings::default()
    };
    assert!(settings.validate().is_ok());

    shortcuts.set(Action::WindowCapture, "Ctrl+Shift+P").unwrap();
    let clashing = Settings {
        shortcuts,
        ..Settings::default()
    };
    let err = clashing.validate().unwrap_err();
    assert!(err.contains("Duplicate keybinding"));
}

#[test]
fn written_file_loads_back_unchanged() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::new(temp.path().join("settings.toml"));

    let settings = Settings {
        save_directory: temp.path().join("shots"),
        default_format: ImageFormat::Jpeg,
        quiet_mode: true,
        last_region: Some(Rect::new(-1920, 40, 800, 600)),
        ..Settings::default()
    };
    store.save(&settings).unwrap();

    let loaded = store.load_or_reset().unwrap();
    assert_eq!(loaded.status, LoadStatus::Loaded);
    assert_eq!(loaded.settings, settings);
}

#[test]
fn key_combos_normalize_their_spelling() {
    let combo = KeyCombo::parse("shift+CTRL+prtsc").unwrap();
    assert_eq!(combo.to_string(), "Ctrl+Shift+PrintScreen");
    assert!(KeyCombo::parse("Ctrl+").is_err());
}
