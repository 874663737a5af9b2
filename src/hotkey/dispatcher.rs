use std::collections::HashMap;

use thiserror::Error;

use super::binding::KeyCombo;
use crate::config::{Action, Shortcuts};

/// Highest id an application may pass to `RegisterHotKey`.
const MAX_HOTKEY_ID: i32 = 0xBFFF;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("{combo} for {action} is already in use by another application")]
    Conflict { action: Action, combo: KeyCombo },

    #[error("Invalid hotkey for {action}: {reason}")]
    InvalidCombo { action: Action, reason: String },

    #[error("Global hotkeys are not supported on this platform")]
    Unsupported,

    #[error("The system rejected the hotkey: {0}")]
    Rejected(String),
}

/// OS-level global hotkey registration.
pub trait HotkeyBackend {
    fn register(&mut self, id: i32, combo: &KeyCombo, no_repeat: bool) -> Result<(), HotkeyError>;

    fn unregister(&mut self, id: i32) -> Result<(), HotkeyError>;

    /// Hotkey ids the OS reported since the last call.
    fn pending(&mut self) -> Vec<i32> {
        Vec::new()
    }
}

impl<B: HotkeyBackend + ?Sized> HotkeyBackend for Box<B> {
    fn register(&mut self, id: i32, combo: &KeyCombo, no_repeat: bool) -> Result<(), HotkeyError> {
        (**self).register(id, combo, no_repeat)
    }

    fn unregister(&mut self, id: i32) -> Result<(), HotkeyError> {
        (**self).unregister(id)
    }

    fn pending(&mut self) -> Vec<i32> {
        (**self).pending()
    }
}

#[derive(Debug, Clone)]
struct Registration {
    id: i32,
    combo: KeyCombo,
}

/// Owns the action→hotkey-id table and keeps it in sync with the OS.
pub struct HotkeyDispatcher<B: HotkeyBackend> {
    backend: B,
    registered: HashMap<Action, Registration>,
    next_id: i32,
}

impl<B: HotkeyBackend> HotkeyDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            registered: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn allocate_id(&mut self) -> i32 {
        loop {
            let id = self.next_id;
            self.next_id = if id >= MAX_HOTKEY_ID { 1 } else { id + 1 };
            if !self.registered.values().any(|r| r.id == id) {
                return id;
            }
        }
    }

    /// Bind `action` to `combo` system-wide.
    ///
    /// Any previous registration of the action is released first. The
    /// no-repeat variant is tried before the plain one, since older systems
    /// reject `MOD_NOREPEAT`.
    ///
    /// # Errors
    /// Returns [`HotkeyError::Conflict`] when both attempts fail. The action is
    /// left unbound in that case.
    pub fn register(&mut self, action: Action, combo: &KeyCombo) -> Result<i32, HotkeyError> {
        self.unregister(action);

        let id = self.allocate_id();
        let first = self.backend.register(id, combo, true);
        let result = match first {
            Ok(()) => Ok(()),
            Err(HotkeyError::Unsupported) => Err(HotkeyError::Unsupported),
            Err(e) => {
                log::debug!("No-repeat registration of {} failed ({}), retrying", combo, e);
                self.backend.register(id, combo, false)
            }
        };

        match result {
            Ok(()) => {
                log::info!("Registered {} for {} (id {})", combo, action, id);
                self.registered.insert(
                    action,
                    Registration {
                        id,
                        combo: combo.clone(),
                    },
                );
                Ok(id)
            }
            Err(HotkeyError::Unsupported) => Err(HotkeyError::Unsupported),
            Err(e) => {
                log::warn!("Could not register {} for {}: {}", combo, action, e);
                Err(HotkeyError::Conflict {
                    action,
                    combo: combo.clone(),
                })
            }
        }
    }

    /// Release the hotkey of `action`. Returns false when it was not bound.
    pub fn unregister(&mut self, action: Action) -> bool {
        let Some(registration) = self.registered.remove(&action) else {
            return false;
        };
        if let Err(e) = self.backend.unregister(registration.id) {
            log::warn!("Failed to unregister hotkey for {}: {}", action, e);
        }
        log::debug!("Unregistered {} for {}", registration.combo, action);
        true
    }

    pub fn unregister_all(&mut self) {
        let mut actions: Vec<Action> = self.registered.keys().copied().collect();
        actions.sort();
        for action in actions {
            self.unregister(action);
        }
    }

    pub fn action_for(&self, id: i32) -> Option<Action> {
        self.registered
            .iter()
            .find(|(_, registration)| registration.id == id)
            .map(|(action, _)| *action)
    }

    pub fn combo_for(&self, action: Action) -> Option<&KeyCombo> {
        self.registered.get(&action).map(|r| &r.combo)
    }

    pub fn is_registered(&self, action: Action) -> bool {
        self.registered.contains_key(&action)
    }

    /// Register every global action of `shortcuts`, collecting the failures.
    pub fn register_all(&mut self, shortcuts: &Shortcuts) -> Vec<HotkeyError> {
        let mut errors = Vec::new();

        for action in Action::ALL.into_iter().filter(|a| a.is_global()) {
            let Some(binding) = shortcuts.get(action) else {
                continue;
            };
            let combo = match KeyCombo::parse(binding) {
                Ok(combo) => combo,
                Err(reason) => {
                    errors.push(HotkeyError::InvalidCombo { action, reason });
                    continue;
                }
            };
            if let Err(e) = self.register(action, &combo) {
                let unsupported = e == HotkeyError::Unsupported;
                errors.push(e);
                if unsupported {
                    break;
                }
            }
        }

        errors
    }

    /// Run a settings edit with all hotkeys released.
    ///
    /// `edit` returns the new shortcuts, or `None` when the edit was cancelled
    /// or failed. Either way the globals are registered again before this
    /// returns: the new set on success, `current` otherwise.
    pub fn edit_bindings<F>(&mut self, current: &Shortcuts, edit: F) -> (Shortcuts, Vec<HotkeyError>)
    where
        F: FnOnce() -> Option<Shortcuts>,
    {
        self.unregister_all();

        let shortcuts = match edit() {
            Some(updated) => {
                log::info!("Applying edited keybindings");
                updated
            }
            None => {
                log::info!("Settings edit cancelled, restoring previous keybindings");
                current.clone()
            }
        };

        let errors = self.register_all(&shortcuts);
        (shortcuts, errors)
    }
}

impl<B: HotkeyBackend> Drop for HotkeyDispatcher<B> {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
