//! Daemon mode: global hotkeys and console commands on one UI thread.
//!
//! Hotkeys are registered against the thread that runs [`Daemon::run`]. Every
//! poll pumps the OS queue for fired hotkey ids and pushes them onto the
//! [`EventQueue`]; a reader thread feeds typed console lines into the same
//! queue. Events are handled one at a time on the UI thread, so a capture
//! always runs to completion before the next event is looked at.

use anyhow::Result;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{Action, Settings, SettingsStore, Shortcuts};
use crate::hotkey::{HotkeyBackend, HotkeyDispatcher, HotkeyError};
use crate::orchestrator::{CaptureOrchestrator, CaptureRequest, Trigger};
use crate::platform;
use crate::region::SelectionOverlay;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Work for the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A registered global hotkey fired.
    Hotkey(i32),
    /// One line typed on the console.
    Line(String),
}

/// The UI queue: console lines from the reader thread plus events posted on
/// the UI thread itself.
pub struct EventQueue {
    rx: mpsc::Receiver<UiEvent>,
    backlog: VecDeque<UiEvent>,
    console_closed: bool,
}

impl EventQueue {
    pub fn new(rx: mpsc::Receiver<UiEvent>) -> Self {
        Self {
            rx,
            backlog: VecDeque::new(),
            console_closed: false,
        }
    }

    pub fn push(&mut self, event: UiEvent) {
        self.backlog.push_back(event);
    }

    /// Next event, waiting up to `timeout` for console input.
    pub fn next(&mut self, timeout: Duration) -> Option<UiEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        if self.console_closed {
            thread::sleep(timeout);
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Console input closed; hotkeys stay active");
                self.console_closed = true;
                None
            }
        }
    }

    /// Blocks for the next console line, keeping anything else for later.
    fn next_line(&mut self) -> Option<String> {
        if self.console_closed {
            return None;
        }
        loop {
            match self.rx.recv() {
                Ok(UiEvent::Line(line)) => return Some(line),
                Ok(other) => self.backlog.push_back(other),
                Err(_) => {
                    self.console_closed = true;
                    return None;
                }
            }
        }
    }
}

/// Console input for prompts that run while the daemon owns stdin.
///
/// Reads lines from the shared [`EventQueue`] instead of stdin, so the window
/// picker and the command reader never compete for the same input.
pub struct ConsoleLines {
    queue: Rc<RefCell<EventQueue>>,
    buf: Vec<u8>,
    pos: usize,
}

impl ConsoleLines {
    pub fn new(queue: Rc<RefCell<EventQueue>>) -> Self {
        Self {
            queue,
            buf: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ConsoleLines {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ConsoleLines {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.buf.clear();
            self.pos = 0;
            if let Some(line) = self.queue.borrow_mut().next_line() {
                self.buf.extend_from_slice(line.as_bytes());
                self.buf.push(b'\n');
            }
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amount: usize) {
        self.pos = (self.pos + amount).min(self.buf.len());
    }
}

/// Forwards stdin lines to the UI queue until stdin closes.
///
/// The thread blocks on stdin for the life of the process; it holds nothing
/// that needs cleanup.
pub fn spawn_console_reader(tx: mpsc::Sender<UiEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(UiEvent::Line(line)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Console input failed: {}", err);
                        break;
                    }
                }
            }
            debug!("Console reader finished");
        })
}

/// A typed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Action(Action),
    SaveAs(PathBuf),
    EditSettings,
    Hotkeys,
    Show,
    Help,
}

impl ConsoleCommand {
    /// Parses one console line; blank lines are `Ok(None)`.
    ///
    /// Besides the short aliases, every action name from the settings file
    /// (`region_select`, `open_save_folder`, ...) is accepted.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let word = word.to_lowercase();

        let action = match word.as_str() {
            "settings" | "edit" => return Ok(Some(Self::EditSettings)),
            "keys" | "hotkeys" => return Ok(Some(Self::Hotkeys)),
            "show" | "restore" => return Ok(Some(Self::Show)),
            "help" | "?" => return Ok(Some(Self::Help)),
            "region" => Action::RegionSelect,
            "full" => Action::FullScreen,
            "window" => Action::WindowCapture,
            "repeat" => Action::RepeatRegion,
            "folder" | "open-folder" => Action::OpenSaveFolder,
            "save" => Action::SaveAs,
            "exit" | "quit" => Action::ExitApplication,
            other => Action::from_name(other)
                .ok_or_else(|| format!("Unknown command '{other}'. Type 'help' for the list."))?,
        };

        if action == Action::SaveAs {
            let path = rest.trim_matches('"');
            if path.is_empty() {
                return Err("save-as needs a file path, e.g. save-as capture.png".into());
            }
            return Ok(Some(Self::SaveAs(PathBuf::from(path))));
        }
        Ok(Some(Self::Action(action)))
    }
}

/// Opens the settings file for editing; `Ok(false)` means the edit was abandoned.
type Editor = dyn FnMut(&Path) -> io::Result<bool>;
type OverlayFactory = dyn Fn(&Shortcuts) -> Box<dyn SelectionOverlay>;

fn platform_editor(path: &Path) -> io::Result<bool> {
    let status = platform::edit_file(path)?;
    Ok(status.success())
}

pub struct Daemon<B: HotkeyBackend> {
    orchestrator: CaptureOrchestrator,
    dispatcher: HotkeyDispatcher<B>,
    store: SettingsStore,
    settings: Settings,
    events: Rc<RefCell<EventQueue>>,
    out: Box<dyn Write>,
    editor: Box<Editor>,
    overlay_factory: Box<OverlayFactory>,
    poll_interval: Duration,
    should_quit: bool,
}

impl<B: HotkeyBackend> Daemon<B> {
    pub fn new(
        orchestrator: CaptureOrchestrator,
        hotkeys: B,
        store: SettingsStore,
        settings: Settings,
        events: Rc<RefCell<EventQueue>>,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher: HotkeyDispatcher::new(hotkeys),
            store,
            settings,
            events,
            out: Box::new(io::stdout()),
            editor: Box::new(platform_editor),
            overlay_factory: Box::new(platform::selection_overlay),
            poll_interval: POLL_INTERVAL,
            should_quit: false,
        }
    }

    #[cfg(test)]
    fn with_test_io(
        mut self,
        out: Box<dyn Write>,
        editor: Box<Editor>,
        overlay_factory: Box<OverlayFactory>,
    ) -> Self {
        self.out = out;
        self.editor = editor;
        self.overlay_factory = overlay_factory;
        self.poll_interval = Duration::from_millis(1);
        self
    }

    /// Runs until an exit command.
    pub fn run(&mut self) -> Result<()> {
        self.start();
        self.event_loop();
        self.shutdown();
        Ok(())
    }

    fn start(&mut self) {
        info!("Starting MyCap daemon");
        if self.settings.auto_start {
            info!("auto_start is enabled; add `mycap daemon` to your login items to start it with the session");
        }

        let errors = self.dispatcher.register_all(&self.settings.shortcuts);
        self.report_hotkey_errors(errors);
        for (action, combo) in self.settings.shortcuts.globals() {
            if self.dispatcher.is_registered(action) {
                info!("{} bound to {}", action.label(), combo);
            }
        }

        let banner = format!("MyCap {} is running.\n{}", env!("CARGO_PKG_VERSION"), self.help_text());
        self.say(&banner);
    }

    fn event_loop(&mut self) {
        while !self.should_quit {
            for id in self.dispatcher.backend_mut().pending() {
                self.events.borrow_mut().push(UiEvent::Hotkey(id));
            }

            let next = self.events.borrow_mut().next(self.poll_interval);
            if let Some(event) = next {
                self.handle_event(event);
            }
        }
    }

    fn shutdown(&mut self) {
        info!("Daemon shutting down");
        self.dispatcher.unregister_all();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Hotkey(id) => match self.dispatcher.action_for(id) {
                Some(action) => {
                    debug!("Hotkey {} fired: {}", id, action);
                    self.perform(action, Trigger::Hotkey);
                }
                None => debug!("Ignoring unknown hotkey id {}", id),
            },
            UiEvent::Line(line) => match ConsoleCommand::parse(&line) {
                Ok(Some(command)) => self.execute(command),
                Ok(None) => {}
                Err(message) => self.say(&message),
            },
        }
    }

    fn execute(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Action(action) => self.perform(action, Trigger::Command),
            ConsoleCommand::SaveAs(path) => match self.orchestrator.save_last_as(&path) {
                Ok(saved) => self.say(&format!("Saved to {}", saved.display())),
                Err(e) => self.orchestrator.alert(e.title(), &e.to_string()),
            },
            ConsoleCommand::EditSettings => self.edit_settings(),
            ConsoleCommand::Hotkeys => {
                let text = self.bindings_text();
                self.say(&text);
            }
            ConsoleCommand::Show => self.orchestrator.surface_mut().show(),
            ConsoleCommand::Help => {
                let text = self.help_text();
                self.say(&text);
            }
        }
    }

    fn perform(&mut self, action: Action, trigger: Trigger) {
        if let Some(request) = CaptureRequest::from_action(action, trigger) {
            self.orchestrator.run(&request, &mut self.settings);
            return;
        }

        match action {
            Action::OpenSaveFolder => {
                self.orchestrator.open_save_folder(&self.settings);
            }
            Action::Copy => match self.orchestrator.copy_last() {
                Ok(()) => self.say("Copied the last capture to the clipboard."),
                Err(e) => self.orchestrator.alert(e.title(), &e.to_string()),
            },
            Action::SaveAs => self.say("Usage: save-as <path>"),
            Action::About => {
                let text = about_text(&self.store);
                self.say(&text);
            }
            Action::CloseDialog => debug!("No dialog open"),
            Action::ExitApplication => {
                info!("Exit requested");
                self.should_quit = true;
            }
            Action::RegionSelect | Action::FullScreen | Action::WindowCapture | Action::RepeatRegion => {}
        }
    }

    /// Lets the user edit the settings file with every hotkey released.
    ///
    /// A valid file replaces the running settings; anything else keeps them
    /// and the previous bindings are registered again.
    fn edit_settings(&mut self) {
        if !self.store.exists()
            && let Err(e) = self.store.save(&self.settings)
        {
            self.orchestrator.alert("Settings", &e.to_string());
            return;
        }
        self.say(&format!("Editing {} ...", self.store.path().display()));

        let current = self.settings.shortcuts.clone();
        let store = &self.store;
        let editor = &mut self.editor;
        let mut reloaded: Option<Settings> = None;
        let mut failure: Option<String> = None;

        let (_, errors) = self.dispatcher.edit_bindings(&current, || {
            match (*editor)(store.path()) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Editor reported failure; keeping the current settings");
                    return None;
                }
                Err(e) => {
                    failure = Some(format!("Could not start the editor: {e}"));
                    return None;
                }
            }
            match store.load() {
                Ok(settings) => {
                    let shortcuts = settings.shortcuts.clone();
                    reloaded = Some(settings);
                    Some(shortcuts)
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    None
                }
            }
        });

        if let Some(settings) = reloaded {
            self.orchestrator
                .replace_overlay((self.overlay_factory)(&settings.shortcuts));
            self.settings = settings;
            self.say("Settings reloaded.");
        }
        if let Some(reason) = failure {
            warn!("Settings edit not applied: {}", reason);
            self.orchestrator.alert(
                "Settings",
                &format!("The settings were not changed.\n{reason}"),
            );
        }
        self.report_hotkey_errors(errors);
    }

    fn report_hotkey_errors(&mut self, errors: Vec<HotkeyError>) {
        if errors.is_empty() {
            return;
        }
        if errors.contains(&HotkeyError::Unsupported) {
            warn!("Global hotkeys are not available on this platform");
            self.say("Global hotkeys are not available here; type commands instead.");
            return;
        }

        for error in &errors {
            warn!("{}", error);
        }
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        self.orchestrator.alert(
            "Hotkeys",
            &format!("Some hotkeys could not be registered:\n{details}"),
        );
    }

    fn bindings_text(&self) -> String {
        let mut text = String::from("Shortcuts:");
        for (action, binding) in self.settings.shortcuts.iter() {
            let state = if !action.is_global() {
                "local"
            } else if self.dispatcher.is_registered(action) {
                "global"
            } else {
                "not registered"
            };
            text.push_str(&format!("\n  {:<26} {:<16} {}", action.label(), binding, state));
        }
        text
    }

    fn help_text(&self) -> String {
        let binding = |action| self.settings.shortcuts.get(action).unwrap_or("-");
        format!(
            "Commands:\n\
             \x20 region          capture a dragged region ({})\n\
             \x20 full            capture the whole desktop ({})\n\
             \x20 window          pick a window to capture ({})\n\
             \x20 repeat          capture the last region again ({})\n\
             \x20 folder          open the save folder ({})\n\
             \x20 copy            copy the last capture again\n\
             \x20 save-as <path>  save the last capture to a file\n\
             \x20 settings        edit the settings file\n\
             \x20 keys            list the shortcuts\n\
             \x20 show            bring the console back after a quiet capture\n\
             \x20 about           version information\n\
             \x20 exit            quit",
            binding(Action::RegionSelect),
            binding(Action::FullScreen),
            binding(Action::WindowCapture),
            binding(Action::RepeatRegion),
            binding(Action::OpenSaveFolder),
        )
    }

    fn say(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            debug!("Console output failed: {}", err);
        }
    }
}

fn about_text(store: &SettingsStore) -> String {
    format!(
        "MyCap {} ({})\nRegion, window and full-screen capture to the clipboard and disk.\nSettings: {}",
        env!("CARGO_PKG_VERSION"),
        env!("MYCAP_GIT_HASH"),
        store.path().display()
    )
}
