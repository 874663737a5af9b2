use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;

mod capture;
mod config;
mod daemon;
mod geometry;
mod hotkey;
mod instance;
mod orchestrator;
mod platform;
mod region;
mod window;

use capture::{CaptureDependencies, CaptureOutcome};
use config::{LoadStatus, Settings, SettingsStore};
use geometry::Rect;
use instance::{InstanceError, SingleInstance};
use orchestrator::{
    CaptureKind, CaptureNotifier, CaptureOrchestrator, CaptureRequest, ConsoleAlerter, Feedback,
    PreviewNotifier, Trigger, UiParts,
};
use window::{ConsolePicker, XcapWindowSystem, list_capturable_windows};

#[derive(Parser, Debug)]
#[command(name = "mycap")]
#[command(
    version,
    about = "Screenshot utility with region selection, window capture and global hotkeys"
)]
struct Cli {
    /// Settings file to use instead of the per-user one
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stay in the background: global hotkeys plus console commands
    Daemon,

    /// Capture the whole desktop across all monitors
    Full {
        /// Flash the screen instead of printing a summary
        #[arg(long)]
        quiet: bool,
    },

    /// Capture a region (drag a selection unless --rect or --repeat is given)
    Region {
        /// Fixed rectangle in screen coordinates
        #[arg(long, value_name = "X,Y,W,H", conflicts_with = "repeat")]
        rect: Option<Rect>,

        /// Capture the last selected region again
        #[arg(long)]
        repeat: bool,
    },

    /// Capture the client area of a window
    Window {
        /// First window whose title contains TEXT, instead of asking
        #[arg(long, value_name = "TEXT")]
        title: Option<String>,
    },

    /// List the windows that can be captured
    ListWindows {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Open the save folder in the file manager
    OpenFolder,

    /// Inspect or reset the settings file
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the settings file location
    Path,
    /// Print the effective settings
    Show,
    /// Overwrite the settings file with defaults
    Reset,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    platform::init_process();

    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location().context("Failed to locate the settings file")?,
    };

    let Some(command) = cli.command else {
        print_usage();
        return Ok(());
    };

    match command {
        Command::Daemon => run_daemon(store),
        Command::Full { quiet } => run_capture(store, CaptureKind::FullScreen, quiet),
        Command::Region { rect, repeat } => {
            let kind = match rect {
                Some(rect) => CaptureKind::Rect(rect),
                None if repeat => CaptureKind::RepeatRegion,
                None => CaptureKind::Region,
            };
            run_capture(store, kind, false)
        }
        Command::Window { title } => {
            let kind = match title {
                Some(title) => CaptureKind::WindowMatching(title),
                None => CaptureKind::Window,
            };
            run_capture(store, kind, false)
        }
        Command::ListWindows { json } => list_windows(json),
        Command::OpenFolder => open_folder(store),
        Command::Settings { action } => settings_command(&store, action),
    }
}

fn print_usage() {
    println!("mycap: Screenshot utility with region selection, window capture and global hotkeys");
    println!();
    println!("Usage:");
    println!("  mycap daemon           Run in the background with global hotkeys");
    println!("  mycap region           Drag a region to capture");
    println!("  mycap full             Capture the whole desktop");
    println!("  mycap window           Pick a window to capture");
    println!("  mycap settings path    Show where settings are stored");
    println!("  mycap --help           Show all commands and options");
    println!();
    println!("Default hotkeys in daemon mode:");
    for (action, combo) in config::Shortcuts::default().globals() {
        println!("  {:<16} {}", combo.to_string(), action.label());
    }
}

fn load_settings(store: &SettingsStore) -> Result<Settings> {
    let loaded = store
        .load_or_reset()
        .with_context(|| format!("Failed to load settings from {}", store.path().display()))?;
    match &loaded.status {
        LoadStatus::Created => {
            log::info!("Created default settings at {}", store.path().display());
        }
        LoadStatus::Reset(reason) => {
            eprintln!("Settings were invalid ({reason}) and have been reset to defaults.");
        }
        LoadStatus::Loaded => {}
    }
    Ok(loaded.settings)
}

/// UI parts for a single command run from a terminal.
fn one_shot_ui(settings: &Settings, quiet: bool) -> UiParts {
    let preview: Box<dyn CaptureNotifier> = if quiet {
        Box::new(platform::flash_notifier())
    } else {
        Box::new(PreviewNotifier::stdout())
    };

    UiParts {
        surface: platform::main_surface(),
        overlay: platform::selection_overlay(&settings.shortcuts),
        picker: Box::new(ConsolePicker::stdio()),
        feedback: Feedback::new(preview, Box::new(platform::flash_notifier())),
        alerter: Box::new(ConsoleAlerter),
    }
}

fn run_capture(store: SettingsStore, kind: CaptureKind, quiet: bool) -> Result<()> {
    let mut settings = load_settings(&store)?;
    let ui = one_shot_ui(&settings, quiet);
    let mut orchestrator = CaptureOrchestrator::new(CaptureDependencies::default(), ui).with_store(store);

    match orchestrator.run(&CaptureRequest::new(kind, Trigger::Command), &mut settings) {
        CaptureOutcome::Captured(_) => Ok(()),
        CaptureOutcome::Cancelled => {
            println!("Capture cancelled.");
            Ok(())
        }
        CaptureOutcome::Failed(_) => bail!("Capture failed"),
    }
}

fn run_daemon(store: SettingsStore) -> Result<()> {
    let lock_dir = config::app_data_dir().unwrap_or_else(|_| {
        store
            .path()
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let _instance = match SingleInstance::acquire(&lock_dir) {
        Ok(instance) => instance,
        Err(InstanceError::AlreadyRunning) => {
            log::info!("Another daemon is running; exiting");
            platform::alerter().alert("Already running", "MyCap is already running.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to check for a running instance"),
    };

    let settings = load_settings(&store)?;

    let (tx, rx) = mpsc::channel();
    let events = Rc::new(RefCell::new(daemon::EventQueue::new(rx)));
    let picker = ConsolePicker::new(daemon::ConsoleLines::new(Rc::clone(&events)), io::stdout());

    let ui = UiParts {
        surface: platform::main_surface(),
        overlay: platform::selection_overlay(&settings.shortcuts),
        picker: Box::new(picker),
        feedback: Feedback::new(
            Box::new(PreviewNotifier::stdout()),
            Box::new(platform::flash_notifier()),
        ),
        alerter: platform::alerter(),
    };
    let orchestrator =
        CaptureOrchestrator::new(CaptureDependencies::default(), ui).with_store(store.clone());

    daemon::spawn_console_reader(tx).context("Failed to start the console reader")?;

    let mut daemon = daemon::Daemon::new(
        orchestrator,
        platform::hotkey_backend(),
        store,
        settings,
        events,
    );
    daemon.run()
}

fn list_windows(json: bool) -> Result<()> {
    let windows = list_capturable_windows(&XcapWindowSystem::new())
        .context("Failed to enumerate windows")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }

    if windows.is_empty() {
        println!("No capturable windows found.");
        return Ok(());
    }
    for window in &windows {
        let minimized = if window.minimized { " (minimized)" } else { "" };
        println!(
            "{:<12} {:<48} {}{}",
            window.handle.to_string(),
            window.title,
            window.client_rect,
            minimized
        );
    }
    Ok(())
}

fn open_folder(store: SettingsStore) -> Result<()> {
    let settings = load_settings(&store)?;
    let ui = one_shot_ui(&settings, false);
    let mut orchestrator = CaptureOrchestrator::new(CaptureDependencies::default(), ui);

    if !orchestrator.open_save_folder(&settings) {
        bail!("Could not open {}", settings.save_directory.display());
    }
    Ok(())
}

fn settings_command(store: &SettingsStore, action: SettingsCommand) -> Result<()> {
    match action {
        SettingsCommand::Path => {
            println!("{}", store.path().display());
        }
        SettingsCommand::Show => {
            let settings = load_settings(store)?;
            let text = toml::to_string_pretty(&settings).context("Failed to serialize settings")?;
            print!("{text}");
        }
        SettingsCommand::Reset => {
            store
                .reset()
                .with_context(|| format!("Failed to reset {}", store.path().display()))?;
            println!("Settings reset to defaults at {}", store.path().display());
        }
    }
    Ok(())
}
