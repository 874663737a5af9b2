//! Ways of choosing one window out of an enumerated snapshot.

use std::io::{self, BufRead, Write};

use super::{WindowDescriptor, WindowHandle};

/// Chooses a capture target from a freshly enumerated window list.
///
/// Returning `None` means the user backed out.
pub trait WindowPicker {
    fn pick(&mut self, windows: &[WindowDescriptor]) -> Option<WindowHandle>;
}

/// Picks the first window whose title contains a needle (case-insensitive).
#[derive(Debug, Clone)]
pub struct TitlePicker {
    needle: String,
}

impl TitlePicker {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_lowercase(),
        }
    }
}

impl WindowPicker for TitlePicker {
    fn pick(&mut self, windows: &[WindowDescriptor]) -> Option<WindowHandle> {
        windows
            .iter()
            .find(|w| w.title.to_lowercase().contains(&self.needle))
            .map(|w| w.handle)
    }
}

/// Numbered list on an output stream, answer read from an input stream.
pub struct ConsolePicker<R, W> {
    input: R,
    output: W,
}

impl ConsolePicker<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePicker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, windows: &[WindowDescriptor]) -> io::Result<Option<WindowHandle>> {
        if windows.is_empty() {
            writeln!(self.output, "No capturable windows found.")?;
            return Ok(None);
        }

        writeln!(self.output, "Select a window to capture:")?;
        for (index, window) in windows.iter().enumerate() {
            let app = if window.app_name.is_empty() {
                String::new()
            } else {
                format!(" [{}]", window.app_name)
            };
            writeln!(self.output, "  {:>2}. {}{}", index + 1, window.title, app)?;
        }

        loop {
            write!(self.output, "Window number (Enter or q to cancel): ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }

            let answer = line.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
                return Ok(None);
            }

            match answer.parse::<usize>() {
                Ok(n) if (1..=windows.len()).contains(&n) => {
                    return Ok(Some(windows[n - 1].handle));
                }
                _ => writeln!(self.output, "Enter a number between 1 and {}.", windows.len())?,
            }
        }
    }
}

impl<R: BufRead, W: Write> WindowPicker for ConsolePicker<R, W> {
    fn pick(&mut self, windows: &[WindowDescriptor]) -> Option<WindowHandle> {
        match self.prompt(windows) {
            Ok(choice) => choice,
            Err(err) => {
                log::warn!("Window picker I/O failed: {}", err);
                None
            }
        }
    }
}
