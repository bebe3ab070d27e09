//! Terminal implementations of [`ProgressSink`] and [`UserPrompt`].

use colored::Colorize;
use std::io::{self, BufRead, Write};

use super::{ProgressSink, UpdateAnswer, UserPrompt};
use crate::config::ProxySettings;
use crate::utils::ProgressBar;

/// Progress bar on stderr.
#[derive(Clone)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Visible bar, unless progress output is disabled through the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new_percent(),
        }
    }

    /// Bar that never draws, for silent runs.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, percent: u8, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.set_position(u64::from(percent));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        self.bar.suspend(|| f());
    }
}

/// Prompts read from stdin, messages written to stderr.
#[derive(Debug, Clone)]
pub struct ConsolePrompt {
    title: String,
}

impl ConsolePrompt {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn print(&self, text: &str) {
        eprintln!("{} {}", format!("[{}]", self.title).cyan().bold(), text);
    }

    /// One trimmed line from stdin; `None` at end of input.
    fn read_answer(&self, question: &str) -> Option<String> {
        eprint!("{question} ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl UserPrompt for ConsolePrompt {
    fn show_message(&self, text: &str) {
        self.print(text);
    }

    fn ask_update(&self, text: &str, third_label: Option<&str>) -> UpdateAnswer {
        self.print(text);
        let choices = match third_label {
            Some(label) => format!("[y]es / [n]o / [t] {label}:"),
            None => "[y]es / [n]o:".to_string(),
        };

        loop {
            let Some(answer) = self.read_answer(&choices) else {
                return UpdateAnswer::No;
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return UpdateAnswer::Yes,
                "n" | "no" | "" => return UpdateAnswer::No,
                "t" if third_label.is_some() => return UpdateAnswer::Third,
                _ => {}
            }
        }
    }

    fn confirm(&self, text: &str) -> bool {
        self.print(text);
        loop {
            let Some(answer) = self.read_answer("[y/n]:") else {
                return false;
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" | "" => return false,
                _ => {}
            }
        }
    }

    fn edit_proxy(&self, current: &ProxySettings) -> Option<ProxySettings> {
        self.print("Proxy settings (leave the server empty to disable the proxy)");

        let server_hint =
            if current.server.is_empty() { String::new() } else { format!(" [{}]", current.server) };
        let server = self.read_answer(&format!("Server{server_hint}:"))?;
        let server = if server.is_empty() { current.server.clone() } else { server };
        if server.is_empty() || server == "-" {
            return Some(ProxySettings::default());
        }

        let port_hint = current.port.map(|p| format!(" [{p}]")).unwrap_or_default();
        loop {
            let port = self.read_answer(&format!("Port{port_hint}:"))?;
            if port.is_empty()
                && let Some(existing) = current.port
            {
                return Some(ProxySettings::new(server, existing));
            }
            match port.parse::<u16>() {
                Ok(port) => return Some(ProxySettings::new(server, port)),
                Err(_) => eprintln!("{}", "Port must be a number between 0 and 65535".red()),
            }
        }
    }
}
