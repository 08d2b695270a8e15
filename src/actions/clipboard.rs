// SPDX-License-Identifier: GPL-3.0-only

//! Clipboard writers
//!
//! The system clipboard is reached through the usual helper binaries. When
//! none of them works (no display server, helpers missing, ssh session) the
//! text is pushed through the terminal itself with an OSC 52 sequence.

use crate::errors::ActionError;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Something that can put text on the clipboard
pub trait Clipboard: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    fn write(&self, text: &str) -> Result<(), ActionError>;
}

/// A clipboard helper program and the arguments that make it read stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn run(&self, text: &str) -> Result<(), String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("{}: {}", self.program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| format!("{}: {}", self.program, e))?;
        }

        let status = child
            .wait()
            .map_err(|e| format!("{}: {}", self.program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.program, status))
        }
    }
}

/// System clipboard through `wl-copy`, `xclip` or `xsel`
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    commands: Vec<ClipboardCommand>,
}

impl SystemClipboard {
    /// Helpers ordered for the current session type
    pub fn detect() -> Self {
        let wl_copy = ClipboardCommand::new("wl-copy", &[]);
        let xclip = ClipboardCommand::new("xclip", &["-selection", "clipboard"]);
        let xsel = ClipboardCommand::new("xsel", &["--clipboard", "--input"]);

        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some()
            || std::env::var("XDG_SESSION_TYPE").is_ok_and(|t| t == "wayland");

        let commands = if wayland {
            vec![wl_copy, xclip, xsel]
        } else {
            vec![xclip, xsel, wl_copy]
        };
        debug!(
            helpers = ?commands.iter().map(|c| c.program.as_str()).collect::<Vec<_>>(),
            "Clipboard helpers"
        );
        Self { commands }
    }

    pub fn with_commands(commands: Vec<ClipboardCommand>) -> Self {
        Self { commands }
    }
}

impl Clipboard for SystemClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn write(&self, text: &str) -> Result<(), ActionError> {
        let mut failures = Vec::new();
        for command in &self.commands {
            match command.run(text) {
                Ok(()) => {
                    info!(helper = %command.program, "Copied text to clipboard");
                    return Ok(());
                }
                Err(e) => {
                    debug!(error = %e, "Clipboard helper failed");
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            failures.push("no clipboard helper configured".to_string());
        }
        Err(ActionError::ClipboardFailed(failures.join("; ")))
    }
}

/// Copy through the terminal emulator with an OSC 52 escape sequence
#[derive(Debug, Default)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    /// The escape sequence that sets the clipboard to `text`
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

impl Clipboard for Osc52Clipboard {
    fn name(&self) -> &str {
        "osc52"
    }

    fn write(&self, text: &str) -> Result<(), ActionError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(Self::sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| ActionError::ClipboardFailed(e.to_string()))?;
        info!("Copied text via terminal escape sequence");
        Ok(())
    }
}
