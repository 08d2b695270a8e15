// SPDX-License-Identifier: GPL-3.0-only

//! Haptic-style feedback when a new code is accepted
//!
//! Terminals cannot vibrate; the bell is the closest equivalent.

use std::io::Write;
use tracing::debug;

/// Feedback sink for accepted scans
pub trait Feedback: Send {
    /// Signal that a new code was accepted
    fn pulse(&self);
}

/// Rings the terminal bell
#[derive(Debug, Default)]
pub struct TerminalBell;

impl Feedback for TerminalBell {
    fn pulse(&self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            debug!(error = %e, "Failed to ring terminal bell");
        }
    }
}

/// Feedback disabled
#[derive(Debug, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn pulse(&self) {}
}
