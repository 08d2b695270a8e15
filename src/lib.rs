// SPDX-License-Identifier: GPL-3.0-only

//! qrscan - QR code scanner for the terminal
//!
//! Streams a V4L2 camera into the terminal, decodes QR codes in the live
//! feed and offers copy, share and open actions on the result.
//!
//! # Architecture
//!
//! - [`backends`]: Camera enumeration, streaming and hardware controls
//! - [`scanner`]: Scan controller, decoding and capability handling
//! - [`actions`]: Clipboard, share and open handlers
//! - [`terminal`]: Full-screen terminal UI
//! - [`config`]: User configuration handling

pub mod actions;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod i18n;
pub mod scanner;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use scanner::{DecodedResult, QrAction, QrDetection, ScanController};
