// SPDX-License-Identifier: GPL-3.0-only

//! QR scanning core
//!
//! ```text
//! CameraStream ──frames──▶ ScanSession ──sampled──▶ DecodeWorker
//!                               ▲                        │
//!                               │                 DecodeEvent{generation}
//!                               │                        ▼
//!                         ScanController ◀──────── event channel
//!                               │
//!                  result, dedup, capabilities, feedback
//! ```
//!
//! - [`controller`]: camera lifecycle, result and deduplication
//! - [`capabilities`]: best-effort zoom, focus and exposure
//! - [`decoder`]: QR decoding via `rqrr`
//! - [`worker`]: sampling and background decoding
//! - [`types`]: decoded results and payload classification

pub mod capabilities;
pub mod controller;
pub mod decoder;
pub mod feedback;
pub mod session;
pub mod types;
pub mod worker;

pub use capabilities::{CapabilityLayer, FocusHint, StreamCapabilities, ZoomCapability};
pub use controller::{CameraState, ControllerOptions, ScanController, ScanStatus};
pub use decoder::{QrDecoder, RqrrDecoder};
pub use feedback::{Feedback, NoFeedback, TerminalBell};
pub use session::ScanSession;
pub use types::{ActionAvailability, DecodedResult, FrameRegion, QrAction, QrDetection};
pub use worker::{DecodeEvent, DecodeReceiver, DecodeSender, DecodeWorker, decode_channel};
