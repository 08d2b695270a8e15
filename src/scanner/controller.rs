// SPDX-License-Identifier: GPL-3.0-only

//! Scan controller
//!
//! Owns the camera lifecycle, the decoded result and the deduplication
//! memory. All state lives here rather than in globals; the UI drives it by
//! calling methods and reading the state back.
//!
//! Camera: `Off` → `Starting` → `Live` | `Failed`. Result: absent/present.

use super::capabilities::{CapabilityLayer, FocusHint, StreamCapabilities};
use super::decoder::QrDecoder;
use super::feedback::Feedback;
use super::session::ScanSession;
use super::types::{ActionAvailability, DecodedResult};
use super::worker::{DecodeEvent, DecodeReceiver, DecodeSender, DecodeWorker, decode_channel};
use crate::backends::camera::types::{CameraFrame, Facing};
use crate::backends::camera::{CameraBackend, select_camera};
use crate::config::Config;
use crate::errors::CameraError;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Camera lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraState {
    #[default]
    Off,
    Starting,
    Live,
    Failed,
}

/// Status line content, localized by the UI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanStatus {
    /// Nothing started yet
    #[default]
    Idle,
    /// Camera running, waiting for a code
    CameraOn,
    /// Camera could not be acquired
    CameraFailed(CameraError),
    /// A new code was accepted
    Found,
    /// Camera stopped by the user or after a single scan
    Stopped,
}

/// Tunables for the controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Minimum spacing between decoded frames
    pub scan_interval: Duration,
    /// Capture resolution hint
    pub preferred_format: (u32, u32),
    /// Hardware zoom steps per zoom key press
    pub zoom_step_multiplier: u32,
    /// Stop the camera after the first accepted code
    pub stop_after_first: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            scan_interval: config.scan_interval(),
            preferred_format: (config.preferred_format.width, config.preferred_format.height),
            zoom_step_multiplier: config.zoom_step_multiplier,
            stop_after_first: false,
        }
    }
}

pub struct ScanController {
    backend: Box<dyn CameraBackend>,
    decoder: Arc<dyn QrDecoder>,
    runtime: Handle,
    feedback: Box<dyn Feedback>,
    options: ControllerOptions,
    events_tx: DecodeSender,
    events_rx: DecodeReceiver,
    session: Option<ScanSession>,
    next_generation: u64,
    facing: Facing,
    state: CameraState,
    last_accepted: Option<String>,
    result: Option<DecodedResult>,
    capabilities: CapabilityLayer,
    status: ScanStatus,
}

impl ScanController {
    pub fn new(
        backend: Box<dyn CameraBackend>,
        decoder: Arc<dyn QrDecoder>,
        runtime: Handle,
        feedback: Box<dyn Feedback>,
        options: ControllerOptions,
    ) -> Self {
        let (events_tx, events_rx) = decode_channel();
        Self {
            backend,
            decoder,
            runtime,
            feedback,
            capabilities: CapabilityLayer::new(options.zoom_step_multiplier),
            options,
            events_tx,
            events_rx,
            session: None,
            next_generation: 1,
            facing: Facing::default(),
            state: CameraState::Off,
            last_accepted: None,
            result: None,
            status: ScanStatus::Idle,
        }
    }

    /// Start scanning with the camera facing `facing`
    ///
    /// Any running session is torn down before the new camera is acquired.
    /// On failure the controller is left in `Failed` holding no stream.
    pub fn start(&mut self, facing: Facing) -> Result<(), CameraError> {
        self.facing = facing;
        self.state = CameraState::Starting;
        self.release_session();

        let cameras = self.backend.enumerate_cameras();
        let Some(device) = select_camera(&cameras, facing).cloned() else {
            return Err(self.fail(CameraError::NoCameraFound));
        };

        let stream = match self.backend.open(&device, self.options.preferred_format) {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let worker = DecodeWorker::start(
            &self.runtime,
            Arc::clone(&self.decoder),
            generation,
            self.events_tx.clone(),
            self.options.scan_interval,
        );

        self.capabilities.refresh(stream.controls());
        self.session = Some(ScanSession::new(generation, facing, stream, worker));
        self.state = CameraState::Live;
        self.status = ScanStatus::CameraOn;
        Ok(())
    }

    /// Switch to the other facing direction and restart
    ///
    /// The deduplication memory is cleared, so the next decode counts as new
    /// even if it repeats the current result.
    pub fn flip(&mut self) -> Result<(), CameraError> {
        let facing = self.facing.flipped();
        info!(from = %self.facing, to = %facing, "Flipping camera");
        self.last_accepted = None;
        self.start(facing)
    }

    /// Stop scanning and release the camera; the result stays visible
    pub fn stop(&mut self) {
        self.release_session();
        self.capabilities.clear();
        self.state = CameraState::Off;
        self.status = ScanStatus::Stopped;
    }

    /// Apply a decode event
    ///
    /// Returns true when the event replaced the displayed result. Empty
    /// payloads, repeats of the last accepted text and events from a session
    /// that is no longer running are ignored.
    pub fn handle_decode(&mut self, event: DecodeEvent) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if session.generation() != event.generation {
            debug!(
                event_generation = event.generation,
                current = session.generation(),
                "Dropping decode event from old session"
            );
            return false;
        }

        let text = &event.detection.content;
        if text.is_empty() || self.last_accepted.as_deref() == Some(text.as_str()) {
            return false;
        }

        info!(kind = event.detection.action.kind_label(), "New code accepted");
        self.last_accepted = Some(text.clone());
        self.result = Some(DecodedResult::from_detection(event.detection));
        self.status = ScanStatus::Found;
        self.feedback.pulse();

        if let Some(session) = &self.session {
            self.capabilities.refresh(session.controls());
        }

        if self.options.stop_after_first {
            self.stop();
            self.status = ScanStatus::Found;
        }

        true
    }

    /// Apply every pending decode event; returns how many were accepted
    pub fn pump(&mut self) -> usize {
        let mut accepted = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.handle_decode(event) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Pull the newest camera frame and feed the decoder
    pub fn poll_frame(&mut self) -> Option<Arc<CameraFrame>> {
        self.session.as_mut()?.poll_frame()
    }

    /// Most recent frame for the preview
    pub fn latest_frame(&self) -> Option<&Arc<CameraFrame>> {
        self.session.as_ref()?.latest_frame()
    }

    /// Best-effort zoom; `None` when unsupported, rejected or no camera runs
    pub fn apply_zoom(&mut self, value: i32) -> Option<i32> {
        let session = self.session.as_ref()?;
        self.capabilities.apply_zoom(session.controls(), value)
    }

    /// Zoom in (positive) or out (negative) by whole steps
    pub fn zoom_by(&mut self, steps: i32) -> Option<i32> {
        let session = self.session.as_ref()?;
        self.capabilities.zoom_by(session.controls(), steps)
    }

    /// Best-effort focus hint at normalized frame coordinates
    pub fn focus_at(&self, x: f32, y: f32) -> FocusHint {
        match &self.session {
            Some(session) => self.capabilities.focus_at(session.controls(), x, y),
            None => FocusHint::Ignored,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn result(&self) -> Option<&DecodedResult> {
        self.result.as_ref()
    }

    pub fn availability(&self) -> ActionAvailability {
        ActionAvailability::for_result(self.result.as_ref())
    }

    pub fn capabilities(&self) -> &StreamCapabilities {
        self.capabilities.capabilities()
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    /// Generation of the running session
    pub fn generation(&self) -> Option<u64> {
        self.session.as_ref().map(ScanSession::generation)
    }

    /// Sender for decode events, e.g. to inject results from another source
    pub fn event_sender(&self) -> DecodeSender {
        self.events_tx.clone()
    }

    fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    fn fail(&mut self, error: CameraError) -> CameraError {
        warn!(error = %error, facing = %self.facing, "Camera failed to start");
        self.release_session();
        self.capabilities.clear();
        self.state = CameraState::Failed;
        self.status = ScanStatus::CameraFailed(error.clone());
        error
    }
}
