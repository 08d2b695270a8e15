// SPDX-License-Identifier: GPL-3.0-only

//! A single camera scan session
//!
//! Owns the camera stream and the decode worker bound to it. Dropping the
//! session stops both, which releases the device.

use super::worker::DecodeWorker;
use crate::backends::camera::types::{CameraDevice, CameraFormat, CameraFrame, Facing};
use crate::backends::camera::{CameraControls, CameraStream};
use std::sync::Arc;
use tracing::info;

pub struct ScanSession {
    generation: u64,
    facing: Facing,
    stream: Box<dyn CameraStream>,
    worker: DecodeWorker,
    latest_frame: Option<Arc<CameraFrame>>,
}

impl ScanSession {
    pub fn new(
        generation: u64,
        facing: Facing,
        stream: Box<dyn CameraStream>,
        worker: DecodeWorker,
    ) -> Self {
        info!(
            generation,
            %facing,
            device = %stream.device().name,
            format = %stream.format(),
            "Scan session started"
        );
        Self {
            generation,
            facing,
            stream,
            worker,
            latest_frame: None,
        }
    }

    /// Drain captured frames, keep the newest and offer it to the decoder
    ///
    /// Returns the newest frame if any arrived since the last call.
    pub fn poll_frame(&mut self) -> Option<Arc<CameraFrame>> {
        let mut newest = None;
        while let Some(frame) = self.stream.try_next_frame() {
            newest = Some(frame);
        }

        let frame = Arc::new(newest?);
        self.worker.submit(Arc::clone(&frame));
        self.latest_frame = Some(Arc::clone(&frame));
        Some(frame)
    }

    /// Most recent frame seen by [`poll_frame`](Self::poll_frame)
    pub fn latest_frame(&self) -> Option<&Arc<CameraFrame>> {
        self.latest_frame.as_ref()
    }

    pub fn controls(&self) -> &dyn CameraControls {
        self.stream.controls()
    }

    pub fn device(&self) -> &CameraDevice {
        self.stream.device()
    }

    pub fn format(&self) -> &CameraFormat {
        self.stream.format()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Stop decoding and release the camera
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.worker.stop();
        self.stream.stop();
        info!(generation = self.generation, "Scan session closed");
    }
}
