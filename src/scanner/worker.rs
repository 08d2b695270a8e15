// SPDX-License-Identifier: GPL-3.0-only

//! Background decode worker
//!
//! Frames are sampled at a fixed interval and handed to a tokio task, which
//! runs the CPU-heavy decoder on the blocking pool and reports every decoded
//! code as a [`DecodeEvent`]. At most one frame waits for the decoder; frames
//! offered while it is busy are skipped.

use super::decoder::QrDecoder;
use super::types::{FrameRegion, QrDetection};
use crate::backends::camera::types::CameraFrame;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A decoded code, tagged with the session that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeEvent {
    /// Generation of the scan session whose stream the frame came from
    pub generation: u64,
    pub detection: QrDetection,
}

impl DecodeEvent {
    /// Event carrying bare text without a known location
    pub fn text(generation: u64, text: impl Into<String>) -> Self {
        Self {
            generation,
            detection: QrDetection::new(FrameRegion::full(), text.into()),
        }
    }
}

pub type DecodeSender = mpsc::UnboundedSender<DecodeEvent>;
pub type DecodeReceiver = mpsc::UnboundedReceiver<DecodeEvent>;

/// Create the channel decode events travel on
pub fn decode_channel() -> (DecodeSender, DecodeReceiver) {
    mpsc::unbounded_channel()
}

/// Decode task bound to one scan session
pub struct DecodeWorker {
    frames: mpsc::Sender<Arc<CameraFrame>>,
    task: Option<JoinHandle<()>>,
    interval: Duration,
    last_submit: Option<Instant>,
    generation: u64,
}

impl DecodeWorker {
    /// Spawn the worker on `runtime`
    pub fn start(
        runtime: &Handle,
        decoder: Arc<dyn QrDecoder>,
        generation: u64,
        events: DecodeSender,
        interval: Duration,
    ) -> Self {
        let (frames, mut frame_rx) = mpsc::channel::<Arc<CameraFrame>>(1);

        let task = runtime.spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let decoder = Arc::clone(&decoder);
                let detections = tokio::task::spawn_blocking(move || decoder.decode(&frame))
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "QR decode task panicked");
                        Vec::new()
                    });

                for detection in detections {
                    if events.send(DecodeEvent { generation, detection }).is_err() {
                        debug!(generation, "Decode event receiver closed");
                        return;
                    }
                }
            }
        });

        debug!(generation, interval_ms = interval.as_millis(), "Decode worker started");

        Self {
            frames,
            task: Some(task),
            interval,
            last_submit: None,
            generation,
        }
    }

    /// Offer a frame to the decoder
    ///
    /// Returns true when the frame was queued. Frames arriving sooner than
    /// the sampling interval, or while the decoder is busy, are skipped.
    pub fn submit(&mut self, frame: Arc<CameraFrame>) -> bool {
        if self.task.is_none() {
            return false;
        }
        if let Some(last) = self.last_submit
            && last.elapsed() < self.interval
        {
            return false;
        }

        match self.frames.try_send(frame) {
            Ok(()) => {
                self.last_submit = Some(Instant::now());
                true
            }
            Err(_) => false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop decoding; pending frames are discarded
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(generation = self.generation, "Decode worker stopped");
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    /// Decodes every frame to a fixed text
    struct FixedDecoder(&'static str);

    impl QrDecoder for FixedDecoder {
        fn decode(&self, _frame: &CameraFrame) -> Vec<QrDetection> {
            vec![QrDetection::new(FrameRegion::full(), self.0.to_string())]
        }
    }

    fn frame() -> Arc<CameraFrame> {
        Arc::new(CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0; 4]))
    }

    #[tokio::test]
    async fn test_worker_emits_tagged_events() {
        let (tx, mut rx) = decode_channel();
        let mut worker = DecodeWorker::start(
            &Handle::current(),
            Arc::new(FixedDecoder("hello")),
            7,
            tx,
            Duration::ZERO,
        );

        assert!(worker.submit(frame()));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, 7);
        assert_eq!(event.detection.content, "hello");
        assert!(worker.is_running());
    }

    #[tokio::test]
    async fn test_submit_respects_interval() {
        let (tx, _rx) = decode_channel();
        let mut worker = DecodeWorker::start(
            &Handle::current(),
            Arc::new(FixedDecoder("x")),
            1,
            tx,
            Duration::from_secs(60),
        );

        assert!(worker.submit(frame()));
        assert!(!worker.submit(frame()));
    }

    #[tokio::test]
    async fn test_stopped_worker_rejects_frames() {
        let (tx, _rx) = decode_channel();
        let mut worker = DecodeWorker::start(
            &Handle::current(),
            Arc::new(FixedDecoder("x")),
            1,
            tx,
            Duration::ZERO,
        );

        worker.stop();
        assert!(!worker.is_running());
        assert!(!worker.submit(frame()));
    }
}
