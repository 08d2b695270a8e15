// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the scan controller, driven by a fake camera backend

use qrscan::backends::camera::types::{CameraDevice, CameraFormat, CameraFrame, Facing};
use qrscan::backends::camera::{
    BackendResult, CameraBackend, CameraControls, CameraStream, Control, ControlRange,
};
use qrscan::errors::CameraError;
use qrscan::scanner::{
    CameraState, ControllerOptions, DecodeEvent, Feedback, RqrrDecoder, ScanController,
    ScanStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

/// Shared view into what the fake backend did
#[derive(Default)]
struct Probe {
    live: AtomicUsize,
    max_live: AtomicUsize,
    opened: Mutex<Vec<String>>,
    pulses: AtomicUsize,
}

struct FakeBackend {
    cameras: Vec<CameraDevice>,
    fail_with: Option<CameraError>,
    zoom: Option<ControlRange>,
    probe: Arc<Probe>,
}

impl CameraBackend for FakeBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.cameras.clone()
    }

    fn get_formats(&self, _device: &CameraDevice) -> Vec<CameraFormat> {
        vec![format()]
    }

    fn open(
        &mut self,
        device: &CameraDevice,
        _preferred: (u32, u32),
    ) -> BackendResult<Box<dyn CameraStream>> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        let live = self.probe.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_live.fetch_max(live, Ordering::SeqCst);
        self.probe.opened.lock().unwrap().push(device.path.clone());

        Ok(Box::new(FakeStream {
            device: device.clone(),
            format: format(),
            controls: FakeControls {
                zoom: self.zoom,
                writes: Mutex::new(Vec::new()),
            },
            probe: Arc::clone(&self.probe),
            stopped: false,
        }))
    }
}

struct FakeStream {
    device: CameraDevice,
    format: CameraFormat,
    controls: FakeControls,
    probe: Arc<Probe>,
    stopped: bool,
}

impl CameraStream for FakeStream {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn try_next_frame(&mut self) -> Option<CameraFrame> {
        None
    }

    fn controls(&self) -> &dyn CameraControls {
        &self.controls
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.probe.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

struct FakeControls {
    zoom: Option<ControlRange>,
    writes: Mutex<Vec<(Control, i32)>>,
}

impl CameraControls for FakeControls {
    fn query(&self, control: Control) -> Option<ControlRange> {
        match control {
            Control::ZoomAbsolute => self.zoom,
            _ => None,
        }
    }

    fn set(&self, control: Control, value: i32) -> BackendResult<()> {
        if self.query(control).is_none() {
            return Err(CameraError::ControlFailed("unsupported".to_string()));
        }
        self.writes.lock().unwrap().push((control, value));
        Ok(())
    }
}

struct CountingFeedback(Arc<Probe>);

impl Feedback for CountingFeedback {
    fn pulse(&self) {
        self.0.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

fn format() -> CameraFormat {
    CameraFormat {
        width: 640,
        height: 480,
        framerate: None,
        pixel_format: "YUYV".to_string(),
    }
}

fn camera(path: &str, facing: Option<Facing>) -> CameraDevice {
    CameraDevice {
        name: format!("Camera {}", path),
        path: path.to_string(),
        facing,
        device_info: None,
    }
}

struct Harness {
    controller: ScanController,
    probe: Arc<Probe>,
}

fn harness_with(backend: impl FnOnce(Arc<Probe>) -> FakeBackend, options: ControllerOptions) -> Harness {
    let probe = Arc::new(Probe::default());
    let controller = ScanController::new(
        Box::new(backend(Arc::clone(&probe))),
        Arc::new(RqrrDecoder::new()),
        Handle::current(),
        Box::new(CountingFeedback(Arc::clone(&probe))),
        options,
    );
    Harness { controller, probe }
}

fn harness() -> Harness {
    harness_with(
        |probe| FakeBackend {
            cameras: vec![
                camera("/dev/video0", Some(Facing::Environment)),
                camera("/dev/video2", Some(Facing::User)),
            ],
            fail_with: None,
            zoom: None,
            probe,
        },
        ControllerOptions::default(),
    )
}

fn decode(controller: &mut ScanController, text: &str) -> bool {
    let generation = controller.generation().expect("no running session");
    controller.handle_decode(DecodeEvent::text(generation, text))
}

#[tokio::test]
async fn test_identical_decode_is_shown_once() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();

    assert!(decode(&mut h.controller, "https://example.com"));
    assert!(!decode(&mut h.controller, "https://example.com"));

    assert_eq!(h.controller.result().unwrap().text, "https://example.com");
    assert_eq!(h.probe.pulses.load(Ordering::SeqCst), 1);
    assert!(h.controller.availability().open);
}

#[tokio::test]
async fn test_only_immediately_preceding_text_is_suppressed() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();

    assert!(decode(&mut h.controller, "a"));
    assert!(decode(&mut h.controller, "b"));
    assert!(decode(&mut h.controller, "a"));
    assert_eq!(h.probe.pulses.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_plain_text_keeps_open_disabled() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();

    assert!(decode(&mut h.controller, "hello"));
    let availability = h.controller.availability();
    assert!(availability.copy);
    assert!(availability.share);
    assert!(!availability.open);
}

#[tokio::test]
async fn test_actions_disabled_without_result() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();

    let availability = h.controller.availability();
    assert!(!availability.copy && !availability.share && !availability.open);
}

#[tokio::test]
async fn test_empty_payload_is_ignored() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();

    assert!(!decode(&mut h.controller, ""));
    assert!(h.controller.result().is_none());
}

#[tokio::test]
async fn test_flip_resets_deduplication() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    assert!(decode(&mut h.controller, "hello"));

    h.controller.flip().unwrap();
    assert_eq!(h.controller.facing(), Facing::User);
    assert!(decode(&mut h.controller, "hello"));
    assert_eq!(h.probe.pulses.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_restart_keeps_deduplication() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    assert!(decode(&mut h.controller, "hello"));

    h.controller.start(Facing::Environment).unwrap();
    assert!(!decode(&mut h.controller, "hello"));
}

#[tokio::test]
async fn test_flip_opens_camera_for_new_facing() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    h.controller.flip().unwrap();

    assert_eq!(
        *h.probe.opened.lock().unwrap(),
        vec!["/dev/video0".to_string(), "/dev/video2".to_string()]
    );
}

#[tokio::test]
async fn test_prior_stream_released_before_new_one() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    h.controller.start(Facing::Environment).unwrap();
    h.controller.flip().unwrap();
    h.controller.flip().unwrap();

    assert_eq!(h.probe.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.live.load(Ordering::SeqCst), 1);

    h.controller.stop();
    assert_eq!(h.probe.live.load(Ordering::SeqCst), 0);
    assert_eq!(h.controller.state(), CameraState::Off);
}

#[tokio::test]
async fn test_events_from_old_session_are_ignored() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    let old = h.controller.generation().unwrap();

    h.controller.flip().unwrap();
    assert!(!h.controller.handle_decode(DecodeEvent::text(old, "late")));
    assert!(h.controller.result().is_none());
}

#[tokio::test]
async fn test_events_after_stop_are_ignored() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    let generation = h.controller.generation().unwrap();

    h.controller.stop();
    assert!(!h.controller.handle_decode(DecodeEvent::text(generation, "late")));
}

#[tokio::test]
async fn test_failed_start_holds_no_stream() {
    let mut h = harness_with(
        |probe| FakeBackend {
            cameras: vec![camera("/dev/video0", None)],
            fail_with: Some(CameraError::PermissionDenied("/dev/video0".to_string())),
            zoom: None,
            probe,
        },
        ControllerOptions::default(),
    );

    let error = h.controller.start(Facing::Environment).unwrap_err();
    assert!(matches!(error, CameraError::PermissionDenied(_)));
    assert_eq!(h.controller.state(), CameraState::Failed);
    assert!(h.controller.session().is_none());
    assert!(matches!(
        h.controller.status(),
        ScanStatus::CameraFailed(CameraError::PermissionDenied(_))
    ));
    assert_eq!(h.probe.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_camera_fails() {
    let mut h = harness_with(
        |probe| FakeBackend {
            cameras: Vec::new(),
            fail_with: None,
            zoom: None,
            probe,
        },
        ControllerOptions::default(),
    );

    assert_eq!(
        h.controller.start(Facing::User),
        Err(CameraError::NoCameraFound)
    );
    assert_eq!(h.controller.state(), CameraState::Failed);
}

#[tokio::test]
async fn test_single_scan_stops_camera_and_keeps_result() {
    let mut h = harness_with(
        |probe| FakeBackend {
            cameras: vec![camera("/dev/video0", None)],
            fail_with: None,
            zoom: None,
            probe,
        },
        ControllerOptions {
            stop_after_first: true,
            ..ControllerOptions::default()
        },
    );
    h.controller.start(Facing::Environment).unwrap();

    assert!(decode(&mut h.controller, "hello"));
    assert_eq!(h.controller.state(), CameraState::Off);
    assert_eq!(h.controller.status(), &ScanStatus::Found);
    assert_eq!(h.controller.result().unwrap().text, "hello");
    assert_eq!(h.probe.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pump_applies_queued_events() {
    let mut h = harness();
    h.controller.start(Facing::Environment).unwrap();
    let generation = h.controller.generation().unwrap();

    let sender = h.controller.event_sender();
    for text in ["one", "one", "two"] {
        sender.send(DecodeEvent::text(generation, text)).unwrap();
    }

    assert_eq!(h.controller.pump(), 2);
    assert_eq!(h.controller.result().unwrap().text, "two");
}

#[tokio::test]
async fn test_zoom_is_clamped_to_hardware_range() {
    let mut h = harness_with(
        |probe| FakeBackend {
            cameras: vec![camera("/dev/video0", None)],
            fail_with: None,
            zoom: Some(ControlRange {
                minimum: 100,
                maximum: 400,
                step: 10,
                default_value: 100,
                current: Some(100),
            }),
            probe,
        },
        ControllerOptions::default(),
    );
    h.controller.start(Facing::Environment).unwrap();

    assert!(h.controller.capabilities().zoom.is_some());
    assert_eq!(h.controller.apply_zoom(1000), Some(400));
    assert_eq!(h.controller.zoom_by(-1), Some(390));
    assert_eq!(h.controller.apply_zoom(-5), Some(100));
}

#[tokio::test]
async fn test_zoom_without_support_is_noop() {
    let mut h = harness();
    assert_eq!(h.controller.apply_zoom(200), None);

    h.controller.start(Facing::Environment).unwrap();
    assert!(h.controller.capabilities().zoom.is_none());
    assert_eq!(h.controller.apply_zoom(200), None);
    assert_eq!(h.controller.zoom_by(1), None);
}
