// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture backend
//!
//! Each stream owns a capture thread that dequeues mmap buffers, converts
//! them to [`CameraFrame`]s and pushes them into a bounded channel. Frames are
//! dropped when the consumer falls behind. MJPEG is decoded to RGBA on the
//! capture thread so downstream code only sees raw layouts.

use super::types::{CameraDevice, CameraFormat, CameraFrame, DeviceInfo, Facing, Framerate};
use super::v4l2_controls::V4l2Controls;
use super::{BackendResult, CameraBackend, CameraControls, CameraStream, PixelFormat};
use crate::constants::capture;
use crate::errors::CameraError;
use futures::channel::mpsc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream as _;
use v4l::prelude::*;
use v4l::video::Capture;

/// Consecutive dequeue failures after which the device is considered gone
const MAX_CONSECUTIVE_ERRORS: u32 = 100;

/// V4L2 camera backend
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut cameras = Vec::new();

        for node in v4l::context::enum_devices() {
            let path = node.path().to_string_lossy().to_string();
            let dev = match Device::with_path(&path) {
                Ok(dev) => dev,
                Err(e) => {
                    debug!(path, error = %e, "Skipping unreadable video node");
                    continue;
                }
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };

            // Metadata nodes share the card name but cannot capture
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE)
                || dev.enum_formats().map(|f| f.is_empty()).unwrap_or(true)
            {
                debug!(path, "Skipping non-capture video node");
                continue;
            }

            let name = node.name().unwrap_or_else(|| caps.card.clone());
            let facing = Facing::from_label(&name);

            cameras.push(CameraDevice {
                name,
                path,
                facing,
                device_info: Some(DeviceInfo {
                    card: caps.card,
                    driver: caps.driver,
                    bus: caps.bus,
                }),
            });
        }

        cameras.sort_by(|a, b| a.path.cmp(&b.path));
        info!(count = cameras.len(), "Enumerated V4L2 cameras");
        cameras
    }

    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat> {
        let dev = match Device::with_path(&device.path) {
            Ok(dev) => dev,
            Err(e) => {
                warn!(path = %device.path, error = %e, "Failed to open device for format query");
                return Vec::new();
            }
        };

        let mut formats = Vec::new();
        for description in dev.enum_formats().unwrap_or_default() {
            let fourcc = description.fourcc;
            let Ok(pixel_format) = fourcc.str().map(str::to_string) else {
                continue;
            };

            for size in dev.enum_framesizes(fourcc).unwrap_or_default() {
                // Stepwise sizes are reported by their maximum only
                let (width, height) = match size.size {
                    FrameSizeEnum::Discrete(d) => (d.width, d.height),
                    FrameSizeEnum::Stepwise(s) => (s.max_width, s.max_height),
                };

                let framerate = dev
                    .enum_frameintervals(fourcc, width, height)
                    .unwrap_or_default()
                    .into_iter()
                    .find_map(|interval| match interval.interval {
                        FrameIntervalEnum::Discrete(f) if f.numerator > 0 => {
                            Some(Framerate::new(f.denominator, f.numerator))
                        }
                        _ => None,
                    });

                formats.push(CameraFormat {
                    width,
                    height,
                    framerate,
                    pixel_format: pixel_format.clone(),
                });
            }
        }

        formats
    }

    fn open(
        &mut self,
        device: &CameraDevice,
        preferred: (u32, u32),
    ) -> BackendResult<Box<dyn CameraStream>> {
        let formats = self.get_formats(device);
        if formats.is_empty() {
            // Opening failed above or the node has nothing to offer; find out which
            Device::with_path(&device.path)?;
            return Err(CameraError::InvalidFormat(format!(
                "no formats reported by {}",
                device.path
            )));
        }

        let format = super::select_format(&formats, preferred).ok_or_else(|| {
            CameraError::InvalidFormat(format!("no supported pixel format on {}", device.path))
        })?;

        info!(device = %device.name, format = %format, "Opening V4L2 stream");
        let stream = V4l2Stream::start(device.clone(), format)?;
        Ok(Box::new(stream))
    }
}

/// Running V4L2 capture
pub struct V4l2Stream {
    device: CameraDevice,
    format: CameraFormat,
    controls: V4l2Controls,
    receiver: mpsc::Receiver<CameraFrame>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl V4l2Stream {
    fn start(device: CameraDevice, format: CameraFormat) -> BackendResult<Self> {
        let (sender, receiver) = mpsc::channel(capture::FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let path = device.path.clone();
            let format = format.clone();
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("v4l2-capture".to_string())
                .spawn(move || capture_loop(&path, &format, sender, ready_tx, running))
                .map_err(|e| CameraError::InitializationFailed(e.to_string()))?
        };

        match ready_rx.recv_timeout(capture::STREAM_START_TIMEOUT) {
            Ok(Ok(negotiated)) => Ok(Self {
                controls: V4l2Controls::new(device.path.clone()),
                device,
                format: negotiated,
                receiver,
                running,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                // The thread exits on its own once it sees the flag
                running.store(false, Ordering::SeqCst);
                Err(CameraError::InitializationFailed(
                    "timed out waiting for capture to start".to_string(),
                ))
            }
        }
    }
}

impl CameraStream for V4l2Stream {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn try_next_frame(&mut self) -> Option<CameraFrame> {
        self.receiver.try_recv().ok()
    }

    fn controls(&self) -> &dyn CameraControls {
        &self.controls
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(device = %self.device.path, "Capture thread panicked");
            }
            info!(device = %self.device.path, "V4L2 stream stopped");
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main capture loop running in a separate thread
fn capture_loop(
    device_path: &str,
    requested: &CameraFormat,
    mut sender: mpsc::Sender<CameraFrame>,
    ready: std::sync::mpsc::SyncSender<BackendResult<CameraFormat>>,
    running: Arc<AtomicBool>,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let (mut dev, negotiated, fourcc, stride) = match open_device(device_path, requested) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream =
        match MmapStream::with_buffers(&mut dev, Type::VideoCapture, capture::V4L2_BUFFER_COUNT) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(CameraError::from(e)));
                return;
            }
        };

    let (width, height) = (negotiated.width, negotiated.height);
    if ready.send(Ok(negotiated)).is_err() {
        // Caller gave up waiting
        return;
    }

    info!(device_path, "V4L2 capture stream started");
    let mut consecutive_errors = 0;

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                consecutive_errors = 0;
                let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);

                let Some(frame) = frame_from_buffer(buf, &fourcc.repr, width, height, stride) else {
                    if frame_num % 30 == 0 {
                        debug!(frame = frame_num, size = buf.len(), "Undecodable frame skipped");
                    }
                    continue;
                };

                if let Err(e) = sender.try_send(frame) {
                    if e.is_disconnected() {
                        break;
                    }
                    if frame_num % 30 == 0 {
                        debug!(frame = frame_num, sequence = meta.sequence, "Frame dropped (channel full)");
                    }
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!(device_path, error = %e, "Camera stopped delivering frames");
                    break;
                }
                warn!(error = %e, "Failed to dequeue frame");
                std::thread::sleep(capture::DEQUEUE_RETRY_DELAY);
            }
        }
    }

    info!(device_path, "V4L2 capture loop ended");
}

/// Open the device and negotiate the requested format
fn open_device(
    device_path: &str,
    requested: &CameraFormat,
) -> BackendResult<(Device, CameraFormat, FourCC, u32)> {
    let dev = Device::with_path(device_path)?;

    let mut bytes = [0u8; 4];
    for (dst, src) in bytes.iter_mut().zip(requested.pixel_format.bytes()) {
        *dst = src;
    }
    let fourcc = FourCC::new(&bytes);

    let mut format = dev.format()?;
    format.width = requested.width;
    format.height = requested.height;
    format.fourcc = fourcc;

    let applied = dev.set_format(&format)?;
    if applied.fourcc != fourcc {
        return Err(CameraError::InvalidFormat(format!(
            "driver refused {}, offered {}",
            requested.pixel_format, applied.fourcc
        )));
    }

    let negotiated = CameraFormat {
        width: applied.width,
        height: applied.height,
        framerate: requested.framerate,
        pixel_format: requested.pixel_format.clone(),
    };

    debug!(
        width = applied.width,
        height = applied.height,
        stride = applied.stride,
        "Set V4L2 format"
    );

    Ok((dev, negotiated, fourcc, applied.stride))
}

/// Convert a dequeued buffer into a frame
///
/// Returns `None` for unknown FourCCs, corrupt JPEG data and buffers shorter
/// than the advertised geometry.
pub fn frame_from_buffer(
    buf: &[u8],
    fourcc: &[u8; 4],
    width: u32,
    height: u32,
    stride: u32,
) -> Option<CameraFrame> {
    let format = PixelFormat::from_fourcc(fourcc)?;

    if matches!(fourcc, b"MJPG" | b"JPEG") {
        let decoded = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg).ok()?;
        let rgba = decoded.to_rgba8();
        let (w, h) = rgba.dimensions();
        return Some(CameraFrame::packed(w, h, PixelFormat::RGBA, rgba.into_raw()));
    }

    let stride = if stride > 0 {
        stride
    } else {
        width * format.bytes_per_pixel()
    };
    let plane = stride as usize * height as usize;
    let required = match format {
        PixelFormat::NV12 => plane + plane / 2,
        _ => plane,
    };
    if buf.len() < required {
        return None;
    }

    Some(CameraFrame {
        width,
        height,
        data: Arc::from(&buf[..required]),
        format,
        stride,
        captured_at: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_yuyv_buffer() {
        let buf = vec![128u8; 4 * 2 * 2];
        let frame = frame_from_buffer(&buf, b"YUYV", 4, 2, 0).unwrap();
        assert_eq!(frame.format, PixelFormat::YUYV);
        assert_eq!(frame.stride, 8);
        assert_eq!(frame.data.len(), 16);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let buf = vec![0u8; 10];
        assert!(frame_from_buffer(&buf, b"YUYV", 4, 2, 8).is_none());
    }

    #[test]
    fn test_unknown_fourcc_is_rejected() {
        assert!(frame_from_buffer(&[0; 64], b"H264", 4, 4, 0).is_none());
    }

    #[test]
    fn test_corrupt_mjpeg_is_rejected() {
        assert!(frame_from_buffer(&[0xff, 0xd8, 0x00], b"MJPG", 4, 4, 0).is_none());
    }
}
