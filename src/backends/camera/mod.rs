// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   ScanController    │
//! └──────────┬──────────┘
//!            │ open(device, format)
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← enumeration, stream acquisition
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ CameraStream Trait  │  ← frames + CameraControls
//! └──────────┬──────────┘
//!            ▼
//!        ┌──────┐
//!        │ V4L2 │  ← concrete implementation
//!        └──────┘
//! ```
//!
//! Only one stream is held at a time; dropping a stream stops capture.

pub mod types;
pub mod v4l2;
pub mod v4l2_controls;

pub use types::*;
pub use v4l2::V4l2Backend;

/// Camera controls the scanner knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Optical/digital zoom position
    ZoomAbsolute,
    /// Continuous autofocus on/off
    FocusAuto,
    /// One-shot autofocus trigger
    FocusTrigger,
    /// Auto exposure mode menu
    ExposureAuto,
}

/// Hardware-reported range of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    /// Current value, when the driver reports it
    pub current: Option<i32>,
}

/// Control access for an open stream
///
/// Queries return `None` when the control is absent or disabled; that is the
/// normal "unsupported" path, not an error.
pub trait CameraControls: Send + Sync {
    /// Query the range of a control
    fn query(&self, control: Control) -> Option<ControlRange>;

    /// Set a control value
    fn set(&self, control: Control, value: i32) -> BackendResult<()>;
}

/// An acquired camera stream
pub trait CameraStream: Send {
    /// Device this stream captures from
    fn device(&self) -> &CameraDevice;

    /// Negotiated capture format
    fn format(&self) -> &CameraFormat;

    /// Non-blocking receive of the next captured frame
    fn try_next_frame(&mut self) -> Option<CameraFrame>;

    /// Control access for the device behind this stream
    fn controls(&self) -> &dyn CameraControls;

    /// Stop capture and release the device
    ///
    /// Called before a new stream is acquired. Must be idempotent; dropping
    /// the stream has the same effect.
    fn stop(&mut self);
}

/// Camera backend trait
pub trait CameraBackend: Send {
    /// Enumerate available capture devices
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Supported capture formats of a device
    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat>;

    /// Acquire a stream from `device`
    ///
    /// `preferred` is a resolution hint; the backend picks the closest format
    /// it can deliver.
    fn open(
        &mut self,
        device: &CameraDevice,
        preferred: (u32, u32),
    ) -> BackendResult<Box<dyn CameraStream>>;
}

/// Pick the camera for a facing preference
///
/// A device reporting the requested facing wins. When no device reports a
/// facing at all, the first device stands in for the rear camera and the
/// second (if any) for the front one. Otherwise the first device is used.
pub fn select_camera(cameras: &[CameraDevice], facing: Facing) -> Option<&CameraDevice> {
    if let Some(device) = cameras.iter().find(|c| c.facing == Some(facing)) {
        return Some(device);
    }

    if cameras.iter().all(|c| c.facing.is_none()) {
        let index = match facing {
            Facing::Environment => 0,
            Facing::User => 1.min(cameras.len().saturating_sub(1)),
        };
        return cameras.get(index);
    }

    cameras.first()
}

/// Pick the capture format closest to the preferred resolution
///
/// Formats listed earlier in [`FOURCC_PREFERENCE`](crate::constants::capture::FOURCC_PREFERENCE)
/// win ties; formats outside that list are never chosen.
pub fn select_format(formats: &[CameraFormat], preferred: (u32, u32)) -> Option<CameraFormat> {
    use crate::constants::capture::FOURCC_PREFERENCE;

    let target_pixels = preferred.0 as i64 * preferred.1 as i64;

    formats
        .iter()
        .filter_map(|f| {
            let rank = FOURCC_PREFERENCE
                .iter()
                .position(|cc| cc.as_slice() == f.pixel_format.as_bytes())?;
            let diff = (f.width as i64 * f.height as i64 - target_pixels).abs();
            Some(((diff, rank), f))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, f)| f.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, facing: Option<Facing>) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: format!("/dev/{}", name),
            facing,
            device_info: None,
        }
    }

    fn format(width: u32, height: u32, fourcc: &str) -> CameraFormat {
        CameraFormat {
            width,
            height,
            framerate: None,
            pixel_format: fourcc.to_string(),
        }
    }

    #[test]
    fn test_select_camera_by_reported_facing() {
        let cameras = vec![
            device("front", Some(Facing::User)),
            device("back", Some(Facing::Environment)),
        ];
        assert_eq!(
            select_camera(&cameras, Facing::Environment).map(|c| c.name.as_str()),
            Some("back")
        );
        assert_eq!(
            select_camera(&cameras, Facing::User).map(|c| c.name.as_str()),
            Some("front")
        );
    }

    #[test]
    fn test_select_camera_by_position_when_unlabelled() {
        let cameras = vec![device("video0", None), device("video2", None)];
        assert_eq!(
            select_camera(&cameras, Facing::User).map(|c| c.name.as_str()),
            Some("video2")
        );

        let single = vec![device("video0", None)];
        assert_eq!(
            select_camera(&single, Facing::User).map(|c| c.name.as_str()),
            Some("video0")
        );
        assert!(select_camera(&[], Facing::User).is_none());
    }

    #[test]
    fn test_select_format_prefers_closest_resolution() {
        let formats = vec![
            format(1920, 1080, "MJPG"),
            format(640, 480, "MJPG"),
            format(640, 480, "YUYV"),
            format(320, 240, "H264"),
        ];
        let selected = select_format(&formats, (640, 480)).unwrap();
        assert_eq!((selected.width, selected.pixel_format.as_str()), (640, "YUYV"));
    }

    #[test]
    fn test_select_format_skips_unknown_fourcc() {
        let formats = vec![format(640, 480, "H264")];
        assert!(select_format(&formats, (640, 480)).is_none());
    }
}
