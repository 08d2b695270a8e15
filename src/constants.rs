// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application name used for config and log directories
pub const APP_NAME: &str = "qrscan";

/// Capture timing and buffering
pub mod capture {
    use super::Duration;

    /// Number of mmap buffers requested from the V4L2 driver
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Frames buffered between the capture thread and the UI loop
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// How long `start` waits for the capture thread to report readiness
    pub const STREAM_START_TIMEOUT: Duration = Duration::from_secs(5);

    /// Back-off after a failed dequeue before trying again
    pub const DEQUEUE_RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Preferred preview resolution; high resolutions only slow the decoder down
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// FourCC preference order when negotiating a capture format
    pub const FOURCC_PREFERENCE: [&[u8; 4]; 5] = [b"YUYV", b"MJPG", b"NV12", b"GREY", b"RGB3"];
}

/// Decoder defaults
pub mod decode {
    use super::Duration;

    /// Minimum spacing between frames handed to the decoder
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(150);

    /// Frames are downscaled so neither side exceeds this before decoding
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;
}

/// Terminal UI timing
pub mod ui {
    use super::Duration;

    /// Input poll timeout, roughly one frame at 60 Hz
    pub const INPUT_POLL: Duration = Duration::from_millis(16);

    /// Width of the zoom slider gauge in cells
    pub const ZOOM_GAUGE_WIDTH: u16 = 20;

    /// How long the outline around a decoded code stays visible
    pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(1500);
}
