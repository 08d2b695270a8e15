// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, CameraError>;

/// Which way a camera points relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl Facing {
    /// The opposite direction
    pub fn flipped(self) -> Self {
        match self {
            Facing::Environment => Facing::User,
            Facing::User => Facing::Environment,
        }
    }

    /// Guess the facing from a device name or location property
    ///
    /// Returns `None` for external cameras and names that carry no hint.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if ["front", "user", "selfie"].iter().any(|k| label.contains(k)) {
            Some(Facing::User)
        } else if ["back", "rear", "world", "environment"]
            .iter()
            .any(|k| label.contains(k))
        {
            Some(Facing::Environment)
        } else {
            None
        }
    }

    /// Front cameras are shown mirrored
    pub fn is_mirrored(self) -> bool {
        self == Facing::User
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Environment => write!(f, "environment"),
            Facing::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" | "back" | "rear" => Ok(Facing::Environment),
            "user" | "front" => Ok(Facing::User),
            other => Err(format!("unknown facing direction: {}", other)),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Bus info (e.g. usb-0000:00:14.0-5)
    pub bus: String,
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                    // Capture node, e.g. /dev/video0
    pub facing: Option<Facing>,          // None when the hardware does not say
    pub device_info: Option<DeviceInfo>, // V4L2 querycap result
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

/// Camera format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV")
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.framerate {
            Some(fps) => write!(
                f,
                "{}x{} {} @ {}fps",
                self.width, self.height, self.pixel_format, fps
            ),
            None => write!(f, "{}x{} {}", self.width, self.height, self.pixel_format),
        }
    }
}

/// Pixel layout of frames handed out by a stream
///
/// MJPEG is decoded to RGBA on the capture thread, so compressed formats never
/// reach consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 4 bytes per pixel
    RGBA,
    /// RGB24 - 3 bytes per pixel
    RGB24,
    /// Gray8 - single luma channel
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1)
    UYVY,
    /// NV12 - Y plane followed by interleaved UV at half resolution
    NV12,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to the layout it is delivered in
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"YUYV" => Some(Self::YUYV),
            b"UYVY" => Some(Self::UYVY),
            b"NV12" => Some(Self::NV12),
            b"GREY" => Some(Self::Gray8),
            b"RGB3" => Some(Self::RGB24),
            b"MJPG" | b"JPEG" => Some(Self::RGBA),
            _ => None,
        }
    }

    /// Bytes per pixel in the main plane
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA => 4,
            Self::RGB24 => 3,
            Self::YUYV | Self::UYVY => 2,
            Self::Gray8 | Self::NV12 => 1,
        }
    }
}

/// A single captured frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride of the main plane in bytes
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame with a tightly packed stride
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: Arc::from(data),
            format,
            captured_at: Instant::now(),
        }
    }

    /// Luma of the pixel at (x, y); coordinates are clamped to the frame
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let row = (y * self.stride) as usize;
        let data = &self.data;

        match self.format {
            PixelFormat::Gray8 | PixelFormat::NV12 => data.get(row + x as usize).copied(),
            PixelFormat::YUYV => data.get(row + x as usize * 2).copied(),
            PixelFormat::UYVY => data.get(row + x as usize * 2 + 1).copied(),
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                let idx = row + (x * self.format.bytes_per_pixel()) as usize;
                match data.get(idx..idx + 3) {
                    Some(&[r, g, b]) => Some(rgb_to_luma(r, g, b)),
                    _ => None,
                }
            }
        }
        .unwrap_or(0)
    }

    /// RGB of the pixel at (x, y); coordinates are clamped to the frame
    pub fn rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                let idx = (y * self.stride + x * self.format.bytes_per_pixel()) as usize;
                match data.get(idx..idx + 3) {
                    Some(&[r, g, b]) => (r, g, b),
                    _ => (0, 0, 0),
                }
            }
            PixelFormat::Gray8 => {
                let v = self.luma(x, y);
                (v, v, v)
            }
            PixelFormat::NV12 => {
                let luma = self.luma(x, y);
                // UV plane directly follows the Y plane
                let uv_offset = (self.stride * self.height) as usize;
                let uv_idx = uv_offset + (y / 2 * self.stride) as usize + (x & !1) as usize;
                match data.get(uv_idx..uv_idx + 2) {
                    Some(&[u, v]) => yuv_to_rgb(luma, u, v),
                    _ => (luma, luma, luma),
                }
            }
            PixelFormat::YUYV | PixelFormat::UYVY => {
                // Two pixels share chroma
                let base = (y * self.stride) as usize + (x & !1) as usize * 2;
                let Some(&[b0, b1, b2, b3]) = data.get(base..base + 4) else {
                    return (0, 0, 0);
                };
                let odd = x & 1 == 1;
                if self.format == PixelFormat::YUYV {
                    yuv_to_rgb(if odd { b2 } else { b0 }, b1, b3)
                } else {
                    yuv_to_rgb(if odd { b3 } else { b1 }, b0, b2)
                }
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_flip_round_trips() {
        assert_eq!(Facing::Environment.flipped(), Facing::User);
        assert_eq!(Facing::User.flipped().flipped(), Facing::User);
    }

    #[test]
    fn test_facing_from_label() {
        assert_eq!(Facing::from_label("Front Camera"), Some(Facing::User));
        assert_eq!(Facing::from_label("rear"), Some(Facing::Environment));
        assert_eq!(Facing::from_label("HD Pro Webcam C920"), None);
    }

    #[test]
    fn test_yuyv_sampling() {
        // Two pixels: Y0=16, U=128, Y1=235, V=128 -> black and white
        let frame = CameraFrame::packed(2, 1, PixelFormat::YUYV, vec![16, 128, 235, 128]);
        assert_eq!(frame.luma(0, 0), 16);
        assert_eq!(frame.luma(1, 0), 235);
        assert_eq!(frame.rgb(1, 0), (235, 235, 235));
    }

    #[test]
    fn test_rgba_luma_and_clamping() {
        let frame = CameraFrame::packed(1, 1, PixelFormat::RGBA, vec![255, 255, 255, 255]);
        assert_eq!(frame.luma(5, 5), 255);
        assert_eq!(frame.rgb(0, 0), (255, 255, 255));
    }

    #[test]
    fn test_short_buffer_reads_as_black() {
        let frame = CameraFrame::packed(4, 4, PixelFormat::Gray8, vec![200; 3]);
        assert_eq!(frame.luma(0, 0), 200);
        assert_eq!(frame.luma(3, 3), 0);
    }
}
