// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding
//!
//! Decoding is delegated to the `rqrr` crate. Frames are reduced to a
//! downscaled luma plane first, which is all the detector looks at.

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::constants::decode::DEFAULT_MAX_DIMENSION;
use crate::scanner::types::{FrameRegion, QrDetection};
use tracing::{debug, trace};

/// Something that finds and decodes QR codes in a frame
pub trait QrDecoder: Send + Sync {
    /// Decode every readable code in `frame`
    ///
    /// Codes that are located but fail to decode are skipped.
    fn decode(&self, frame: &CameraFrame) -> Vec<QrDetection>;
}

/// QR decoder backed by `rqrr`
///
/// Optimized for real-time use by downscaling large frames.
#[derive(Debug, Clone)]
pub struct RqrrDecoder {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for RqrrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RqrrDecoder {
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode a still image, e.g. loaded from disk
    pub fn decode_image(&self, image: &image::DynamicImage) -> Vec<QrDetection> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        let frame = CameraFrame::packed(width, height, PixelFormat::Gray8, luma.into_raw());
        self.decode(&frame)
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &CameraFrame) -> Vec<QrDetection> {
        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }

        let start = std::time::Instant::now();
        let (luma, proc_width, proc_height, scale) = downscale_luma(frame, self.max_dimension);

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            proc_width as usize,
            proc_height as usize,
            |x, y| luma[y * proc_width as usize + x],
        );
        let grids = prepared.detect_grids();

        trace!(
            proc_width,
            proc_height,
            scale,
            grids = grids.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "QR grid detection complete"
        );

        let mut detections = Vec::with_capacity(grids.len());
        for grid in grids {
            let bounds = &grid.bounds;
            let content = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(e) => {
                    debug!(error = ?e, "Failed to decode QR code");
                    continue;
                }
            };

            let min_x = bounds.iter().map(|p| p.x).min().unwrap_or(0).max(0) as f32;
            let max_x = bounds.iter().map(|p| p.x).max().unwrap_or(0).max(0) as f32;
            let min_y = bounds.iter().map(|p| p.y).min().unwrap_or(0).max(0) as f32;
            let max_y = bounds.iter().map(|p| p.y).max().unwrap_or(0).max(0) as f32;

            // Scale back to original frame coordinates
            let region = FrameRegion::from_pixels(
                (min_x * scale) as u32,
                (min_y * scale) as u32,
                ((max_x - min_x) * scale) as u32,
                ((max_y - min_y) * scale) as u32,
                frame.width,
                frame.height,
            );

            debug!(
                content_len = content.len(),
                x = region.x,
                y = region.y,
                "Decoded QR code"
            );
            detections.push(QrDetection::new(region, content));
        }

        detections
    }
}

/// Extract the luma plane, downscaled so neither side exceeds `max_dimension`
///
/// Returns (luma, width, height, scale) where `scale` maps processed pixel
/// coordinates back to frame coordinates.
fn downscale_luma(frame: &CameraFrame, max_dimension: u32) -> (Vec<u8>, u32, u32, f32) {
    let (width, height) = (frame.width, frame.height);
    let scale = if width > max_dimension || height > max_dimension {
        (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32)
    } else {
        1.0
    };

    let proc_width = ((width as f32 / scale) as u32).max(1);
    let proc_height = ((height as f32 / scale) as u32).max(1);

    let mut luma = Vec::with_capacity((proc_width * proc_height) as usize);
    for y in 0..proc_height {
        let src_y = (y as f32 * scale) as u32;
        for x in 0..proc_width {
            let src_x = (x as f32 * scale) as u32;
            luma.push(frame.luma(src_x, src_y));
        }
    }

    (luma, proc_width, proc_height, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale_keeps_small_frames() {
        let frame = CameraFrame::packed(4, 2, PixelFormat::Gray8, (0..8).collect());
        let (luma, w, h, scale) = downscale_luma(&frame, 640);
        assert_eq!((w, h), (4, 2));
        assert_eq!(scale, 1.0);
        assert_eq!(luma, (0..8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_downscale_large_frames() {
        let frame = CameraFrame::packed(8, 4, PixelFormat::Gray8, vec![7; 32]);
        let (luma, w, h, scale) = downscale_luma(&frame, 4);
        assert_eq!((w, h), (4, 2));
        assert_eq!(scale, 2.0);
        assert!(luma.iter().all(|&v| v == 7));
    }

    #[test]
    fn test_blank_frame_has_no_codes() {
        let frame = CameraFrame::packed(64, 64, PixelFormat::Gray8, vec![255; 64 * 64]);
        assert!(RqrrDecoder::new().decode(&frame).is_empty());
    }

    #[test]
    fn test_empty_frame_has_no_codes() {
        let frame = CameraFrame::packed(0, 0, PixelFormat::Gray8, Vec::new());
        assert!(RqrrDecoder::new().decode(&frame).is_empty());
    }
}
