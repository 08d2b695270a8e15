// SPDX-License-Identifier: GPL-3.0-only

//! Non-interactive commands
//!
//! - Listing available cameras
//! - Decoding QR codes from an image file

use qrscan::backends::camera::{CameraBackend, V4l2Backend};
use qrscan::config::Config;
use qrscan::errors::AppError;
use qrscan::scanner::RqrrDecoder;
use std::path::Path;

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = V4l2Backend::new();
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let last_used = config.last_camera_path.as_deref() == Some(camera.path.as_str());
        println!(
            "  [{}] {}{}",
            index,
            camera.name,
            if last_used { " (last used)" } else { "" }
        );
        println!("      Device: {}", camera.path);
        if let Some(facing) = camera.facing {
            println!("      Facing: {}", facing);
        }

        let formats = backend.get_formats(camera);
        if !formats.is_empty() {
            // Group formats by resolution and show best framerate
            let mut resolutions: Vec<(u32, u32, u32)> = Vec::new();
            for format in &formats {
                let fps = format.framerate.map(|f| f.as_int()).unwrap_or(30);
                if let Some(existing) = resolutions
                    .iter_mut()
                    .find(|(w, h, _)| *w == format.width && *h == format.height)
                {
                    existing.2 = existing.2.max(fps);
                } else {
                    resolutions.push((format.width, format.height, fps));
                }
            }

            // Smallest first; scanning wants modest resolutions
            resolutions.sort_by_key(|(w, h, _)| w * h);

            let res_strs: Vec<String> = resolutions
                .iter()
                .take(4)
                .map(|(w, h, fps)| format!("{}x{}@{}fps", w, h, fps))
                .collect();

            println!("      Formats: {}", res_strs.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Decode every QR code in an image file and print its text
pub fn decode_image(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::open(path).map_err(AppError::from)?;
    let decoder = RqrrDecoder::with_max_dimension(config.max_decode_dimension);
    let detections = decoder.decode_image(&image);

    if detections.is_empty() {
        return Err(format!("No QR code found in {}", path.display()).into());
    }

    for detection in detections {
        println!("{}", detection.content);
    }

    Ok(())
}
