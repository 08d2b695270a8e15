// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use qrscan::backends::camera::types::PixelFormat;
use qrscan::constants::{capture, decode};

#[test]
fn test_fourcc_preference_is_decodable() {
    // Every preferred FourCC must map to a pixel format the decoder can read
    for fourcc in capture::FOURCC_PREFERENCE {
        assert!(
            PixelFormat::from_fourcc(fourcc).is_some(),
            "FourCC {:?} has no pixel format",
            String::from_utf8_lossy(fourcc)
        );
    }
}

#[test]
fn test_default_resolution_fits_decoder() {
    // Default capture should not need downscaling before decoding
    assert!(capture::DEFAULT_WIDTH <= decode::DEFAULT_MAX_DIMENSION);
    assert!(capture::DEFAULT_HEIGHT <= decode::DEFAULT_MAX_DIMENSION);
}

#[test]
fn test_scan_interval_is_interactive() {
    assert!(decode::DEFAULT_SCAN_INTERVAL.as_millis() > 0);
    assert!(decode::DEFAULT_SCAN_INTERVAL.as_millis() < 1000);
}
