// SPDX-License-Identifier: GPL-3.0-only

//! Hardware backends
//!
//! - [`camera`]: V4L2 camera enumeration, frame capture and controls

pub mod camera;
