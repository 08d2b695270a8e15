// SPDX-License-Identifier: GPL-3.0-only

//! Camera capability layer
//!
//! Everything here is advisory. A control the hardware does not expose shows
//! up as `None` and the matching operation does nothing; a value the driver
//! rejects is logged and dropped.

use crate::backends::camera::v4l2_controls::{
    V4L2_EXPOSURE_APERTURE_PRIORITY, V4L2_EXPOSURE_AUTO, V4L2_EXPOSURE_MANUAL,
};
use crate::backends::camera::{CameraControls, Control};
use tracing::{debug, info};

/// Zoom range reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomCapability {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub current: i32,
}

impl ZoomCapability {
    /// Clamp `value` into range and snap it onto the step grid
    pub fn normalize(&self, value: i32) -> i32 {
        let (min, max) = (i64::from(self.min), i64::from(self.max));
        let step = i64::from(self.step.max(1));
        let clamped = i64::from(value).clamp(min, max);
        let snapped = min + ((clamped - min) + step / 2) / step * step;
        // Within [min, max], so it fits back into i32
        snapped.min(max) as i32
    }

    /// Position of the current value within the range, 0.0 to 1.0
    pub fn fraction(&self) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        (f64::from(self.current) - f64::from(self.min)) / (f64::from(self.max) - f64::from(self.min))
    }
}

/// Focus modes the hardware supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusCapability {
    /// Continuous autofocus can be switched on
    pub continuous: bool,
    /// A one-shot autofocus run can be triggered
    pub single_shot: bool,
}

/// Exposure modes the hardware supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExposureCapability {
    /// Menu value selecting automatic exposure, if any
    pub continuous_value: Option<i32>,
    /// Manual exposure is offered
    pub manual: bool,
}

/// Capabilities of the active stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamCapabilities {
    pub zoom: Option<ZoomCapability>,
    pub focus: Option<FocusCapability>,
    pub exposure: Option<ExposureCapability>,
}

impl StreamCapabilities {
    /// Query the hardware behind `controls`
    pub fn query(controls: &dyn CameraControls) -> Self {
        let zoom = controls
            .query(Control::ZoomAbsolute)
            .filter(|range| range.maximum > range.minimum)
            .map(|range| ZoomCapability {
                min: range.minimum,
                max: range.maximum,
                step: range.step.max(1),
                current: range.current.unwrap_or(range.default_value),
            });

        let continuous = controls.query(Control::FocusAuto).is_some();
        let single_shot = controls.query(Control::FocusTrigger).is_some();
        let focus = (continuous || single_shot).then_some(FocusCapability {
            continuous,
            single_shot,
        });

        let exposure = controls.query(Control::ExposureAuto).map(|range| {
            let offers = |value: i32| (range.minimum..=range.maximum).contains(&value);
            let continuous_value = if offers(V4L2_EXPOSURE_APERTURE_PRIORITY) {
                Some(V4L2_EXPOSURE_APERTURE_PRIORITY)
            } else if offers(V4L2_EXPOSURE_AUTO) {
                Some(V4L2_EXPOSURE_AUTO)
            } else {
                None
            };
            ExposureCapability {
                continuous_value,
                manual: offers(V4L2_EXPOSURE_MANUAL),
            }
        });

        Self {
            zoom,
            focus,
            exposure,
        }
    }
}

/// What a focus hint ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusHint {
    /// A one-shot autofocus run was triggered
    Refocused,
    /// Continuous autofocus was (re-)enabled
    ContinuousEnabled,
    /// Nothing to do on this hardware, or the driver refused
    Ignored,
}

/// Capability state for the active stream
#[derive(Debug, Clone)]
pub struct CapabilityLayer {
    capabilities: StreamCapabilities,
    zoom_step_multiplier: i32,
}

impl CapabilityLayer {
    pub fn new(zoom_step_multiplier: u32) -> Self {
        Self {
            capabilities: StreamCapabilities::default(),
            zoom_step_multiplier: i32::try_from(zoom_step_multiplier.max(1)).unwrap_or(i32::MAX),
        }
    }

    pub fn capabilities(&self) -> &StreamCapabilities {
        &self.capabilities
    }

    pub fn zoom(&self) -> Option<&ZoomCapability> {
        self.capabilities.zoom.as_ref()
    }

    /// Re-read capability ranges from the stream
    pub fn refresh(&mut self, controls: &dyn CameraControls) {
        self.capabilities = StreamCapabilities::query(controls);
        debug!(capabilities = ?self.capabilities, "Camera capabilities refreshed");
    }

    /// Forget everything, e.g. after the stream was released
    pub fn clear(&mut self) {
        self.capabilities = StreamCapabilities::default();
    }

    /// Apply a zoom value
    ///
    /// Returns the value actually applied, or `None` when zoom is unsupported
    /// or the driver refused it.
    pub fn apply_zoom(&mut self, controls: &dyn CameraControls, value: i32) -> Option<i32> {
        let zoom = self.capabilities.zoom.as_mut()?;
        let value = zoom.normalize(value);

        match controls.set(Control::ZoomAbsolute, value) {
            Ok(()) => {
                zoom.current = value;
                debug!(value, "Zoom applied");
                Some(value)
            }
            Err(e) => {
                debug!(value, error = %e, "Zoom rejected by device");
                None
            }
        }
    }

    /// Move zoom by `steps` increments of the hardware step
    pub fn zoom_by(&mut self, controls: &dyn CameraControls, steps: i32) -> Option<i32> {
        let zoom = self.capabilities.zoom?;
        let delta = steps
            .saturating_mul(zoom.step)
            .saturating_mul(self.zoom_step_multiplier);
        let target = zoom.current.saturating_add(delta);
        self.apply_zoom(controls, target)
    }

    /// Hint that the user tapped at normalized frame position (x, y)
    ///
    /// V4L2 has no point-of-interest control, so the hint becomes a refocus
    /// (and exposure re-evaluation) of the whole frame.
    pub fn focus_at(&self, controls: &dyn CameraControls, x: f32, y: f32) -> FocusHint {
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return FocusHint::Ignored;
        }

        if let Some(exposure) = self.capabilities.exposure
            && let Some(value) = exposure.continuous_value
            && let Err(e) = controls.set(Control::ExposureAuto, value)
        {
            debug!(error = %e, "Exposure hint rejected by device");
        }

        let Some(focus) = self.capabilities.focus else {
            return FocusHint::Ignored;
        };

        let hint = if focus.single_shot && controls.set(Control::FocusTrigger, 1).is_ok() {
            FocusHint::Refocused
        } else if focus.continuous && controls.set(Control::FocusAuto, 1).is_ok() {
            FocusHint::ContinuousEnabled
        } else {
            FocusHint::Ignored
        };

        info!(x, y, ?hint, "Focus hint");
        hint
    }
}
