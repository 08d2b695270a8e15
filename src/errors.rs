// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Copy/share/open errors
    Action(ActionError),
    /// Configuration errors
    Config(String),
    /// Image file could not be read (decode command)
    Image(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No camera devices found
    NoCameraFound,
    /// Opening the device was refused (usually missing permissions)
    PermissionDenied(String),
    /// Camera initialization failed
    InitializationFailed(String),
    /// No usable pixel format on the device
    InvalidFormat(String),
    /// Control ioctl failed or the control does not exist
    ControlFailed(String),
    /// Camera is busy or in use
    Busy,
}

/// Errors from the result action handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action is disabled for the current result
    Unavailable,
    /// No clipboard mechanism accepted the text
    ClipboardFailed(String),
    /// The share command could not be run
    ShareFailed(String),
    /// The browser could not be launched
    OpenFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Action(e) => write!(f, "Action error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Image(msg) => write!(f, "Image error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::PermissionDenied(path) => write!(f, "Permission denied: {}", path),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            CameraError::ControlFailed(msg) => write!(f, "Control failed: {}", msg),
            CameraError::Busy => write!(f, "Camera is busy"),
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Unavailable => write!(f, "Action not available for this result"),
            ActionError::ClipboardFailed(msg) => write!(f, "Clipboard write failed: {}", msg),
            ActionError::ShareFailed(msg) => write!(f, "Share failed: {}", msg),
            ActionError::OpenFailed(msg) => write!(f, "Failed to open link: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for ActionError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<ActionError> for AppError {
    fn from(err: ActionError) -> Self {
        AppError::Action(err)
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => CameraError::NoCameraFound,
            _ if err.raw_os_error() == Some(libc::EBUSY) => CameraError::Busy,
            _ => CameraError::InitializationFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            CameraError::from(denied),
            CameraError::PermissionDenied(_)
        ));

        let busy = std::io::Error::from_raw_os_error(libc::EBUSY);
        assert_eq!(CameraError::from(busy), CameraError::Busy);

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(CameraError::from(missing), CameraError::NoCameraFound);
    }

    #[test]
    fn test_display_wraps_inner_error() {
        let err = AppError::from(CameraError::NoCameraFound);
        assert_eq!(err.to_string(), "Camera error: No camera devices found");
    }
}
