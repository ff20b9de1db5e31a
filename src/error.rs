//! Error types for stardrift.
//!
//! Nothing in the page-facing API is fatal: missing host capabilities degrade
//! to no-ops and invalid registrations are ignored. The types here cover the
//! places where a caller can actually act on a failure (bad configuration,
//! GPU setup in the demo window).

use std::fmt;

/// Errors produced while building or loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A `min..max` range has `min > max` or a non-finite bound.
    InvalidRange {
        /// Name of the offending field.
        field: &'static str,
        /// Lower bound as given.
        min: f32,
        /// Upper bound as given.
        max: f32,
    },
    /// A scalar setting is outside its allowed interval.
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value as given.
        value: f32,
    },
    /// Parallax layer attenuations are not strictly decreasing.
    AttenuationOrder {
        /// Index of the first layer that breaks the ordering.
        index: usize,
    },
    /// A root margin string could not be parsed.
    RootMargin(String),
    /// A color string is not `#rgb`, `#rrggbb` or `#rrggbbaa`.
    Color(String),
    /// A JSON configuration document could not be read.
    Json(serde_json::Error),
    /// A configuration file could not be read from disk.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRange { field, min, max } => {
                write!(f, "Invalid range for `{}`: {}..{}", field, min, max)
            }
            ConfigError::OutOfRange { field, value } => {
                write!(f, "Value {} is out of range for `{}`", value, field)
            }
            ConfigError::AttenuationOrder { index } => write!(
                f,
                "Parallax layer {} must have a smaller attenuation than layer {}",
                index,
                index.saturating_sub(1)
            ),
            ConfigError::RootMargin(input) => write!(f, "Invalid root margin: {:?}", input),
            ConfigError::Color(input) => write!(f, "Invalid color: {:?}", input),
            ConfigError::Json(e) => write!(f, "Failed to parse configuration: {}", e),
            ConfigError::Io(e) => write!(f, "Failed to read configuration file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// A host capability the core asked for but could not get.
///
/// These are reported through the log and then degraded around; the page API
/// never hands them to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    /// No drawing surface could be acquired for the particle field.
    SurfaceUnavailable,
    /// No visibility observer exists in this host.
    ObserverUnavailable,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::SurfaceUnavailable => {
                write!(f, "Drawing surface unavailable; particle field disabled")
            }
            CapabilityError::ObserverUnavailable => {
                write!(f, "Visibility observer unavailable; revealing elements immediately")
            }
        }
    }
}

impl std::error::Error for CapabilityError {}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::NoAdapter => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur when running the demo window.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// The field configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            AppError::Window(e) => write!(f, "Failed to create window: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_order_message_names_both_layers() {
        let msg = ConfigError::AttenuationOrder { index: 2 }.to_string();
        assert!(msg.contains("layer 2"));
        assert!(msg.contains("layer 1"));
    }

    #[test]
    fn test_json_error_has_source() {
        let err: ConfigError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
