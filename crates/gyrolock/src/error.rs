//! Error types for GyroLock

use std::path::PathBuf;

use thiserror::Error;

use crate::sensor::Axis;

/// Result type alias for monitor operations
pub type GyroLockResult<T> = Result<T, GyroLockError>;

/// Environment errors the monitor cannot work around.
///
/// Library code only returns these; the binary maps every variant to exit status 1.
#[derive(Error, Debug)]
pub enum GyroLockError {
    #[error("no sensor entry iio:device*/{entry} under {}", .root.display())]
    SensorNotFound { root: PathBuf, entry: String },

    #[error("cannot read sensor entry {}: {source}", .path.display())]
    SensorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("axis {axis} read zero/invalid {attempts} times in a row")]
    ZeroReadExhausted { axis: Axis, attempts: u32 },

    #[error("session lock service unavailable: {0}")]
    LockService(String),
}

impl From<dbus::Error> for GyroLockError {
    fn from(err: dbus::Error) -> Self {
        GyroLockError::LockService(err.to_string())
    }
}
