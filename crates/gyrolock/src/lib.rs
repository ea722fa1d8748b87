//! # GyroLock
//!
//! Polls the IIO accelerometer through sysfs and locks the login session through
//! systemd-logind when two consecutive samples differ by more than the configured
//! sensitivity on any axis. After a lock the monitor sleeps through a cooldown.

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod lock;
pub mod monitor;
pub mod sensor;

pub use clock::{poll_until, RetryPolicy, Sleeper, ThreadSleeper};
pub use config::MonitorConfig;
pub use detector::{check_shake, ShakeEvent};
pub use error::{GyroLockError, GyroLockResult};
pub use lock::{is_privileged, LockTarget, Login1Locker, SessionLocker};
pub use monitor::{transition, MonitorState, ShakeMonitor, StepOutcome};
pub use sensor::{Accelerometer, Axis, SensorReading, SensorSource, SysfsSource};
