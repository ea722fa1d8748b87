//! GyroLock daemon: lock the session when the device is moved.
//!
//! Usage:
//!   SENSITIVITY=10 DEBUG=false gyrolock
//!
//! Runs until killed. Exits with status 1 when the accelerometer cannot be found or read,
//! or when the login1 session service cannot be reached.

use std::convert::Infallible;
use std::process::ExitCode;

use gyrolock::{
    is_privileged, Accelerometer, GyroLockResult, LockTarget, Login1Locker, MonitorConfig,
    ShakeMonitor, SysfsSource, ThreadSleeper,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = MonitorConfig::from_env();

    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&config) {
        Ok(never) => match never {},
        Err(e) => {
            error!(error = %e, "GyroLock stopped");
            ExitCode::from(1)
        }
    }
}

fn run(config: &MonitorConfig) -> GyroLockResult<Infallible> {
    let privileged = is_privileged();
    if !privileged {
        warn!("It's recommended to run GyroLock as root, as a regular user it is easy to disable");
    }

    info!(
        sensitivity = config.sensitivity,
        debug = config.debug,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        cooldown_secs = config.cooldown.as_secs(),
        iio_root = %config.iio_root.display(),
        "GyroLock start"
    );

    let source = SysfsSource::resolve(&config.iio_root)?;
    let accel = Accelerometer::new(source, config.zero_read_retry)?;
    info!(scale = accel.scale(), "accelerometer ready");

    let target = LockTarget::for_privilege(privileged, &config.session_id);
    let mut monitor = ShakeMonitor::new(config, accel, Login1Locker::new(), ThreadSleeper, target)?;
    monitor.run()
}
