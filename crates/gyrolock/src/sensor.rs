//! Accelerometer access over the IIO sysfs interface.
//!
//! The kernel exposes each accelerometer as `/sys/bus/iio/devices/iio:deviceN/` with one
//! text entry per axis (`in_accel_x_raw`, ...) holding a raw integer and `in_accel_scale`
//! holding the float multiplier that turns a raw count into m/s².

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::clock::{poll_until, RetryPolicy, Sleeper};
use crate::config::parse_int;
use crate::error::{GyroLockError, GyroLockResult};

/// Name prefix of enumerated IIO devices.
pub const DEVICE_PREFIX: &str = "iio:device";

/// Scale entry shared by all accelerometer axes.
pub const SCALE_ENTRY: &str = "in_accel_scale";

/// Scale used when the scale entry does not hold a usable number.
pub const FALLBACK_SCALE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Evaluation order everywhere in the monitor.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    /// sysfs entry holding the raw value for this axis.
    pub fn raw_entry(self) -> String {
        format!("in_accel_{}_raw", self.name())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calibrated magnitude per axis: `|raw| * scale`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SensorReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

/// Raw text access to one accelerometer.
pub trait SensorSource {
    /// Untrimmed content of the raw entry for `axis`.
    fn read_raw(&mut self, axis: Axis) -> GyroLockResult<String>;

    /// Untrimmed content of the scale entry.
    fn read_scale(&mut self) -> GyroLockResult<String>;
}

/// Sensor entries resolved once under an IIO devices directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsSource {
    x: PathBuf,
    y: PathBuf,
    z: PathBuf,
    scale: PathBuf,
}

impl SysfsSource {
    /// Locate every axis entry and the scale entry under `root`.
    ///
    /// Each entry is taken from the first `iio:device*` directory (by name) that has it.
    pub fn resolve(root: &Path) -> GyroLockResult<Self> {
        let devices = list_devices(root);
        let source = Self {
            x: find_entry(root, &devices, &Axis::X.raw_entry())?,
            y: find_entry(root, &devices, &Axis::Y.raw_entry())?,
            z: find_entry(root, &devices, &Axis::Z.raw_entry())?,
            scale: find_entry(root, &devices, SCALE_ENTRY)?,
        };
        info!(
            x = %source.x.display(),
            y = %source.y.display(),
            z = %source.z.display(),
            scale = %source.scale.display(),
            "accelerometer entries resolved"
        );
        Ok(source)
    }

    pub fn axis_path(&self, axis: Axis) -> &Path {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn scale_path(&self) -> &Path {
        &self.scale
    }
}

impl SensorSource for SysfsSource {
    fn read_raw(&mut self, axis: Axis) -> GyroLockResult<String> {
        read_sysfs_file(self.axis_path(axis))
    }

    fn read_scale(&mut self) -> GyroLockResult<String> {
        read_sysfs_file(&self.scale)
    }
}

/// `iio:device*` directories under `root`, sorted by name. An unreadable root has none.
fn list_devices(root: &Path) -> Vec<PathBuf> {
    let mut devices: Vec<PathBuf> = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(DEVICE_PREFIX))
            .map(|e| e.path())
            .collect(),
        Err(_) => Vec::new(),
    };
    devices.sort();
    devices
}

fn find_entry(root: &Path, devices: &[PathBuf], entry: &str) -> GyroLockResult<PathBuf> {
    devices
        .iter()
        .map(|dir| dir.join(entry))
        .find(|path| path.exists())
        .ok_or_else(|| GyroLockError::SensorNotFound {
            root: root.to_path_buf(),
            entry: entry.to_string(),
        })
}

fn read_sysfs_file(path: &Path) -> GyroLockResult<String> {
    std::fs::read_to_string(path).map_err(|source| GyroLockError::SensorRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse scale entry content; anything that is not a positive finite number gives [`FALLBACK_SCALE`].
pub fn parse_scale(content: &str) -> f64 {
    content
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(FALLBACK_SCALE)
}

/// Calibrated reads on top of a [`SensorSource`].
pub struct Accelerometer<S> {
    source: S,
    scale: f64,
    retry: RetryPolicy,
}

impl<S: SensorSource> Accelerometer<S> {
    /// Wrap `source` and read its scale once.
    pub fn new(source: S, retry: RetryPolicy) -> GyroLockResult<Self> {
        let mut accel = Self {
            source,
            scale: FALLBACK_SCALE,
            retry,
        };
        accel.read_scale()?;
        Ok(accel)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Re-read the scale entry. Unparsable content falls back to 1.0, a read failure is fatal.
    pub fn read_scale(&mut self) -> GyroLockResult<f64> {
        let content = self.source.read_scale()?;
        self.scale = parse_scale(&content);
        debug!(scale = self.scale, raw = content.trim(), "accelerometer scale");
        Ok(self.scale)
    }

    /// Pick up a scale the driver may have changed while the monitor was idle.
    pub fn recalibrate(&mut self) -> GyroLockResult<f64> {
        let previous = self.scale;
        let scale = self.read_scale()?;
        if scale != previous {
            info!(previous, scale, "accelerometer scale changed");
        }
        Ok(scale)
    }

    /// `|raw| * scale` for one axis.
    ///
    /// A raw value of zero (or one that does not parse) is treated as a sample the driver
    /// has not produced yet and is re-read after the retry delay.
    pub fn read_axis<C>(&mut self, axis: Axis, sleeper: &mut C) -> GyroLockResult<f64>
    where
        C: Sleeper + ?Sized,
    {
        let retry = self.retry;
        let source = &mut self.source;
        let raw = poll_until(
            sleeper,
            &retry,
            || {
                let content = source.read_raw(axis)?;
                let value = parse_int(content.trim()).filter(|v| *v != 0);
                if value.is_none() {
                    trace!(axis = %axis, raw = content.trim(), "discarding raw value");
                }
                Ok(value)
            },
            |attempts| GyroLockError::ZeroReadExhausted { axis, attempts },
        )?;

        let value = (raw as f64).abs() * self.scale;
        debug!(axis = %axis, value, "current");
        Ok(value)
    }

    /// Read x, y and z in that order.
    pub fn sample<C>(&mut self, sleeper: &mut C) -> GyroLockResult<SensorReading>
    where
        C: Sleeper + ?Sized,
    {
        let mut reading = SensorReading::default();
        for axis in Axis::ALL {
            let value = self.read_axis(axis, sleeper)?;
            reading.set(axis, value);
        }
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedSource {
        raw: VecDeque<&'static str>,
        scale: &'static str,
    }

    impl SensorSource for ScriptedSource {
        fn read_raw(&mut self, _axis: Axis) -> GyroLockResult<String> {
            Ok(self.raw.pop_front().unwrap_or("1").to_string())
        }

        fn read_scale(&mut self) -> GyroLockResult<String> {
            Ok(self.scale.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Vec<Duration>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    fn accel(raw: &[&'static str], scale: &'static str) -> Accelerometer<ScriptedSource> {
        let source = ScriptedSource {
            raw: raw.iter().copied().collect(),
            scale,
        };
        Accelerometer::new(source, RetryPolicy::default()).unwrap()
    }

    #[test]
    fn test_parse_scale() {
        assert_eq!(parse_scale("0.000122\n"), 0.000122);
        assert_eq!(parse_scale("garbage"), 1.0);
        assert_eq!(parse_scale(""), 1.0);
        assert_eq!(parse_scale("0"), 1.0);
        assert_eq!(parse_scale("-0.5"), 1.0);
        assert_eq!(parse_scale("NaN"), 1.0);
    }

    #[test]
    fn test_read_axis_applies_scale_to_absolute_value() {
        let mut accel = accel(&["-250\n"], "0.5");
        let mut sleeper = RecordingSleeper::default();
        assert_eq!(accel.read_axis(Axis::X, &mut sleeper).unwrap(), 125.0);
        assert!(sleeper.0.is_empty());
    }

    #[test]
    fn test_zero_and_garbage_are_retried() {
        let mut accel = accel(&["0", "0\n", "n/a", "3"], "garbage");
        let mut sleeper = RecordingSleeper::default();
        assert_eq!(accel.read_axis(Axis::Y, &mut sleeper).unwrap(), 3.0);
        assert_eq!(sleeper.0, vec![Duration::from_millis(10); 3]);
    }

    #[test]
    fn test_small_nonzero_value_accepted_immediately() {
        let mut accel = accel(&["-1"], "1");
        let mut sleeper = RecordingSleeper::default();
        assert_eq!(accel.read_axis(Axis::Z, &mut sleeper).unwrap(), 1.0);
        assert!(sleeper.0.is_empty());
    }

    #[test]
    fn test_bounded_retry_reports_axis() {
        let source = ScriptedSource {
            raw: ["0"; 5].into_iter().collect(),
            scale: "1",
        };
        let retry = RetryPolicy {
            delay: Duration::ZERO,
            max_attempts: Some(5),
        };
        let mut accel = Accelerometer::new(source, retry).unwrap();
        let mut sleeper = RecordingSleeper::default();
        match accel.read_axis(Axis::Z, &mut sleeper) {
            Err(GyroLockError::ZeroReadExhausted { axis, attempts }) => {
                assert_eq!(axis, Axis::Z);
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_recalibrate_picks_up_new_scale() {
        let mut accel = accel(&["10", "10"], "1");
        let mut sleeper = RecordingSleeper::default();
        assert_eq!(accel.read_axis(Axis::X, &mut sleeper).unwrap(), 10.0);

        accel.source.scale = "0.25";
        assert_eq!(accel.recalibrate().unwrap(), 0.25);
        assert_eq!(accel.read_axis(Axis::X, &mut sleeper).unwrap(), 2.5);

        accel.source.scale = "garbage";
        assert_eq!(accel.recalibrate().unwrap(), 1.0);
    }

    #[test]
    fn test_sample_reads_all_axes_in_order() {
        let mut accel = accel(&["100", "-50", "20"], "2");
        let mut sleeper = RecordingSleeper::default();
        let reading = accel.sample(&mut sleeper).unwrap();
        assert_eq!(reading, SensorReading::new(200.0, 100.0, 40.0));
    }

    #[test]
    fn test_axis_entries() {
        assert_eq!(Axis::X.raw_entry(), "in_accel_x_raw");
        assert_eq!(Axis::Z.to_string(), "z");
        assert_eq!(Axis::ALL, [Axis::X, Axis::Y, Axis::Z]);
    }
}
