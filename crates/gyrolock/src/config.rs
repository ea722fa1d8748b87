//! Monitor configuration loaded from the process environment.
//!
//! Read once at startup and owned by the monitor for the process lifetime.

use std::path::PathBuf;
use std::time::Duration;

use crate::clock::RetryPolicy;

/// Shake threshold used when `SENSITIVITY` is unset, invalid or negative.
pub const DEFAULT_SENSITIVITY: u32 = 10;

/// Delay between two samples while polling.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Quiet period after a lock.
pub const COOLDOWN: Duration = Duration::from_secs(60);

/// Quiet period after a (simulated) lock in debug mode.
pub const DEBUG_COOLDOWN: Duration = Duration::from_secs(5);

/// Delay before re-reading an axis that returned zero.
pub const ZERO_READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// login1 session id locked when running unprivileged.
pub const DEFAULT_SESSION_ID: &str = "1";

/// Where the kernel enumerates IIO devices.
pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";

/// Monitor configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | DEBUG | false | Log readings/diffs, never lock for real, 5s cooldown. |
/// | SENSITIVITY | 10 | Shake threshold; negative or invalid falls back to the default. |
/// | GYROLOCK_SESSION | 1 | Session id locked when not running as root. |
/// | GYROLOCK_IIO_ROOT | /sys/bus/iio/devices | Directory holding `iio:device*` entries. |
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub sensitivity: u32,
    pub debug: bool,
    pub session_id: String,
    pub iio_root: PathBuf,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub zero_read_retry: RetryPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            debug: false,
            session_id: DEFAULT_SESSION_ID.to_string(),
            iio_root: PathBuf::from(DEFAULT_IIO_ROOT),
            poll_interval: POLL_INTERVAL,
            cooldown: COOLDOWN,
            zero_read_retry: RetryPolicy {
                delay: ZERO_READ_RETRY_DELAY,
                max_attempts: None,
            },
        }
    }
}

impl MonitorConfig {
    /// Load from the process environment. Unset or invalid => defaults (see table above).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("DEBUG").as_deref().and_then(parse_bool).unwrap_or(false);
        let sensitivity = lookup("SENSITIVITY")
            .as_deref()
            .map(parse_sensitivity)
            .unwrap_or(DEFAULT_SENSITIVITY);
        let session_id = env_opt_string(lookup("GYROLOCK_SESSION"))
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
        let iio_root = env_opt_string(lookup("GYROLOCK_IIO_ROOT"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IIO_ROOT));

        Self {
            sensitivity,
            debug,
            session_id,
            iio_root,
            cooldown: if debug { DEBUG_COOLDOWN } else { COOLDOWN },
            ..Self::default()
        }
    }
}

fn env_opt_string(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Boolean spellings accepted for `DEBUG`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Sensitivity is a signed 16-bit integer in the environment; only its non-negative half is usable.
pub fn parse_sensitivity(s: &str) -> u32 {
    parse_int(s)
        .and_then(|v| i16::try_from(v).ok())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_SENSITIVITY)
}

/// Parse an integer whose base is implied by its prefix: `0x` hex, `0o`/leading `0` octal,
/// `0b` binary, decimal otherwise. An optional sign is allowed. Underscores are accepted
/// between digits only when a base prefix is present.
pub fn parse_int(s: &str) -> Option<i64> {
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits, prefixed) = if let Some(rest) = strip_prefix_ci(body, "0x") {
        (16, rest, true)
    } else if let Some(rest) = strip_prefix_ci(body, "0o") {
        (8, rest, true)
    } else if let Some(rest) = strip_prefix_ci(body, "0b") {
        (2, rest, true)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..], true)
    } else {
        (10, body, false)
    };

    let digits = if prefixed {
        // "0x_1f" is fine, a trailing or doubled separator is not
        if digits.ends_with('_') || digits.contains("__") {
            return None;
        }
        digits.replace('_', "")
    } else {
        digits.to_string()
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = u64::from_str_radix(&digits, radix).ok()?;
    if negative {
        if magnitude == i64::MIN.unsigned_abs() {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|v| -v)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&s[prefix.len()..]),
        _ => None,
    }
}
