//! Shake detection between two consecutive readings.

use tracing::{debug, info};

use crate::sensor::{Axis, SensorReading};

/// The first axis whose delta exceeded the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeEvent {
    pub axis: Axis,
    /// Truncated absolute delta on `axis`.
    pub diff: u64,
}

/// Truncated `|current - previous|` on one axis.
pub fn axis_diff(current: &SensorReading, previous: &SensorReading, axis: Axis) -> u64 {
    // float -> int `as` truncates toward zero and saturates
    (current.get(axis) - previous.get(axis)).abs() as u64
}

/// Compare axes x, y, z in order and stop at the first delta strictly above `threshold`.
pub fn check_shake(
    threshold: u32,
    current: &SensorReading,
    previous: &SensorReading,
) -> Option<ShakeEvent> {
    for axis in Axis::ALL {
        let diff = axis_diff(current, previous, axis);
        debug!(axis = %axis, diff, "diff");
        if diff > u64::from(threshold) {
            info!(axis = %axis, diff, threshold, "GyroLock, shake detected");
            return Some(ShakeEvent { axis, diff });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> SensorReading {
        SensorReading::new(100.0, 50.0, 20.0)
    }

    #[test]
    fn test_x_over_threshold_triggers() {
        let current = SensorReading::new(112.0, 50.0, 20.0);
        let event = check_shake(10, &current, &baseline()).unwrap();
        assert_eq!(event, ShakeEvent { axis: Axis::X, diff: 12 });
    }

    #[test]
    fn test_below_threshold_is_quiet() {
        let current = SensorReading::new(109.0, 50.0, 20.0);
        assert_eq!(check_shake(10, &current, &baseline()), None);
    }

    #[test]
    fn test_equal_to_threshold_does_not_trigger() {
        let current = SensorReading::new(110.0, 40.0, 30.0);
        assert_eq!(check_shake(10, &current, &baseline()), None);
    }

    #[test]
    fn test_first_exceeding_axis_wins() {
        let current = SensorReading::new(100.0, 80.0, 90.0);
        let event = check_shake(10, &current, &baseline()).unwrap();
        assert_eq!(event.axis, Axis::Y);
        assert_eq!(event.diff, 30);

        let current = SensorReading::new(150.0, 80.0, 90.0);
        assert_eq!(check_shake(10, &current, &baseline()).unwrap().axis, Axis::X);
    }

    #[test]
    fn test_diff_is_truncated_and_symmetric() {
        let previous = SensorReading::new(0.0, 10.9, 0.0);
        let current = SensorReading::new(0.0, 0.0, 0.0);
        assert_eq!(axis_diff(&current, &previous, Axis::Y), 10);
        assert_eq!(check_shake(10, &current, &previous), None);
        assert_eq!(check_shake(9, &current, &previous).unwrap().axis, Axis::Y);
    }

    #[test]
    fn test_zero_threshold_needs_a_whole_unit() {
        let current = SensorReading::new(100.5, 50.0, 20.0);
        assert_eq!(check_shake(0, &current, &baseline()), None);
        let current = SensorReading::new(101.0, 50.0, 20.0);
        assert!(check_shake(0, &current, &baseline()).is_some());
    }

    #[test]
    fn test_property_matches_any_axis_over_threshold() {
        let values = [0.0, 3.0, 10.0, 11.0, 25.5];
        for threshold in [0u32, 5, 10, 20] {
            for &dx in &values {
                for &dz in &values {
                    let previous = SensorReading::new(40.0, 40.0, 40.0);
                    let current = SensorReading::new(40.0 + dx, 40.0, 40.0 - dz);
                    let expected = (dx as u64) > u64::from(threshold) || (dz as u64) > u64::from(threshold);
                    assert_eq!(check_shake(threshold, &current, &previous).is_some(), expected);
                }
            }
        }
    }
}
