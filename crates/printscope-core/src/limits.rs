//! Safety limit checking
//!
//! Pure checks of candidate nozzle positions and zoom extents against the
//! configured bounds. Bounds are inclusive. Non-finite values never pass.

use crate::data::Position;
use crate::error::MotionError;
use serde::{Deserialize, Serialize};

/// Inclusive range for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl AxisRange {
    /// Create a range
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive membership test
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Configured safe bounds for the nozzle and the zoom actuator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// X travel
    pub x: AxisRange,
    /// Y travel
    pub y: AxisRange,
    /// Z travel
    pub z: AxisRange,
    /// Zoom actuator extent
    pub zoom: AxisRange,
}

impl SafetyLimits {
    /// Whether every axis of `position` lies within bounds
    pub fn within_limits(&self, position: &Position) -> bool {
        self.x.contains(position.x) && self.y.contains(position.y) && self.z.contains(position.z)
    }

    /// Whether a zoom extent lies within bounds
    pub fn within_zoom_limits(&self, extent_mm: f64) -> bool {
        self.zoom.contains(extent_mm)
    }

    /// [`within_limits`](Self::within_limits) as a `Result`
    pub fn check_position(&self, position: &Position) -> Result<(), MotionError> {
        if self.within_limits(position) {
            Ok(())
        } else {
            Err(MotionError::LimitViolation {
                x: position.x,
                y: position.y,
                z: position.z,
            })
        }
    }

    /// [`within_zoom_limits`](Self::within_zoom_limits) as a `Result`
    pub fn check_zoom(&self, extent_mm: f64) -> Result<(), MotionError> {
        if self.within_zoom_limits(extent_mm) {
            Ok(())
        } else {
            Err(MotionError::ZoomLimitViolation { extent_mm })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SafetyLimits {
        SafetyLimits {
            x: AxisRange::new(0.0, 220.0),
            y: AxisRange::new(0.0, 220.0),
            z: AxisRange::new(0.0, 250.0),
            zoom: AxisRange::new(50.0, 150.0),
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = limits();
        assert!(limits.within_limits(&Position::new(0.0, 0.0, 0.0)));
        assert!(limits.within_limits(&Position::new(220.0, 220.0, 250.0)));
        assert!(!limits.within_limits(&Position::new(220.001, 0.0, 0.0)));
        assert!(limits.within_zoom_limits(50.0));
        assert!(limits.within_zoom_limits(150.0));
        assert!(!limits.within_zoom_limits(49.99));
    }

    #[test]
    fn test_out_of_range_move_is_rejected() {
        let err = limits()
            .check_position(&Position::new(300.0, 0.0, 0.0))
            .unwrap_err();
        assert!(err.to_string().contains("limits"));
    }

    #[test]
    fn test_nan_never_passes() {
        let limits = limits();
        assert!(!limits.within_limits(&Position::new(f64::NAN, 0.0, 0.0)));
        assert!(limits.check_zoom(f64::NAN).is_err());
    }
}
