//! Zoom actuator optics
//!
//! The zoom actuator moves the sensor along the optical axis. Its extent
//! (image distance) maps to magnification through the thin lens relation
//! `M = extent / f - 1`.

use serde::{Deserialize, Serialize};

/// Fixed optical parameters of the zoom assembly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomOptics {
    /// Lens focal length in mm
    pub focal_length_mm: f64,
    /// Shortest actuator extent in mm (home position)
    pub min_extent_mm: f64,
    /// Longest actuator extent in mm
    pub max_extent_mm: f64,
}

impl ZoomOptics {
    /// Create optics from focal length and travel
    pub fn new(focal_length_mm: f64, min_extent_mm: f64, max_extent_mm: f64) -> Self {
        Self {
            focal_length_mm,
            min_extent_mm,
            max_extent_mm,
        }
    }

    /// Magnification at a given extent
    pub fn magnification(&self, extent_mm: f64) -> f64 {
        extent_mm / self.focal_length_mm - 1.0
    }

    /// Magnification at the minimum extent
    pub fn min_magnification(&self) -> f64 {
        self.magnification(self.min_extent_mm)
    }

    /// Magnification at the maximum extent
    pub fn max_magnification(&self) -> f64 {
        self.magnification(self.max_extent_mm)
    }

    /// Position of the magnification at `extent_mm` within the magnification
    /// range, scaled to `[0, 100]`
    pub fn percentage(&self, extent_mm: f64) -> f64 {
        let min = self.min_magnification();
        let max = self.max_magnification();
        if max > min {
            (self.magnification(extent_mm) - min) / (max - min) * 100.0
        } else {
            0.0
        }
    }

    /// Full travel in mm
    pub fn travel_mm(&self) -> f64 {
        self.max_extent_mm - self.min_extent_mm
    }

    /// Inclusive travel check
    pub fn contains(&self, extent_mm: f64) -> bool {
        self.min_extent_mm <= extent_mm && extent_mm <= self.max_extent_mm
    }
}

/// Zoom actuator state
///
/// `magnification` and `percentage` are derived from `distance_mm` and are
/// only ever recomputed together through [`ZoomState::at`] or
/// [`ZoomState::set_distance`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Actuator extent in mm
    #[serde(rename = "distance")]
    pub distance_mm: f64,
    /// Derived magnification
    pub magnification: f64,
    /// Derived zoom percentage
    pub percentage: f64,
    /// Whether the home switch has been found since startup
    #[serde(rename = "homed")]
    pub is_homed: bool,
    /// Whether the actuator is currently moving
    #[serde(rename = "moving")]
    pub is_moving: bool,
}

impl ZoomState {
    /// State at a given extent, at rest
    pub fn at(distance_mm: f64, optics: &ZoomOptics, is_homed: bool) -> Self {
        Self {
            distance_mm,
            magnification: optics.magnification(distance_mm),
            percentage: optics.percentage(distance_mm),
            is_homed,
            is_moving: false,
        }
    }

    /// Unhomed state at the minimum extent, as found at power-on
    pub fn unhomed(optics: &ZoomOptics) -> Self {
        Self::at(optics.min_extent_mm, optics, false)
    }

    /// Move to a new extent, recomputing the derived optics
    pub fn set_distance(&mut self, distance_mm: f64, optics: &ZoomOptics) {
        self.distance_mm = distance_mm;
        self.magnification = optics.magnification(distance_mm);
        self.percentage = optics.percentage(distance_mm);
    }
}
