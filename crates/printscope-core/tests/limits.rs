use printscope_core::{AxisRange, Position, SafetyLimits, ZoomOptics, ZoomState};
use proptest::prelude::*;

fn printer_limits() -> SafetyLimits {
    SafetyLimits {
        x: AxisRange::new(0.0, 220.0),
        y: AxisRange::new(0.0, 220.0),
        z: AxisRange::new(0.0, 250.0),
        zoom: AxisRange::new(50.0, 150.0),
    }
}

proptest! {
    #[test]
    fn inside_points_pass(x in 0.0f64..=220.0, y in 0.0f64..=220.0, z in 0.0f64..=250.0) {
        prop_assert!(printer_limits().within_limits(&Position::new(x, y, z)));
    }

    #[test]
    fn any_axis_outside_fails(x in 220.0001f64..1000.0, y in 0.0f64..=220.0, z in -500.0f64..-0.0001) {
        let limits = printer_limits();
        prop_assert!(!limits.within_limits(&Position::new(x, y, 0.0)));
        prop_assert!(!limits.within_limits(&Position::new(0.0, y, z)));
        prop_assert!(limits.check_position(&Position::new(x, y, z)).is_err());
    }

    #[test]
    fn percentage_tracks_extent(extent in 50.0f64..=150.0) {
        let optics = ZoomOptics::new(50.0, 50.0, 150.0);
        let state = ZoomState::at(extent, &optics, true);
        prop_assert!((0.0..=100.0).contains(&state.percentage));
        prop_assert!((state.magnification - (extent / 50.0 - 1.0)).abs() < 1e-12);
        prop_assert!((state.percentage - (extent - 50.0)).abs() < 1e-9);
    }
}
