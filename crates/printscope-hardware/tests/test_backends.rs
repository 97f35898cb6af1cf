mod common;

use common::{limits, machine, ScriptedTransport, HOMING_BUDGET, STEPS_PER_MM};
use printscope_core::{CommandKind, ErrorKind, Position, SystemStatus};
use printscope_hardware::{
    ConnectedBackend, ConnectedSettings, Hardware, HardwareBackend, SimulatedBackend,
    SimulationTiming, TestBackend,
};
use printscope_settings::Config;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn simulated(tick: Duration) -> Hardware {
    let machine = machine();
    let backend = SimulatedBackend::new(
        machine.clone(),
        SimulationTiming {
            tick,
            zoom_speed_mm_s: 2.0,
            steps_per_mm: STEPS_PER_MM,
        },
    );
    Hardware::new(
        machine,
        Box::new(backend),
        limits(),
        STEPS_PER_MM,
        HOMING_BUDGET,
    )
}

/// One facade per backend variant, all initialized
async fn every_backend() -> Vec<Hardware> {
    let sim = simulated(Duration::from_millis(1));

    let test_machine = machine();
    let test = Hardware::new(
        test_machine.clone(),
        Box::new(TestBackend::instant(test_machine)),
        limits(),
        STEPS_PER_MM,
        HOMING_BUDGET,
    );

    let connected_machine = machine();
    let backend: Box<dyn HardwareBackend> = Box::new(ConnectedBackend::new(
        connected_machine.clone(),
        Arc::new(ScriptedTransport::new()),
        None,
        ConnectedSettings {
            timeouts: Config::default().timeouts(),
            wake_delay: Duration::ZERO,
            swap_yz: false,
            steps_per_mm: STEPS_PER_MM,
            settle: Duration::ZERO,
        },
    ));
    let connected = Hardware::new(
        connected_machine,
        backend,
        limits(),
        STEPS_PER_MM,
        HOMING_BUDGET,
    );

    let all = vec![sim, test, connected];
    for hardware in &all {
        let report = hardware.initialize().await;
        assert!(report.ready, "{} not ready", report.backend);
    }
    all
}

fn mv(x: f64, y: f64, z: f64) -> CommandKind {
    CommandKind::Move {
        x,
        y,
        z,
        feedrate: 6000.0,
    }
}

#[tokio::test]
async fn test_rejections_match_across_backends() {
    for hardware in every_backend().await {
        let name = hardware.backend_name();

        let err = hardware.execute(&mv(300.0, 0.0, 0.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitViolation, "{name}");
        assert_eq!(hardware.nozzle_position(), Position::ORIGIN, "{name}");
        assert_eq!(hardware.status(), SystemStatus::Idle, "{name}");

        let err = hardware
            .execute(&CommandKind::ZoomIn { steps: 10 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitViolation, "{name}");

        hardware.emergency_stop().await;
        let err = hardware.execute(&mv(10.0, 10.0, 10.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmergencyStopActive, "{name}");
        assert!(err.to_string().contains("Emergency stop"), "{name}");
        assert_eq!(hardware.nozzle_position(), Position::ORIGIN, "{name}");
        assert_eq!(hardware.status(), SystemStatus::EmergencyStop, "{name}");

        hardware.clear_emergency_stop();
        hardware.execute(&mv(10.0, 10.0, 10.0)).await.unwrap();
        assert_eq!(
            hardware.nozzle_position(),
            Position::new(10.0, 10.0, 10.0),
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_limit_check_precedes_emergency_gate() {
    for hardware in every_backend().await {
        hardware.emergency_stop().await;
        let err = hardware.execute(&mv(-1.0, 0.0, 0.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitViolation);
        assert_eq!(hardware.status(), SystemStatus::EmergencyStop);
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulated_move_is_interruptible_within_one_tick() {
    let hardware = Arc::new(simulated(Duration::from_millis(100)));

    // 200mm at 600mm/min takes 20s
    let worker = {
        let hardware = hardware.clone();
        tokio::spawn(async move {
            hardware
                .execute(&CommandKind::Move {
                    x: 200.0,
                    y: 0.0,
                    z: 0.0,
                    feedrate: 600.0,
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(hardware.status(), SystemStatus::Moving);

    let stopped_at = tokio::time::Instant::now();
    hardware.emergency_stop().await;
    let err = worker.await.unwrap().unwrap_err();

    assert!(stopped_at.elapsed() <= Duration::from_millis(100));
    assert!(err.is_emergency_stop());
    assert_eq!(hardware.status(), SystemStatus::EmergencyStop);

    // Fail-fast: position frozen at the last interpolated tick
    let frozen = hardware.nozzle_position();
    assert!(frozen.x > 0.0 && frozen.x < 200.0);
    assert!(hardware.telemetry().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_simulated_telemetry_follows_interpolation() {
    let hardware = Arc::new(simulated(Duration::from_millis(100)));

    // 100mm at 1500mm/min takes 4s
    let worker = {
        let hardware = hardware.clone();
        tokio::spawn(async move {
            hardware
                .execute(&CommandKind::Move {
                    x: 100.0,
                    y: 0.0,
                    z: 0.0,
                    feedrate: 1500.0,
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(2_050)).await;

    let midway = hardware.telemetry();
    assert_eq!(midway.status, SystemStatus::Moving);
    assert!((midway.position.x - 50.0).abs() <= 2.5);

    worker.await.unwrap().unwrap();
    let done = hardware.telemetry();
    assert_eq!(done.status, SystemStatus::Idle);
    assert_eq!(done.position, Position::new(100.0, 0.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_homing_returns_to_origin() {
    let hardware = simulated(Duration::from_millis(100));
    hardware.execute(&mv(123.4, 56.7, 89.1)).await.unwrap();
    assert_eq!(hardware.nozzle_position(), Position::new(123.4, 56.7, 89.1));

    hardware.execute(&CommandKind::Home).await.unwrap();
    assert_eq!(hardware.nozzle_position(), Position::ORIGIN);
    assert_eq!(hardware.status(), SystemStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_zoom_cycle() {
    let hardware = simulated(Duration::from_millis(100));

    hardware.execute(&CommandKind::HomeZoom).await.unwrap();
    assert!(hardware.zoom_state().is_homed);

    hardware
        .execute(&CommandKind::ZoomIn { steps: 4_000 })
        .await
        .unwrap();
    let zoom = hardware.zoom_state();
    assert_eq!(zoom.distance_mm, 100.0);
    assert_eq!(zoom.magnification, 1.0);
    assert_eq!(zoom.percentage, 50.0);
    assert!(!zoom.is_moving);

    hardware
        .execute(&CommandKind::ZoomOut { steps: 4_000 })
        .await
        .unwrap();
    assert_eq!(hardware.zoom_state().distance_mm, 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_emergency_stop_freezes_zoom_mid_travel() {
    let hardware = Arc::new(simulated(Duration::from_millis(100)));
    hardware.execute(&CommandKind::HomeZoom).await.unwrap();

    // 4000 steps is 50mm, 25s at 2mm/s
    let worker = {
        let hardware = hardware.clone();
        tokio::spawn(async move {
            hardware
                .execute(&CommandKind::ZoomIn { steps: 4_000 })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5_050)).await;
    assert!(hardware.zoom_state().is_moving);

    hardware.emergency_stop().await;
    let err = worker.await.unwrap().unwrap_err();
    assert!(err.is_emergency_stop());
    assert_eq!(hardware.status(), SystemStatus::EmergencyStop);

    let zoom = hardware.zoom_state();
    assert!(zoom.distance_mm > 50.0 && zoom.distance_mm < 100.0);
    assert!(zoom.is_homed);
    assert!(!zoom.is_moving);

    // Frozen, not rolled back or completed
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(hardware.zoom_state().distance_mm, zoom.distance_mm);
}

#[tokio::test]
async fn test_unusable_feedrates_are_rejected() {
    for hardware in every_backend().await {
        let name = hardware.backend_name();
        for feedrate in [0.0, -1500.0, f64::NAN, f64::INFINITY] {
            let err = hardware
                .execute(&CommandKind::Move {
                    x: 10.0,
                    y: 0.0,
                    z: 0.0,
                    feedrate,
                })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameters, "{name}");
        }
        assert_eq!(hardware.nozzle_position(), Position::ORIGIN, "{name}");
        assert_eq!(hardware.status(), SystemStatus::Idle, "{name}");
    }
}

#[tokio::test]
async fn test_simulated_move_too_slow_to_time_is_rejected() {
    let hardware = simulated(Duration::from_millis(100));
    let err = hardware
        .execute(&CommandKind::Move {
            x: 10.0,
            y: 0.0,
            z: 0.0,
            feedrate: 1e-300,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    assert!(err.is_rejection());
    assert_eq!(hardware.nozzle_position(), Position::ORIGIN);
    assert_eq!(hardware.status(), SystemStatus::Idle);
    assert!(hardware.telemetry().error.is_none());
}

#[tokio::test]
async fn test_simulated_queries_are_synthetic() {
    let hardware = simulated(Duration::from_millis(1));
    let temps = hardware.temperatures().await.unwrap();
    assert!(temps.hotend.is_some());
    let firmware = hardware.firmware_info().await.unwrap();
    assert!(firmware.version.unwrap().contains("simulated"));
    assert_eq!(hardware.reported_position().await, Some(Position::ORIGIN));
}

proptest! {
    #[test]
    fn prop_out_of_bounds_moves_never_change_position(
        x in -500.0f64..500.0,
        y in -500.0f64..500.0,
        z in -500.0f64..500.0,
    ) {
        prop_assume!(!limits().within_limits(&Position::new(x, y, z)));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let state = machine();
            let hardware = Hardware::new(
                state.clone(),
                Box::new(TestBackend::instant(state)),
                limits(),
                STEPS_PER_MM,
                HOMING_BUDGET,
            );
            hardware.execute(&mv(10.0, 10.0, 10.0)).await.unwrap();

            let err = hardware.execute(&mv(x, y, z)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::LimitViolation);
            assert_eq!(hardware.nozzle_position(), Position::new(10.0, 10.0, 10.0));
        });
    }
}
