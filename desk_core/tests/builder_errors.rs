use std::time::Duration;

use desk_core::error::BuildError;
use desk_core::mocks::NullTransport;
use desk_core::{Desk, EstimatorCfg, MotionCfg, TimingCfg};
use desk_hardware::{MemoryStore, PlantCfg, SimulatedDesk};
use desk_traits::ManualClock;
use rstest::rstest;
use std::sync::Arc;

fn sim() -> (SimulatedDesk, ManualClock) {
    let clock = ManualClock::new();
    (
        SimulatedDesk::new(PlantCfg::default(), Arc::new(clock.clone())),
        clock,
    )
}

fn expect_build_error(err: &eyre::Report) -> &BuildError {
    err.downcast_ref::<BuildError>()
        .unwrap_or_else(|| panic!("expected BuildError, got: {err:?}"))
}

#[test]
fn builder_missing_encoder_yields_typed_build_error() {
    let (sim, _clock) = sim();
    let err = Desk::builder()
        // missing with_encoder()
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .with_store(MemoryStore::new())
        .try_build()
        .expect_err("should fail with MissingEncoder");
    assert!(matches!(expect_build_error(&err), BuildError::MissingEncoder));
}

#[test]
fn builder_missing_actuator_yields_typed_build_error() {
    let (sim, _clock) = sim();
    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_transport(NullTransport)
        .with_store(MemoryStore::new())
        .try_build()
        .expect_err("should fail with MissingActuator");
    assert!(matches!(expect_build_error(&err), BuildError::MissingActuator));
}

#[test]
fn builder_missing_transport_and_store() {
    let (sim, _clock) = sim();
    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_store(MemoryStore::new())
        .build()
        .expect_err("should fail with MissingTransport");
    assert!(matches!(expect_build_error(&err), BuildError::MissingTransport));

    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .build()
        .expect_err("should fail with MissingStore");
    assert!(matches!(expect_build_error(&err), BuildError::MissingStore));
}

#[rstest]
#[case::inverted_travel(MotionCfg { max_pos: 0, ..MotionCfg::default() })]
#[case::zero_min_speed(MotionCfg { min_speed: 0, ..MotionCfg::default() })]
#[case::crawl_above_max(MotionCfg { crawl_speed: 100, max_speed: 90, ..MotionCfg::default() })]
#[case::zero_accel(MotionCfg { accel: 0, ..MotionCfg::default() })]
#[case::negative_buffer(MotionCfg { buffer_deg: -1, ..MotionCfg::default() })]
fn invalid_motion_is_rejected(#[case] motion: MotionCfg) {
    let (sim, _clock) = sim();
    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .with_store(MemoryStore::new())
        .with_motion(motion)
        .build()
        .expect_err("invalid motion");
    assert!(matches!(
        expect_build_error(&err),
        BuildError::InvalidConfig(_)
    ));
}

#[test]
fn zero_window_and_zero_period_are_rejected() {
    let (sim, _clock) = sim();
    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .with_store(MemoryStore::new())
        .with_estimator(EstimatorCfg {
            window: 0,
            ..EstimatorCfg::default()
        })
        .build()
        .expect_err("zero window");
    assert!(matches!(expect_build_error(&err), BuildError::InvalidConfig(_)));

    let err = Desk::builder()
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .with_store(MemoryStore::new())
        .with_timing(TimingCfg {
            inbox: Duration::ZERO,
            ..TimingCfg::default()
        })
        .build()
        .expect_err("zero period");
    assert!(matches!(expect_build_error(&err), BuildError::InvalidConfig(_)));
}

#[test]
fn builder_applies_a_loaded_config() {
    let cfg = desk_config::load_toml(
        r#"
        [mqtt]
        server = "localhost"
        base_topic = "office/desk"

        [motion]
        max_pos = 3600
        "#,
    )
    .expect("config parses");
    let (sim, clock) = sim();
    let desk = Desk::builder()
        .with_config(&cfg)
        .with_encoder(sim.encoder())
        .with_actuator(sim.actuator())
        .with_transport(NullTransport)
        .with_store(MemoryStore::with_value(1800))
        .with_clock(Box::new(clock))
        .build()
        .expect("desk starts");
    assert_eq!(desk.topics().set, "office/desk/position/set");
    assert_eq!(desk.motion().max_pos, 3600);
    assert_eq!(desk.percent(), 50);
}
