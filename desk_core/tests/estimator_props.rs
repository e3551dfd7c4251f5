use std::time::Duration;

use desk_core::mocks::DeadEncoder;
use desk_core::{DriverState, Estimator, EstimatorCfg, EstimatorReport, MotionCfg};
use proptest::prelude::*;
use rstest::rstest;

fn no_stall() -> EstimatorCfg {
    EstimatorCfg {
        stall_ticks: u32::MAX,
        ..EstimatorCfg::default()
    }
}

fn estimator(cfg: EstimatorCfg) -> Estimator {
    Estimator::new(Box::new(DeadEncoder), cfg, Duration::from_secs(300))
}

fn driving(position: i32, target: i32, angle: u16) -> DriverState {
    let mut s = DriverState::new(position, angle, 5);
    s.target_position = target;
    s.driving = true;
    s
}

/// Feed one full window of identical samples so the fused angle is `angle`.
fn fused_update(
    e: &mut Estimator,
    s: &mut DriverState,
    m: &MotionCfg,
    angle: u16,
) -> EstimatorReport {
    let mut r = EstimatorReport::default();
    for _ in 0..e.cfg().window {
        r = e.ingest(s, m, angle, 25);
    }
    assert_eq!(r.fused, Some(angle));
    r
}

proptest! {
    #[test]
    fn without_rollover_position_moves_by_the_sum_of_differences(
        start in 0u16..360,
        steps in prop::collection::vec(-170i32..=170, 1..60),
        target_above in any::<bool>(),
    ) {
        let m = MotionCfg::default();
        let mut e = estimator(no_stall());
        let target = if target_above { 100_000 } else { -100_000 };
        let mut s = driving(5_000, target, start);

        let mut angle = i32::from(start);
        let mut sum = 0;
        for step in steps {
            let next = (angle + step).clamp(0, 359);
            sum += next - angle;
            angle = next;
            fused_update(&mut e, &mut s, &m, u16::try_from(angle).unwrap());
        }
        prop_assert_eq!(s.position, 5_000 + sum);
    }

    #[test]
    fn rising_across_revolutions_tracks_total_travel(
        start in 0u16..360,
        steps in prop::collection::vec(5i32..=170, 1..80),
    ) {
        let m = MotionCfg::default();
        let mut e = estimator(no_stall());
        let mut s = driving(0, 1_000_000, start);

        let mut angle = i32::from(start);
        let mut total = 0;
        for step in steps {
            angle = (angle + step).rem_euclid(360);
            total += step;
            fused_update(&mut e, &mut s, &m, u16::try_from(angle).unwrap());
        }
        prop_assert_eq!(s.position, total);
    }

    #[test]
    fn falling_across_revolutions_tracks_total_travel(
        start in 0u16..360,
        steps in prop::collection::vec(5i32..=170, 1..80),
    ) {
        let m = MotionCfg::default();
        let mut e = estimator(no_stall());
        let mut s = driving(0, -1_000_000, start);

        let mut angle = i32::from(start);
        let mut total = 0;
        for step in steps {
            angle = (angle - step).rem_euclid(360);
            total -= step;
            fused_update(&mut e, &mut s, &m, u16::try_from(angle).unwrap());
        }
        prop_assert_eq!(s.position, total);
    }
}

#[rstest]
#[case(350, 10, true, 20)]
#[case(355, 2, true, 7)]
#[case(10, 350, false, -20)]
#[case(0, 359, false, -1)]
fn rollover_in_direction_of_travel(
    #[case] from: u16,
    #[case] to: u16,
    #[case] up: bool,
    #[case] moved: i32,
) {
    let m = MotionCfg::default();
    let mut e = estimator(no_stall());
    let target = if up { 5_000 } else { -5_000 };
    let mut s = driving(1_000, target, from);
    fused_update(&mut e, &mut s, &m, to);
    assert_eq!(s.position, 1_000 + moved);
    assert_eq!(s.last_sensor_angle, to);
}

#[test]
fn noisy_window_is_fused_to_a_single_step() {
    let m = MotionCfg::default();
    let mut e = estimator(no_stall());
    let mut s = driving(0, 5_000, 100);
    // One wild outlier does not drag the fused angle.
    for a in [110, 108, 250, 109, 111] {
        e.ingest(&mut s, &m, a, 25);
    }
    assert_eq!(s.position, 11);
    assert_eq!(s.last_sensor_angle, 111);
}

fn low_motion_then_motion(cfg: EstimatorCfg) -> (bool, u32) {
    let m = MotionCfg::default();
    let mut e = estimator(cfg);
    let mut s = driving(500, 5_000, 200);
    let mut angle = 200;
    let mut stalled = false;
    for update in 0..10 {
        // Update 4 is real motion; the rest creep by 1 degree.
        angle += if update == 4 { 30 } else { 1 };
        stalled |= fused_update(&mut e, &mut s, &m, angle).stalled;
        if stalled {
            break;
        }
    }
    (stalled, s.stall_ticks)
}

#[test]
fn genuine_motion_clears_the_stall_count() {
    let (stalled, ticks) = low_motion_then_motion(EstimatorCfg::default());
    assert!(!stalled);
    assert_eq!(ticks, 5);
}

#[test]
fn without_reset_old_low_motion_still_counts() {
    let cfg = EstimatorCfg {
        stall_reset_on_motion: false,
        ..EstimatorCfg::default()
    };
    let (stalled, ticks) = low_motion_then_motion(cfg);
    assert!(stalled);
    assert_eq!(ticks, 0);
}

#[test]
fn nine_low_motion_updates_stall() {
    let m = MotionCfg::default();
    let mut e = estimator(EstimatorCfg::default());
    let mut s = driving(700, 920, 42);
    s.target_speed = 40;
    for _ in 0..8 {
        assert!(!fused_update(&mut e, &mut s, &m, 43).stalled);
    }
    let r = fused_update(&mut e, &mut s, &m, 44);
    assert!(r.stalled && r.publish);
    assert!(!s.driving);
    assert_eq!(s.position, 0);
    assert_eq!(s.target_speed, 0);
}
