use desk_core::MotionCfg;
use desk_core::controller::ramp;
use proptest::prelude::*;

prop_compose! {
    fn motion_strategy()(
        min_speed in 1u8..=60,
        span in 0u8..=40,
        crawl_off in 0u8..=40,
        accel in 1u8..=50,
        decel in 1u8..=50,
    ) -> MotionCfg {
        let max_speed = min_speed.saturating_add(span).min(100);
        let crawl_speed = min_speed.saturating_add(crawl_off).min(max_speed);
        MotionCfg {
            min_speed,
            max_speed,
            crawl_speed,
            accel,
            decel,
            ..MotionCfg::default()
        }
    }
}

fn request(m: &MotionCfg, pick: u8) -> u8 {
    match pick % 3 {
        0 => 0,
        1 => m.crawl_speed,
        _ => m.max_speed,
    }
}

proptest! {
    #[test]
    fn ramp_never_exceeds_limits(
        m in motion_strategy(),
        picks in prop::collection::vec(any::<u8>(), 1..200),
    ) {
        let mut cur = 0u8;
        for pick in picks {
            let target = request(&m, pick);
            let next = ramp(cur, target, &m);
            prop_assert!(next <= m.max_speed);
            if next > cur {
                prop_assert!(next - cur <= m.accel);
                prop_assert!(next <= target);
            } else {
                prop_assert!(cur - next <= m.decel);
            }
            cur = next;
        }
    }

    #[test]
    fn ramp_settles_on_any_nonzero_request(
        m in motion_strategy(),
        start in 0u8..=100,
        pick in 1u8..=2,
    ) {
        let target = request(&m, pick);
        let mut cur = start.min(m.max_speed);
        for _ in 0..300 {
            cur = ramp(cur, target, &m);
        }
        prop_assert_eq!(cur, target);
    }

    #[test]
    fn slowing_to_stop_floors_at_min_speed(
        m in motion_strategy(),
        start in 0u8..=100,
    ) {
        let start = start.min(m.max_speed);
        let mut cur = start;
        for _ in 0..300 {
            cur = ramp(cur, 0, &m);
        }
        prop_assert_eq!(cur, start.min(m.min_speed));
    }
}
