#![no_main]
use desk_core::{Dispatch, Dispatcher, DriverState, MotionCfg, Topics};
use desk_traits::Message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, i32, Vec<u8>)| {
    let (which, position, payload) = input;
    let topics = Topics::new("desk");
    let topic = match which % 4 {
        0 => topics.set.clone(),
        1 => topics.override_position.clone(),
        2 => topics.switch.clone(),
        _ => "desk/unknown".to_string(),
    };
    let motion = MotionCfg::default();
    let mut state = DriverState::new(position, 0, 5);
    let dispatcher = Dispatcher::new(topics);
    match dispatcher.handle(&mut state, &motion, &Message::new(topic, payload)) {
        Dispatch::MoveStarted { percent, .. } => assert!(percent <= 100),
        Dispatch::Overridden { .. } | Dispatch::Ignored => {}
    }
});
