use desk_hardware::channel_transport;
use desk_traits::{Message, Transport};

#[test]
fn inbound_messages_arrive_in_order() {
    let (mut transport, handle) = channel_transport();
    handle.send("desk/position/set", "40").unwrap();
    handle.send("desk/switch", "OFF").unwrap();

    assert_eq!(
        transport.poll().unwrap(),
        Some(Message::new("desk/position/set", "40"))
    );
    assert_eq!(
        transport.poll().unwrap(),
        Some(Message::new("desk/switch", "OFF"))
    );
    assert_eq!(transport.poll().unwrap(), None);
}

#[test]
fn poll_never_blocks_after_feeder_is_gone() {
    let (mut transport, handle) = channel_transport();
    drop(handle);
    assert_eq!(transport.poll().unwrap(), None);
}

#[test]
fn publish_fails_once_handle_is_dropped() {
    let (mut transport, handle) = channel_transport();
    transport.publish("desk/status", b"ON").unwrap();
    assert_eq!(handle.published(), vec![Message::new("desk/status", "ON")]);

    drop(handle);
    let err = transport.publish("desk/status", b"OFF").unwrap_err();
    assert!(err.to_string().contains("disconnected"));
}

#[test]
fn subscriptions_and_pings_are_visible_to_the_handle() {
    let (mut transport, handle) = channel_transport();
    transport.subscribe("desk/switch").unwrap();
    transport.ping().unwrap();
    transport.ping().unwrap();

    assert_eq!(handle.subscriptions(), vec!["desk/switch".to_string()]);
    assert_eq!(handle.pings(), 2);
}
