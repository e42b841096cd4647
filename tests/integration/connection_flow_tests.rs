//! Integration tests: ClientService → FSM → protocol → scripted channel.

use embedded_hal::delay::DelayNs;
use xrcelink::adapters::demo_source::DemoSource;
use xrcelink::app::events::LinkEvent;
use xrcelink::app::service::ClientService;
use xrcelink::config::ClientConfig;
use xrcelink::error::{Error, ProvisioningFailure, ProvisioningStage, TransportError};
use xrcelink::fsm::StateId;
use xrcelink::messages::{MessageKind, StringMsg, TopicCodec, TopicValue};
use xrcelink::protocol::STATUS_ERR_DENIED;
use xrcelink::registry::{ObjectId, ObjectKind, TopicRegistry};

use crate::mock_channel::{Call, MockChannel, RecordingSink};

type Service = ClientService<MockChannel, DemoSource>;

// ── Helpers ───────────────────────────────────────────────────

fn make_service(channel: MockChannel) -> Service {
    let config = ClientConfig::default();
    let registry = TopicRegistry::standard(&config).unwrap();
    let source = DemoSource::new(&config.greeting);
    ClientService::new(config, registry, channel, source).unwrap()
}

/// Tick until `target` is reached, panicking after `max` ticks.
fn tick_until(svc: &mut Service, sink: &mut RecordingSink, target: StateId, max: usize) {
    for _ in 0..max {
        if svc.state() == target {
            return;
        }
        svc.tick(sink).unwrap();
    }
    assert_eq!(svc.state(), target, "did not reach {target:?} in {max} ticks");
}

fn connected(channel: MockChannel) -> (Service, RecordingSink) {
    let mut svc = make_service(channel);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    tick_until(&mut svc, &mut sink, StateId::Connected, 8);
    (svc, sink)
}

/// Advance past one keepalive window and tick once.
fn close_window(svc: &mut Service, sink: &mut RecordingSink) {
    svc.channel_mut().advance(501);
    svc.tick(sink).unwrap();
}

fn oid(id: u16, kind: ObjectKind) -> ObjectId {
    ObjectId::new(id, kind)
}

fn string_payload(text: &str) -> Vec<u8> {
    let msg = StringMsg::from_str_lossy(text);
    let mut buf = vec![0u8; msg.size_of()];
    msg.serialize(&mut buf).unwrap();
    buf
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Scenario A: happy path ────────────────────────────────────

#[test]
fn reaches_connected_in_four_ticks() {
    let mut svc = make_service(MockChannel::new());
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    assert_eq!(svc.state(), StateId::Disconnected);

    let expected = [
        StateId::Probing,
        StateId::SessionEstablished,
        StateId::Provisioning,
        StateId::Connected,
    ];
    for state in expected {
        svc.tick(&mut sink).unwrap();
        assert_eq!(svc.state(), state);
    }
    assert_eq!(svc.cycles(), 1);
    assert!(svc.session().is_some());
    assert!(sink.contains(|e| matches!(e, LinkEvent::AgentReachable)));
    assert!(sink.contains(|e| matches!(e, LinkEvent::SessionOpened { key: 0xAAAA_BBBB })));
}

#[test]
fn provisions_participant_then_each_entry_in_order() {
    let (svc, _) = connected(MockChannel::new());
    let ch = svc.channel();

    assert_eq!(
        ch.created(),
        vec![
            oid(1, ObjectKind::Participant),
            oid(1, ObjectKind::Topic),
            oid(1, ObjectKind::Publisher),
            oid(1, ObjectKind::DataWriter),
            oid(2, ObjectKind::Topic),
            oid(2, ObjectKind::Subscriber),
            oid(2, ObjectKind::DataReader),
        ]
    );
    assert!(ch
        .calls
        .iter()
        .all(|c| !matches!(c, Call::Create { replace: false, .. })));

    let batches: Vec<usize> = ch
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::WaitStatus(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![1, 3, 3]);
}

#[test]
fn data_requests_follow_the_last_batch() {
    let (svc, sink) = connected(MockChannel::new());
    let ch = svc.channel();

    assert_eq!(ch.data_requests(), vec![oid(2, ObjectKind::DataReader)]);
    let last_wait = ch.rposition(|c| matches!(c, Call::WaitStatus(_))).unwrap();
    let request = ch.position(|c| matches!(c, Call::RequestData { .. })).unwrap();
    assert!(request > last_wait);

    let control = ch
        .calls
        .iter()
        .find_map(|c| match c {
            Call::RequestData { control, .. } => Some(*control),
            _ => None,
        })
        .unwrap();
    assert_eq!(control.max_samples, 0xFFFF);
    assert_eq!(control.max_bytes_per_second, 0);

    assert!(sink.contains(|e| matches!(
        e,
        LinkEvent::Provisioned {
            entries: 2,
            data_requests: 1
        }
    )));
}

#[test]
fn time_is_synced_before_connected() {
    let mut ch = MockChannel::new();
    ch.agent_offset_ns = 250_000;
    let (svc, sink) = connected(ch);

    assert_eq!(svc.session().unwrap().time_offset_ns, 250_000);
    assert!(sink.contains(|e| matches!(e, LinkEvent::TimeSynced { offset_ns: 250_000 })));
    let sync = svc.channel().position(|c| matches!(c, Call::SyncSession)).unwrap();
    let request = svc
        .channel()
        .position(|c| matches!(c, Call::RequestData { .. }))
        .unwrap();
    assert!(sync > request);
}

#[test]
fn failed_time_sync_still_connects() {
    let mut ch = MockChannel::new();
    ch.sync_ok = false;
    let (svc, sink) = connected(ch);

    assert_eq!(svc.session().unwrap().time_offset_ns, 0);
    assert!(!sink.contains(|e| matches!(e, LinkEvent::TimeSynced { .. })));
}

#[test]
fn publishes_greeting_on_first_connected_tick() {
    let (mut svc, mut sink) = connected(MockChannel::new());
    svc.tick(&mut sink).unwrap();

    let ch = svc.channel();
    assert_eq!(ch.written.len(), 1);
    let (writer, payload) = &ch.written[0];
    assert_eq!(*writer, oid(1, ObjectKind::DataWriter));
    match TopicValue::deserialize(MessageKind::String, payload).unwrap() {
        TopicValue::String(msg) => assert_eq!(msg.data.as_str(), "Hello from xrcelink!"),
        other => panic!("unexpected value {other:?}"),
    }
}

#[test]
fn publisher_fires_once_per_interval() {
    let (mut svc, mut sink) = connected(MockChannel::new());

    svc.tick(&mut sink).unwrap();
    svc.channel_mut().advance(10);
    svc.tick(&mut sink).unwrap();
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.channel().written.len(), 1);

    svc.channel_mut().advance(1_000);
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.channel().written.len(), 2);
}

#[test]
fn inbound_sample_updates_subscriber_buffer() {
    let (mut svc, mut sink) = connected(MockChannel::new());
    svc.channel_mut()
        .inbound
        .push_back((oid(2, ObjectKind::DataReader), string_payload("hi there")));
    svc.tick(&mut sink).unwrap();

    match svc.buffers().get(1).unwrap() {
        TopicValue::String(msg) => assert_eq!(msg.data.as_str(), "hi there"),
        other => panic!("unexpected value {other:?}"),
    }
}

#[test]
fn unknown_reader_sample_is_ignored() {
    let (mut svc, mut sink) = connected(MockChannel::new());
    svc.channel_mut()
        .inbound
        .push_back((oid(9, ObjectKind::DataReader), string_payload("stray")));
    svc.tick(&mut sink).unwrap();

    assert_eq!(svc.state(), StateId::Connected);
    match svc.buffers().get(1).unwrap() {
        TopicValue::String(msg) => assert!(msg.data.is_empty()),
        other => panic!("unexpected value {other:?}"),
    }
}

// ── Scenario B: provisioning failure ──────────────────────────

#[test]
fn failing_status_aborts_without_data_requests() {
    let mut ch = MockChannel::new();
    ch.create_failure = Some((2, STATUS_ERR_DENIED));
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    tick_until(&mut svc, &mut sink, StateId::Provisioning, 4);

    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);

    let failure = ProvisioningFailure {
        stage: ProvisioningStage::Role,
        entry: Some(0),
        status: STATUS_ERR_DENIED,
    };
    assert!(sink.contains(|e| *e == LinkEvent::ProvisioningFailed(failure)));
    assert_eq!(svc.last_error(), Some(Error::Provisioning(failure)));

    let ch = svc.channel();
    assert!(ch.data_requests().is_empty());
    assert_eq!(ch.created().len(), 4);
    assert_eq!(ch.count(|c| matches!(c, Call::DeleteSession)), 1);
    assert_eq!(ch.count(|c| matches!(c, Call::CloseTransport)), 0);
    assert!(svc.session().is_none());
}

#[test]
fn retries_after_provisioning_failure_without_reopening() {
    let mut ch = MockChannel::new();
    ch.create_failure = Some((0, STATUS_ERR_DENIED));
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    tick_until(&mut svc, &mut sink, StateId::Provisioning, 4);
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);

    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Probing);
    tick_until(&mut svc, &mut sink, StateId::Connected, 4);

    let ch = svc.channel();
    assert_eq!(ch.count(|c| matches!(c, Call::OpenTransport)), 1);
    assert_eq!(ch.count(|c| matches!(c, Call::CreateSession(_))), 2);
    assert_eq!(ch.data_requests().len(), 1);
}

#[test]
fn refused_session_goes_back_to_disconnected() {
    let mut ch = MockChannel::new();
    ch.session_refusals = 1;
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    tick_until(&mut svc, &mut sink, StateId::SessionEstablished, 3);

    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);
    assert_eq!(svc.last_error(), Some(Error::SessionCreation));

    tick_until(&mut svc, &mut sink, StateId::Connected, 5);
    assert_eq!(svc.cycles(), 1);
}

#[test]
fn unreachable_agent_keeps_probing() {
    let mut ch = MockChannel::new();
    ch.agent_up = false;
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);

    for _ in 0..5 {
        svc.tick(&mut sink).unwrap();
    }
    assert_eq!(svc.state(), StateId::Probing);
    assert_eq!(svc.last_error(), Some(Error::LivenessTimeout));
    assert_eq!(svc.channel().count(|c| matches!(c, Call::PingAgent)), 4);
    assert_eq!(svc.channel().count(|c| matches!(c, Call::CreateSession(_))), 0);
}

// ── Scenario C: keepalive loss and reconnect ──────────────────

#[test]
fn two_missed_windows_stay_connected() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);

    close_window(&mut svc, &mut sink);
    close_window(&mut svc, &mut sink);
    assert_eq!(svc.state(), StateId::Connected);
    assert_eq!(svc.keepalive().misses(), 2);
}

#[test]
fn provisioning_traffic_does_not_answer_the_first_window() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);
    assert!(!svc.keepalive().had_reply());

    close_window(&mut svc, &mut sink);
    assert_eq!(svc.keepalive().misses(), 1);
}

#[test]
fn third_missed_window_closes_and_cleans_up() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);

    for _ in 0..3 {
        close_window(&mut svc, &mut sink);
    }
    assert_eq!(svc.state(), StateId::Closing);
    assert!(sink.contains(|e| matches!(e, LinkEvent::AgentLost { misses: 3 })));
    assert_eq!(svc.last_error(), Some(Error::KeepaliveExceeded { misses: 3 }));
    assert!(svc.session().is_none());

    let ch = svc.channel();
    assert_eq!(ch.count(|c| matches!(c, Call::DeleteSession)), 1);
    assert_eq!(ch.count(|c| matches!(c, Call::CloseTransport)), 1);
    assert!(!ch.has_session());
}

#[test]
fn every_window_sends_a_probe() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);
    let before = svc.channel().count(|c| matches!(c, Call::PingSession));

    close_window(&mut svc, &mut sink);
    close_window(&mut svc, &mut sink);
    assert_eq!(svc.channel().count(|c| matches!(c, Call::PingSession)), before + 2);
}

#[test]
fn reply_resets_miss_counter() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);

    close_window(&mut svc, &mut sink);
    assert_eq!(svc.keepalive().misses(), 1);

    // The probe sent at the end of the next window gets answered.
    svc.channel_mut().answer_session_pings = true;
    close_window(&mut svc, &mut sink);
    assert_eq!(svc.keepalive().misses(), 2);
    close_window(&mut svc, &mut sink);
    assert_eq!(svc.keepalive().misses(), 0);
    assert_eq!(svc.state(), StateId::Connected);
}

#[test]
fn answered_pings_keep_the_session_alive() {
    let (mut svc, mut sink) = connected(MockChannel::new());
    for _ in 0..10 {
        close_window(&mut svc, &mut sink);
    }
    assert_eq!(svc.state(), StateId::Connected);
    assert_eq!(svc.keepalive().misses(), 0);
}

#[test]
fn reconnects_after_agent_loss_with_fresh_counters() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);
    for _ in 0..3 {
        close_window(&mut svc, &mut sink);
    }
    assert_eq!(svc.state(), StateId::Closing);

    svc.channel_mut().answer_session_pings = true;
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);
    tick_until(&mut svc, &mut sink, StateId::Connected, 5);

    assert_eq!(svc.cycles(), 2);
    assert_eq!(svc.keepalive().misses(), 0);
    assert_eq!(svc.channel().count(|c| matches!(c, Call::OpenTransport)), 2);
    assert_eq!(svc.channel().data_requests().len(), 2);
    assert!(sink.contains(|e| matches!(
        e,
        LinkEvent::StateChanged {
            from: StateId::Closing,
            to: StateId::Disconnected
        }
    )));
}

// ── Transport failures ────────────────────────────────────────

#[test]
fn first_transport_failure_is_fatal() {
    let mut ch = MockChannel::new();
    ch.fail_opens = 1;
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);

    let err = svc.tick(&mut sink).unwrap_err();
    assert_eq!(err, Error::Transport(TransportError::OpenFailed));
    assert!(sink.contains(|e| matches!(e, LinkEvent::Fatal(_))));
    assert_eq!(svc.state(), StateId::Disconnected);
}

#[test]
fn run_returns_the_fatal_error() {
    let mut ch = MockChannel::new();
    ch.fail_opens = 1;
    let mut svc = make_service(ch);
    let mut sink = RecordingSink::new();

    let err = svc.run(&mut NoDelay, &mut sink);
    assert_eq!(err, Error::Transport(TransportError::OpenFailed));
    assert!(matches!(sink.events.first(), Some(LinkEvent::Started(StateId::Disconnected))));
}

#[test]
fn reopen_failure_after_a_session_is_retried() {
    let mut ch = MockChannel::new();
    ch.answer_session_pings = false;
    let (mut svc, mut sink) = connected(ch);
    for _ in 0..3 {
        close_window(&mut svc, &mut sink);
    }
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);

    svc.channel_mut().fail_opens = 2;
    svc.tick(&mut sink).unwrap();
    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Disconnected);
    assert_eq!(
        svc.last_error(),
        Some(Error::Transport(TransportError::OpenFailed))
    );

    svc.tick(&mut sink).unwrap();
    assert_eq!(svc.state(), StateId::Probing);
}

#[test]
fn shutdown_is_idempotent() {
    let (mut svc, _) = connected(MockChannel::new());
    svc.shutdown();
    svc.shutdown();

    let ch = svc.channel();
    assert_eq!(ch.count(|c| matches!(c, Call::DeleteSession)), 1);
    assert_eq!(ch.count(|c| matches!(c, Call::CloseTransport)), 1);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ClientConfig {
        ping_attempts: 0,
        ..ClientConfig::default()
    };
    let registry = TopicRegistry::standard(&config).unwrap();
    let result = ClientService::new(config, registry, MockChannel::new(), DemoSource::new("x"));
    assert!(matches!(result, Err(Error::Config(_))));
}
