use std::time::Duration;

use arsupport_core::{AnnotationConfig, DrawColor, Point2D, Pose, StrokeId, WireFormat};
use arsupport_peer::{run_decode_pump, AudiencePeer, BroadcasterPeer};
use arsupport_replay::{FixedViewpoint, InMemoryScene, ReplayStateMachine};
use arsupport_transport::loopback::{self, LossPattern};
use bytes::Bytes;
use tokio::sync::mpsc;

fn config(format: WireFormat) -> AnnotationConfig {
    AnnotationConfig {
        wire_format: format,
        flush_threshold: 0,
        tick_hz: 1000,
        ..Default::default()
    }
}

fn replay(cfg: &AnnotationConfig) -> ReplayStateMachine<InMemoryScene, FixedViewpoint> {
    ReplayStateMachine::new(InMemoryScene::new(), FixedViewpoint::at(Pose::default()), cfg)
}

fn connect(audience: &mut AudiencePeer<loopback::LoopbackSender>) {
    audience.on_remote_joined(1);
    audience.on_remote_video_decoded(1);
    audience.on_data_stream_created(true);
}

#[tokio::test]
async fn one_drag_arrives_as_one_stroke_in_order() {
    for format in [WireFormat::Text, WireFormat::Json] {
        let cfg = config(format);
        let (tx, rx) = loopback::channel(64, cfg.max_message_bytes);
        tx.set_ready(true);

        let broadcaster = BroadcasterPeer::start(rx, replay(&cfg), &cfg);
        let mut audience = AudiencePeer::new(tx, &cfg);
        connect(&mut audience);
        assert!(audience.session_state().is_active());

        audience.drag(Point2D::new(10.0, 10.0), &[(0.0, 0.0), (2.0, 1.0), (5.0, 3.0)]);
        assert_eq!(audience.stats().messages_sent, 3);
        drop(audience);

        let (stats, machine) = broadcaster.finish().await.unwrap();
        assert_eq!(stats.decoded, 3, "{format:?}");
        assert_eq!(stats.malformed, 0);

        let node = machine.renderer().node(StrokeId(0)).expect("stroke placed");
        assert_eq!(node.points.len(), 3);
        let xs: Vec<f32> = node.points.iter().map(|p| p.world.x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "points out of order: {xs:?}");
    }
}

#[tokio::test]
async fn undo_and_color_cross_the_wire() {
    let cfg = config(WireFormat::Json);
    let (tx, rx) = loopback::channel(64, cfg.max_message_bytes);
    tx.set_ready(true);

    let broadcaster = BroadcasterPeer::start(rx, replay(&cfg), &cfg);
    let mut audience = AudiencePeer::new(tx, &cfg);
    connect(&mut audience);

    // Colors apply at placement, so let each drag drain before recoloring.
    let drained = Duration::from_millis(50);
    audience.drag(Point2D::new(0.0, 0.0), &[(0.0, 0.0), (1.0, 1.0)]);
    tokio::time::sleep(drained).await;
    audience.set_color(DrawColor::SYSTEM_RED);
    audience.drag(Point2D::new(50.0, 50.0), &[(0.0, 0.0), (1.0, 1.0)]);
    tokio::time::sleep(drained).await;
    audience.set_color(DrawColor::SYSTEM_GREEN);
    audience.drag(Point2D::new(90.0, 90.0), &[(0.0, 0.0)]);
    audience.undo();
    drop(audience);

    let (_, machine) = broadcaster.finish().await.unwrap();
    assert_eq!(machine.stroke_count(), 2);
    assert_eq!(machine.color(), DrawColor::SYSTEM_GREEN);

    let scene = machine.renderer();
    assert!(scene.node(StrokeId(2)).is_none());
    let first = scene.node(StrokeId(0)).unwrap();
    let second = scene.node(StrokeId(1)).unwrap();
    assert!(first.points.iter().all(|p| p.color == DrawColor::SYSTEM_BLUE));
    assert!(second.points.iter().all(|p| p.color == DrawColor::SYSTEM_RED));
    assert_eq!(scene.point_count(), 4);
}

#[tokio::test]
async fn lost_messages_are_counted_not_fatal() {
    let cfg = AnnotationConfig { flush_threshold: 1, ..config(WireFormat::Json) };
    let (tx, rx) = loopback::channel(256, cfg.max_message_bytes);
    let tx = tx.with_loss(LossPattern::EveryNth(4));
    tx.set_ready(true);

    let broadcaster = BroadcasterPeer::start(rx, replay(&cfg), &cfg);
    let mut audience = AudiencePeer::new(tx, &cfg);
    connect(&mut audience);

    let deltas: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, 0.0)).collect();
    audience.drag(Point2D::new(100.0, 100.0), &deltas);
    let sent = audience.stats().messages_sent;
    drop(audience);

    let (stats, machine) = broadcaster.finish().await.unwrap();
    assert_eq!(stats.missed, sent / 4);
    assert_eq!(stats.decoded, sent - sent / 4);
    // touch-start is the first send and survives; some points did not.
    assert_eq!(machine.stroke_count(), 1);
    assert!(machine.renderer().point_count() < 20);
}

#[tokio::test]
async fn nothing_is_sent_before_the_data_stream_exists() {
    let cfg = config(WireFormat::Text);
    let (tx, rx) = loopback::channel(64, cfg.max_message_bytes);

    let broadcaster = BroadcasterPeer::start(rx, replay(&cfg), &cfg);
    let mut audience = AudiencePeer::new(tx, &cfg);
    audience.on_remote_joined(1);
    audience.on_remote_video_decoded(1);
    audience.on_data_stream_created(false);
    audience.drag(Point2D::new(0.0, 0.0), &[(0.0, 0.0), (1.0, 1.0)]);
    assert_eq!(audience.stats().messages_sent, 0);
    drop(audience);

    let (stats, machine) = broadcaster.finish().await.unwrap();
    assert_eq!(stats.decoded, 0);
    assert_eq!(machine.stroke_count(), 0);
}

#[tokio::test]
async fn malformed_payloads_do_not_stop_the_pump() {
    let (tx, rx) = mpsc::channel::<Bytes>(16);
    let (event_tx, mut event_rx) = mpsc::channel(16);
    let pump = tokio::spawn(run_decode_pump(rx, event_tx));

    let payloads: [&[u8]; 5] = [
        b"touch-start",
        b"color: [1.0, 0.0]",
        b"(1.0, 2.0), (bad), (3.0, 4.0)",
        b"\xff\xfe",
        b"touch-end",
    ];
    for payload in payloads {
        tx.send(Bytes::copy_from_slice(payload)).await.unwrap();
    }
    drop(tx);

    let stats = pump.await.unwrap();
    assert_eq!(stats.decoded, 3);
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.fragments_dropped, 1);

    let mut kinds = Vec::new();
    while let Some(msg) = event_rx.recv().await {
        kinds.push(msg.kind());
    }
    assert_eq!(kinds, ["touch-start", "points", "touch-end"]);
}

#[tokio::test]
async fn stopping_the_session_clears_the_scene() {
    let cfg = AnnotationConfig { tick_hz: 1, ..config(WireFormat::Text) };
    let (tx, rx) = loopback::channel(64, cfg.max_message_bytes);
    tx.set_ready(true);

    let broadcaster = BroadcasterPeer::start(rx, replay(&cfg), &cfg);
    let mut audience = AudiencePeer::new(tx, &cfg);
    connect(&mut audience);
    let deltas: Vec<(f64, f64)> = (0..30).map(|i| (i as f64, i as f64)).collect();
    audience.drag(Point2D::new(0.0, 0.0), &deltas);

    // At one tick per second only the first point can have been placed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let machine = broadcaster.stop().await.unwrap();
    assert_eq!(machine.stroke_count(), 0);
    assert_eq!(machine.pending_len(), 0);
    assert_eq!(machine.renderer().root_count(), 0);
    assert!(machine.stats().points_placed <= 1);
}
