use std::time::Duration;

use anyhow::{Context, Result};
use arsupport_core::{AnnotationConfig, ArSupportError, DrawColor, Point2D, Pose};
use arsupport_peer::{AudiencePeer, BroadcasterPeer};
use arsupport_replay::{FixedViewpoint, InMemoryScene, ReplayStateMachine};
use arsupport_transport::loopback::{self, LossPattern};
use tracing::{info, warn};

/// Remote user id the audience sees for the broadcaster.
const BROADCASTER_UID: u64 = 1;

/// Runs one scripted annotation session end to end.
///
/// # Environment
/// - `ARSUPPORT_CONFIG`: optional JSON config file
/// - `ARSUPPORT_WIRE_FORMAT`, `ARSUPPORT_FLUSH_THRESHOLD`, `ARSUPPORT_TICK_HZ`: overrides
/// - `ARSUPPORT_LOSS_EVERY`: lose every n-th message on the loopback stream
///
/// # Flow
/// 1. Build the loopback data stream and start the broadcaster tasks
/// 2. Drive the audience through the RTC callbacks until the session is active
/// 3. Draw, recolor and undo a few strokes
/// 4. Close the stream and wait for every point to be placed
pub async fn run() -> Result<()> {
    let config = load_config().context("loading annotation config")?;
    info!(
        "Config: format={:?} flush_threshold={} tick_hz={} max_message_bytes={}",
        config.wire_format, config.flush_threshold, config.tick_hz, config.max_message_bytes
    );

    let loss = std::env::var("ARSUPPORT_LOSS_EVERY")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(LossPattern::None, LossPattern::EveryNth);

    // ── Data stream + broadcaster ──────────────────────────────────────────
    let (stream_tx, stream_rx) = loopback::channel(1024, config.max_message_bytes);
    let stream_tx = stream_tx.with_loss(loss);

    // Column-major camera transform: identity rotation, 1.6 m above the origin.
    let transform = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 1.6, 0.0, 1.0,
    ];
    let camera = Pose::from_cols_array(&transform);
    let machine = ReplayStateMachine::new(InMemoryScene::new(), FixedViewpoint::at(camera), &config);
    let broadcaster = BroadcasterPeer::start(stream_rx, machine, &config);

    // ── Audience session ───────────────────────────────────────────────────
    let mut audience = AudiencePeer::new(stream_tx.clone(), &config);
    audience.on_remote_joined(BROADCASTER_UID);
    audience.on_remote_video_decoded(BROADCASTER_UID);

    // Gestures before the data stream exists are dropped.
    audience.drag(Point2D::new(5.0, 5.0), &[(0.0, 0.0), (3.0, 3.0)]);

    stream_tx.set_ready(true);
    audience.on_data_stream_created(true);
    info!("Session state: {:?}", audience.session_state());

    // ── Script ─────────────────────────────────────────────────────────────
    // Colors apply when a point is placed, so each stroke drains before the
    // next color change.
    let first = zigzag(40, 4.0, 12.0);
    audience.drag(Point2D::new(160.0, 300.0), &first);
    tokio::time::sleep(drain_time(&config, first.len())).await;

    // One stroke per remaining palette entry; the last but one gets undone.
    let colors = &DrawColor::PALETTE[1..];
    for (i, &color) in colors.iter().enumerate() {
        audience.set_color(color);
        let offset = i as f64 * 60.0;
        let stroke = circle(24, 20.0 + offset / 4.0);
        audience.drag(Point2D::new(-120.0 + offset, 80.0), &stroke);
        tokio::time::sleep(drain_time(&config, stroke.len())).await;
        if i + 2 == colors.len() {
            audience.undo();
        }
    }

    let sent = audience.stats();
    info!(
        "Audience: sent={} suppressed={} failed={} points={}",
        sent.messages_sent, sent.messages_suppressed, sent.send_failures, sent.points_sent
    );

    // ── Teardown ───────────────────────────────────────────────────────────
    audience.on_remote_left(BROADCASTER_UID);
    drop(audience);
    drop(stream_tx);

    let (decoder, machine) = broadcaster.finish().await.context("broadcaster did not finish")?;
    if decoder.missed > 0 {
        warn!("{} message(s) lost on the data stream", decoder.missed);
    }

    let replay = machine.stats();
    let scene = machine.renderer();
    info!(
        "Broadcaster: strokes={} (created={} undone={}) points placed={} discarded={} purged={}",
        machine.stroke_count(), replay.strokes_created, replay.strokes_undone,
        replay.points_placed, replay.points_discarded, replay.points_purged
    );
    for (id, node) in scene.roots() {
        let color = node.points.first().map(|p| p.color.components());
        info!("  {}: {} point(s), anchor {:?}, color {:?}", id, node.points.len(), node.anchor.position, color);
    }
    Ok(())
}

fn load_config() -> Result<AnnotationConfig, ArSupportError> {
    let mut config = match std::env::var("ARSUPPORT_CONFIG") {
        Ok(path) => {
            info!("Loading config from {}", path);
            AnnotationConfig::from_json_file(&path)?
        }
        Err(_) => AnnotationConfig::default(),
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

/// Time the broadcaster needs to place `points` points, with some slack.
fn drain_time(config: &AnnotationConfig, points: usize) -> Duration {
    Duration::from_micros(config.tick_interval_us() * (points as u64 + 10))
}

/// Pan translations tracing a zig-zag to the right.
fn zigzag(steps: usize, dx: f64, amplitude: f64) -> Vec<(f64, f64)> {
    (0..steps)
        .map(|i| {
            let y = if i % 2 == 0 { 0.0 } else { amplitude };
            (i as f64 * dx, y)
        })
        .collect()
}

/// Pan translations tracing a circle that starts and ends at the origin.
fn circle(steps: usize, radius: f64) -> Vec<(f64, f64)> {
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64 * std::f64::consts::TAU;
            (radius * t.sin(), radius * (1.0 - t.cos()))
        })
        .collect()
}
