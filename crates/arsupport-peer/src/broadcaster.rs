use std::time::Duration;

use anyhow::{Context, Result};
use arsupport_core::AnnotationConfig;
use arsupport_protocol::{AnnotationDecoder, AnnotationMessage, DecoderStats};
use arsupport_replay::{ReplayStateMachine, SceneRenderer, ViewpointProvider};
use arsupport_transport::MessageSource;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Decoded messages buffered between the pump and the replay task.
const EVENT_QUEUE: usize = 256;

// ── Decode pump ───────────────────────────────────────────────────────────────

/// Read payloads from `source`, decode them, and forward the messages in
/// order. Malformed payloads are dropped. Returns when the source closes or
/// the replay side goes away.
pub async fn run_decode_pump<S: MessageSource>(
    mut source: S,
    events: mpsc::Sender<AnnotationMessage>,
) -> DecoderStats {
    let mut decoder = AnnotationDecoder::new();
    while let Some(payload) = source.next_message().await {
        // Errors are logged and counted by the decoder.
        let Ok(msg) = decoder.decode(&payload) else { continue };
        if events.send(msg).await.is_err() {
            debug!("Replay loop gone: stopping decode pump");
            break;
        }
    }
    let stats = decoder.stats();
    info!(
        "Decode pump exiting: decoded={} malformed={} fragments_dropped={} missed={} stale={}",
        stats.decoded, stats.malformed, stats.fragments_dropped, stats.missed, stats.stale
    );
    stats
}

// ── Replay loop ───────────────────────────────────────────────────────────────

/// Own the state machine: apply messages as they arrive and place one point
/// per tick.
///
/// When `events` closes the loop keeps ticking until the queue is empty.
/// When `shutdown` fires (or its sender is dropped) the session is over: the
/// scene is torn down at once and nothing more is placed.
pub async fn run_replay_loop<R, V>(
    mut machine: ReplayStateMachine<R, V>,
    mut events: mpsc::Receiver<AnnotationMessage>,
    tick_every: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> ReplayStateMachine<R, V>
where
    R: SceneRenderer,
    V: ViewpointProvider,
{
    let mut ticker = tokio::time::interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut events_open = true;
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Replay loop: session ended after {} ticks", ticks);
                machine.teardown();
                break;
            }

            msg = events.recv(), if events_open => match msg {
                Some(msg) => machine.apply(msg),
                None => {
                    debug!("Replay loop: event stream closed, {} point(s) left", machine.pending_len());
                    events_open = false;
                }
            },

            _ = ticker.tick() => {
                ticks += 1;
                machine.tick();
                if ticks % 600 == 0 {
                    let s = machine.stats();
                    info!(
                        "Replay stats: strokes={} placed={} pending={}",
                        machine.stroke_count(), s.points_placed, machine.pending_len()
                    );
                }
                if !events_open && machine.pending_len() == 0 {
                    break;
                }
            }
        }
    }

    machine
}

// ── BroadcasterPeer ───────────────────────────────────────────────────────────

/// The AR-camera peer: spawns the decode pump and the replay loop.
pub struct BroadcasterPeer;

impl BroadcasterPeer {
    pub fn start<S, R, V>(
        source: S,
        machine: ReplayStateMachine<R, V>,
        config: &AnnotationConfig,
    ) -> BroadcasterHandle<R, V>
    where
        S: MessageSource + 'static,
        R: SceneRenderer + Send + 'static,
        V: ViewpointProvider + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let tick_every = Duration::from_micros(config.tick_interval_us());

        info!("Broadcaster starting: tick every {:?}", tick_every);
        let pump = tokio::spawn(run_decode_pump(source, event_tx));
        let replay = tokio::spawn(run_replay_loop(machine, event_rx, tick_every, shutdown_rx));

        BroadcasterHandle { pump, replay, shutdown: shutdown_tx }
    }
}

/// Running broadcaster tasks.
pub struct BroadcasterHandle<R, V> {
    pump: JoinHandle<DecoderStats>,
    replay: JoinHandle<ReplayStateMachine<R, V>>,
    shutdown: oneshot::Sender<()>,
}

impl<R, V> BroadcasterHandle<R, V> {
    /// Wait for the data stream to close and every pending point to be
    /// placed.
    pub async fn finish(self) -> Result<(DecoderStats, ReplayStateMachine<R, V>)> {
        let Self { pump, replay, shutdown } = self;
        let stats = pump.await.context("decode pump task failed")?;
        let machine = replay.await.context("replay task failed")?;
        drop(shutdown);
        Ok((stats, machine))
    }

    /// End the session now: pending points are dropped and the scene is
    /// cleared.
    pub async fn stop(self) -> Result<ReplayStateMachine<R, V>> {
        let Self { pump, replay, shutdown } = self;
        let _ = shutdown.send(());
        let machine = replay.await.context("replay task failed")?;
        pump.abort();
        Ok(machine)
    }
}
