//! arsupport-input: annotation encoder (annotating peer)
//!
//! Converts a pan gesture on the remote video view into protocol messages:
//!
//! ```text
//! touch_down(p)            remember the gesture origin
//! pan(Began, Δ)            → touch-start, batch origin + Δ
//! pan(Changed, Δ) …        batch origin + Δ; flush every `flush_threshold` points
//! pan(Ended, _)            → points (remainder), touch-end
//! undo()                   → undo
//! set_color(c)             → color
//! ```
//!
//! Nothing is sent unless the session is active and the data stream is
//! ready; suppressed messages are dropped, not queued.

use arsupport_core::{AnnotationConfig, DrawColor, Point2D, SessionState};
use arsupport_protocol::{AnnotationMessage, MessageEncoder};
use arsupport_transport::AnnotationChannel;
use bytes::Bytes;
use tracing::{debug, info, trace, warn};

// ── PanPhase ──────────────────────────────────────────────────────────────────

/// Phase of a pan gesture as reported by the platform recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanPhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

// ── EncoderStats ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub messages_sent: u64,
    /// Messages not sent because the session or data stream was down.
    pub messages_suppressed: u64,
    /// Messages the channel refused.
    pub send_failures: u64,
    pub points_sent: u64,
}

// ── AnnotationEncoder ─────────────────────────────────────────────────────────

pub struct AnnotationEncoder<C: AnnotationChannel> {
    channel: C,
    wire: MessageEncoder,
    session: SessionState,
    flush_threshold: usize,
    max_message_bytes: usize,
    color: DrawColor,
    /// Origin of the current drag; `None` outside a drag.
    touch_start: Option<Point2D>,
    /// Points not yet sent.
    batch: Vec<Point2D>,
    /// Local trace of the current drag, drawn on the sending view.
    echo: Vec<Point2D>,
    stats: EncoderStats,
}

impl<C: AnnotationChannel> AnnotationEncoder<C> {
    pub fn new(channel: C, config: &AnnotationConfig) -> Self {
        Self {
            channel,
            wire: MessageEncoder::new(config.wire_format),
            session: SessionState::Inactive,
            flush_threshold: config.flush_threshold,
            max_message_bytes: config.max_message_bytes,
            color: config.initial_color,
            touch_start: None,
            batch: Vec::new(),
            echo: Vec::new(),
            stats: EncoderStats::default(),
        }
    }

    pub fn set_session_state(&mut self, state: SessionState) {
        if self.session != state {
            info!("Encoder session {:?} → {:?}", self.session, state);
            self.session = state;
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    pub fn color(&self) -> DrawColor {
        self.color
    }

    pub fn echo(&self) -> &[Point2D] {
        &self.echo
    }

    pub fn batched(&self) -> &[Point2D] {
        &self.batch
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    // ── Gesture input ────────────────────────────────────────────────────────

    /// First contact of a touch, in view pixels.
    pub fn touch_down(&mut self, position: Point2D) {
        if !self.session.is_active() {
            return;
        }
        trace!("touch_down at {}", position);
        self.touch_start = Some(position);
        self.echo.clear();
    }

    /// Pan recognizer callback. `dx, dy` is the translation since the
    /// gesture began.
    pub fn pan(&mut self, phase: PanPhase, dx: f64, dy: f64) {
        if phase == PanPhase::Began {
            self.send(AnnotationMessage::TouchStart);
        }

        match phase {
            PanPhase::Began | PanPhase::Changed => self.record(dx, dy),
            PanPhase::Ended | PanPhase::Cancelled => self.finish(),
        }
    }

    fn record(&mut self, dx: f64, dy: f64) {
        if !self.session.is_active() {
            return;
        }
        // A drag without a touch_down is an accidental swipe.
        let Some(start) = self.touch_start else { return };
        let point = start.translated(dx, dy);
        if !point.is_finite() {
            warn!("Ignoring non-finite pan translation ({}, {})", dx, dy);
            return;
        }
        self.batch.push(point);
        self.echo.push(point);
        if self.flush_threshold > 0 && self.batch.len() >= self.flush_threshold {
            self.flush();
        }
    }

    fn finish(&mut self) {
        if !self.batch.is_empty() {
            self.flush();
        }
        self.send(AnnotationMessage::TouchEnd);
        if let Some(start) = self.touch_start.take() {
            debug!("Drag from {} ended ({} echoed points)", start, self.echo.len());
        }
        self.batch.clear();
        self.echo.clear();
    }

    /// Send everything batched so far as one or more `points` messages.
    pub fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let points = std::mem::take(&mut self.batch);
        if !self.can_send() {
            self.stats.messages_suppressed += 1;
            trace!("Dropping {} batched points: data stream not ready", points.len());
            return;
        }
        for chunk in self.wire.encode_points(&points, self.max_message_bytes) {
            if self.send_payload(chunk.payload, "points") {
                self.stats.points_sent += chunk.points as u64;
            }
        }
    }

    // ── Buttons ──────────────────────────────────────────────────────────────

    /// Discard the local trace and ask the receiver to remove its latest stroke.
    pub fn undo(&mut self) {
        self.echo.clear();
        self.send(AnnotationMessage::Undo);
    }

    /// Select a new draw color. Applies locally at once; the receiver learns
    /// about it only if the data stream is ready.
    pub fn set_color(&mut self, color: DrawColor) {
        self.color = color;
        self.send(AnnotationMessage::Color(color));
    }

    // ── Sending ──────────────────────────────────────────────────────────────

    fn can_send(&self) -> bool {
        self.session.is_active() && self.channel.is_ready()
    }

    fn send(&mut self, msg: AnnotationMessage) {
        if !self.can_send() {
            self.stats.messages_suppressed += 1;
            trace!("Suppressed {}: data stream not ready", msg.kind());
            return;
        }
        let payload = self.wire.encode(&msg);
        self.send_payload(payload, msg.kind());
    }

    fn send_payload(&mut self, payload: Bytes, kind: &str) -> bool {
        let len = payload.len();
        match self.channel.send_message(payload) {
            Ok(()) => {
                self.stats.messages_sent += 1;
                debug!("Sent {} ({} bytes)", kind, len);
                true
            }
            Err(e) => {
                self.stats.send_failures += 1;
                let n = self.stats.send_failures;
                if n <= 10 || n % 100 == 0 {
                    warn!("Send #{} of {} failed: {}", n, kind, e);
                }
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
