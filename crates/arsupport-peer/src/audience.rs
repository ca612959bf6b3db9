use arsupport_core::{AnnotationConfig, DrawColor, Point2D, SessionState, SessionTracker};
use arsupport_input::{AnnotationEncoder, EncoderStats, PanPhase};
use arsupport_transport::AnnotationChannel;

/// The annotating peer: RTC session callbacks plus the gesture encoder.
///
/// Every session callback re-derives the encoder's gate, so gestures are only
/// encoded while the remote video is up and the data stream exists.
pub struct AudiencePeer<C: AnnotationChannel> {
    session: SessionTracker,
    encoder: AnnotationEncoder<C>,
}

impl<C: AnnotationChannel> AudiencePeer<C> {
    pub fn new(channel: C, config: &AnnotationConfig) -> Self {
        Self {
            session: SessionTracker::new(),
            encoder: AnnotationEncoder::new(channel, config),
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn encoder(&self) -> &AnnotationEncoder<C> {
        &self.encoder
    }

    pub fn stats(&self) -> EncoderStats {
        self.encoder.stats()
    }

    // ── RTC callbacks ────────────────────────────────────────────────────────

    pub fn on_remote_joined(&mut self, uid: u64) {
        self.session.on_remote_joined(uid);
        self.sync_gate();
    }

    pub fn on_remote_video_decoded(&mut self, uid: u64) {
        self.session.on_remote_video_decoded(uid);
        self.sync_gate();
    }

    pub fn on_data_stream_created(&mut self, ok: bool) {
        self.session.on_data_stream_created(ok);
        self.sync_gate();
    }

    pub fn on_remote_left(&mut self, uid: u64) {
        self.session.on_remote_left(uid);
        self.sync_gate();
    }

    pub fn leave(&mut self) {
        self.session.on_local_left();
        self.sync_gate();
    }

    fn sync_gate(&mut self) {
        self.encoder.set_session_state(self.session.state());
    }

    // ── UI input ─────────────────────────────────────────────────────────────

    pub fn touch_down(&mut self, position: Point2D) {
        self.encoder.touch_down(position);
    }

    pub fn pan(&mut self, phase: PanPhase, dx: f64, dy: f64) {
        self.encoder.pan(phase, dx, dy);
    }

    /// Convenience: a complete drag from `start` through `deltas`, each
    /// relative to `start`.
    pub fn drag(&mut self, start: Point2D, deltas: &[(f64, f64)]) {
        self.touch_down(start);
        for (i, &(dx, dy)) in deltas.iter().enumerate() {
            let phase = if i == 0 { PanPhase::Began } else { PanPhase::Changed };
            self.pan(phase, dx, dy);
        }
        self.pan(PanPhase::Ended, 0.0, 0.0);
    }

    pub fn undo(&mut self) {
        self.encoder.undo();
    }

    pub fn set_color(&mut self, color: DrawColor) {
        self.encoder.set_color(color);
    }
}
