//! Session gating shared by both peers.
//!
//! A session is `Active` once the remote peer's video has been decoded and
//! the annotation data stream has been created. Either peer leaving drops it
//! back to `Inactive`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Tracks the RTC callbacks that gate annotation traffic.
#[derive(Debug, Default)]
pub struct SessionTracker {
    remote_user: Option<u64>,
    remote_video_decoded: bool,
    data_stream_ready: bool,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote user joined. Only the first one is tracked.
    pub fn on_remote_joined(&mut self, uid: u64) {
        if self.remote_user.is_none() {
            info!("Remote user {} joined", uid);
            self.remote_user = Some(uid);
        } else {
            debug!("Ignoring additional remote user {}", uid);
        }
    }

    /// First remote video frame decoded for `uid`.
    pub fn on_remote_video_decoded(&mut self, uid: u64) {
        if self.remote_user == Some(uid) {
            self.remote_video_decoded = true;
            debug!("Remote video decoded for {} (state={:?})", uid, self.state());
        }
    }

    /// Result of creating the ordered data stream.
    pub fn on_data_stream_created(&mut self, ok: bool) {
        self.data_stream_ready = ok;
        info!("Data stream created: ok={} (state={:?})", ok, self.state());
    }

    /// The tracked remote user went offline.
    pub fn on_remote_left(&mut self, uid: u64) {
        if self.remote_user == Some(uid) {
            info!("Remote user {} left: session inactive", uid);
            self.reset();
        }
    }

    /// The local user left the channel.
    pub fn on_local_left(&mut self) {
        info!("Left channel: session inactive");
        self.reset();
    }

    pub fn data_stream_ready(&self) -> bool {
        self.data_stream_ready
    }

    pub fn state(&self) -> SessionState {
        if self.remote_user.is_some() && self.remote_video_decoded && self.data_stream_ready {
            SessionState::Active
        } else {
            SessionState::Inactive
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
