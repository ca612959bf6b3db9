//! arsupport-peer: the two halves of an annotation session
//!
//! ```text
//! Audience (annotating)                     Broadcaster (AR camera)
//! ─────────────────────                     ──────────────────────────────
//! AudiencePeer                              BroadcasterPeer::start
//!   SessionTracker → gate                     decode pump task
//!   AnnotationEncoder ── data stream ──────►    MessageSource → AnnotationDecoder
//!                                                  │ mpsc<AnnotationMessage>
//!                                                  ▼
//!                                             replay task (owns the state machine)
//!                                               apply(msg) | tick() every frame
//! ```

pub mod audience;
pub mod broadcaster;

pub use audience::AudiencePeer;
pub use broadcaster::{run_decode_pump, run_replay_loop, BroadcasterHandle, BroadcasterPeer};
