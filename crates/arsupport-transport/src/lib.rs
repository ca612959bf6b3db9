//! arsupport-transport: the annotation data stream
//!
//! The real transport is the RTC SDK's ordered side-channel stream. This
//! crate only describes what the protocol needs from it:
//!
//! - [`AnnotationChannel`]: fire-and-forget sends plus a ready flag.
//! - [`MessageSource`]: payloads in arrival order; may skip, never repeats.
//!
//! [`loopback`] implements both over a tokio channel for the demo binary and
//! for tests, with optional deterministic loss.

use async_trait::async_trait;
use arsupport_core::TransportError;
use bytes::Bytes;
use tokio::sync::mpsc;

pub mod loopback;

pub use loopback::{LoopbackReceiver, LoopbackSender, LossPattern};

// MARK: - AnnotationChannel

/// Send side of the annotation data stream.
///
/// Sends never block and never retry. A payload the channel cannot take is
/// reported as an error and is otherwise lost.
pub trait AnnotationChannel: Send + Sync {
    /// Whether the data stream has been created and accepts sends.
    fn is_ready(&self) -> bool;

    /// Queue one payload for delivery.
    fn send_message(&self, payload: Bytes) -> Result<(), TransportError>;
}

impl<T: AnnotationChannel + ?Sized> AnnotationChannel for std::sync::Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn send_message(&self, payload: Bytes) -> Result<(), TransportError> {
        (**self).send_message(payload)
    }
}

// MARK: - MessageSource

/// Receive side of the annotation data stream.
#[async_trait]
pub trait MessageSource: Send {
    /// Next payload in arrival order, or `None` once the stream is closed.
    async fn next_message(&mut self) -> Option<Bytes>;
}

#[async_trait]
impl MessageSource for mpsc::Receiver<Bytes> {
    async fn next_message(&mut self) -> Option<Bytes> {
        self.recv().await
    }
}
