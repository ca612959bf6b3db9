//! In-process data stream used by the demo binary and tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use arsupport_core::TransportError;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{AnnotationChannel, MessageSource};

/// Which sends the loopback silently loses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossPattern {
    #[default]
    None,
    /// Lose every n-th accepted send (1-based).
    EveryNth(u64),
}

#[derive(Debug)]
struct Shared {
    ready: AtomicBool,
    accepted: AtomicU64,
    lost: AtomicU64,
}

/// Send half of a loopback stream. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopbackSender {
    tx: mpsc::Sender<Bytes>,
    shared: Arc<Shared>,
    max_message_bytes: usize,
    loss: LossPattern,
}

/// Receive half of a loopback stream.
#[derive(Debug)]
pub struct LoopbackReceiver {
    rx: mpsc::Receiver<Bytes>,
}

/// Create a loopback stream holding at most `capacity` undelivered payloads.
/// The stream starts not ready; call [`LoopbackSender::set_ready`].
pub fn channel(capacity: usize, max_message_bytes: usize) -> (LoopbackSender, LoopbackReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        ready: AtomicBool::new(false),
        accepted: AtomicU64::new(0),
        lost: AtomicU64::new(0),
    });
    (
        LoopbackSender { tx, shared, max_message_bytes, loss: LossPattern::None },
        LoopbackReceiver { rx },
    )
}

impl LoopbackSender {
    pub fn with_loss(mut self, loss: LossPattern) -> Self {
        self.loss = loss;
        self
    }

    /// Mark the stream created (or torn down).
    pub fn set_ready(&self, ready: bool) {
        self.shared.ready.store(ready, Ordering::Release);
        debug!("Loopback data stream ready={}", ready);
    }

    /// Sends accepted by the channel, including ones later lost.
    pub fn accepted(&self) -> u64 {
        self.shared.accepted.load(Ordering::Relaxed)
    }

    /// Sends lost to the configured [`LossPattern`].
    pub fn lost(&self) -> u64 {
        self.shared.lost.load(Ordering::Relaxed)
    }
}

impl AnnotationChannel for LoopbackSender {
    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send_message(&self, payload: Bytes) -> Result<(), TransportError> {
        if !self.shared.ready.load(Ordering::Acquire) {
            return Err(TransportError::NotReady);
        }
        if payload.len() > self.max_message_bytes {
            return Err(TransportError::MessageTooLarge {
                len: payload.len(),
                max: self.max_message_bytes,
            });
        }

        let n = self.shared.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        if let LossPattern::EveryNth(k) = self.loss {
            if k > 0 && n % k == 0 {
                self.shared.lost.fetch_add(1, Ordering::Relaxed);
                trace!("Loopback: losing send #{} ({} bytes)", n, payload.len());
                return Ok(());
            }
        }

        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::SendFailed {
                reason: "loopback queue full".into(),
            },
            mpsc::error::TrySendError::Closed(_) => TransportError::ConnectionClosed,
        })
    }
}

#[async_trait]
impl MessageSource for LoopbackReceiver {
    async fn next_message(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}
