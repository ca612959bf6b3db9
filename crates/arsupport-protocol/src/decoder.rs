use arsupport_core::{DecodeError, WireFormat};
use tracing::{debug, info, warn};

use crate::message::AnnotationMessage;
use crate::{json, text};

/// Counters kept by [`AnnotationDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Messages accepted.
    pub decoded: u64,
    /// Messages rejected as malformed.
    pub malformed: u64,
    /// Point pairs dropped from otherwise valid batches.
    pub fragments_dropped: u64,
    /// JSON messages skipped over by a sequence gap.
    pub missed: u64,
    /// JSON messages rejected for a non-increasing sequence number.
    pub stale: u64,
    /// Times the sender's sequence restarted at 0.
    pub restarts: u64,
}

/// Parses payloads from the data stream into typed messages.
///
/// The encoding is detected per payload: anything starting with `{` is JSON,
/// everything else is the text encoding. A rejected payload never changes
/// decoder state apart from the counters.
///
/// One decoder lives as long as the data stream. A JSON `seq` of 0 after a
/// higher one means the sending peer started a new encoder; tracking restarts
/// from there instead of rejecting it as stale.
#[derive(Debug, Default)]
pub struct AnnotationDecoder {
    last_seq: Option<u64>,
    stats: DecoderStats,
}

impl AnnotationDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Forget the sequence position, e.g. when a new session starts on the
    /// same stream. Counters are kept.
    pub fn reset(&mut self) {
        self.last_seq = None;
    }

    pub fn decode(&mut self, payload: &[u8]) -> Result<AnnotationMessage, DecodeError> {
        let result = self.decode_inner(payload);
        match &result {
            Ok(msg) => {
                self.stats.decoded += 1;
                debug!("Decoded {} message ({} bytes)", msg.kind(), payload.len());
            }
            Err(e) => {
                self.stats.malformed += 1;
                let n = self.stats.malformed;
                if n <= 10 || n % 100 == 0 {
                    warn!("Dropping malformed message #{} ({} bytes): {}", n, payload.len(), e);
                }
            }
        }
        result
    }

    fn decode_inner(&mut self, payload: &[u8]) -> Result<AnnotationMessage, DecodeError> {
        let decoded = match detect_format(payload) {
            WireFormat::Text => text::decode(payload)?,
            WireFormat::Json => {
                let (seq, decoded) = json::decode(payload)?;
                self.accept_seq(seq)?;
                decoded
            }
        };
        if decoded.fragments_dropped > 0 {
            self.stats.fragments_dropped += decoded.fragments_dropped as u64;
            debug!("Dropped {} malformed point fragment(s)", decoded.fragments_dropped);
        }
        Ok(decoded.message)
    }

    fn accept_seq(&mut self, seq: u64) -> Result<(), DecodeError> {
        let expected = match self.last_seq {
            Some(last) if seq == 0 && last > 0 => {
                self.stats.restarts += 1;
                info!("Sender sequence restarted at 0 (last was {})", last);
                0
            }
            Some(last) if seq <= last => {
                self.stats.stale += 1;
                return Err(DecodeError::StaleSequence { seq, last });
            }
            Some(last) => last + 1,
            None => 0,
        };
        if seq > expected {
            let gap = seq - expected;
            self.stats.missed += gap;
            warn!("Sequence gap: expected {}, got {} ({} message(s) lost)", expected, seq, gap);
        }
        self.last_seq = Some(seq);
        Ok(())
    }
}

fn detect_format(payload: &[u8]) -> WireFormat {
    match payload.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => WireFormat::Json,
        _ => WireFormat::Text,
    }
}
