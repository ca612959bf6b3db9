use arsupport_core::{Point2D, WireFormat};
use bytes::Bytes;
use tracing::warn;

use crate::message::AnnotationMessage;
use crate::{json, text};

/// One `points` payload and the number of points it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsPayload {
    pub payload: Bytes,
    pub points: usize,
}

/// Turns typed messages into payloads for the configured wire format.
///
/// JSON payloads are numbered from 0 in send order; text payloads carry no
/// sequence number.
#[derive(Debug)]
pub struct MessageEncoder {
    format: WireFormat,
    next_seq: u64,
}

impl MessageEncoder {
    pub fn new(format: WireFormat) -> Self {
        Self { format, next_seq: 0 }
    }

    pub fn encode(&mut self, msg: &AnnotationMessage) -> Bytes {
        match self.format {
            WireFormat::Text => Bytes::from(text::encode(msg)),
            WireFormat::Json => {
                let seq = self.next_seq;
                self.next_seq += 1;
                Bytes::from(json::encode(seq, msg))
            }
        }
    }

    /// Encode a points batch as one or more payloads no larger than
    /// `max_bytes`, splitting the batch in order where needed.
    ///
    /// A single point that still does not fit is dropped.
    pub fn encode_points(&mut self, points: &[Point2D], max_bytes: usize) -> Vec<PointsPayload> {
        // Every chunk holds at least one point, so no chunk's seq exceeds this.
        let last_seq = self.next_seq.saturating_add(points.len() as u64);
        let mut chunks = Vec::new();
        self.split_to_fit(points, max_bytes, last_seq, &mut chunks);
        chunks
            .into_iter()
            .map(|chunk| PointsPayload {
                payload: self.encode(&AnnotationMessage::Points(chunk.to_vec())),
                points: chunk.len(),
            })
            .collect()
    }

    fn split_to_fit<'a>(
        &self,
        points: &'a [Point2D],
        max_bytes: usize,
        last_seq: u64,
        out: &mut Vec<&'a [Point2D]>,
    ) {
        if points.is_empty() {
            return;
        }
        if self.measure(points, last_seq) <= max_bytes {
            out.push(points);
            return;
        }
        if points.len() == 1 {
            warn!("Dropping point {}: does not fit in {} bytes", points[0], max_bytes);
            return;
        }
        let (head, tail) = points.split_at(points.len() / 2);
        self.split_to_fit(head, max_bytes, last_seq, out);
        self.split_to_fit(tail, max_bytes, last_seq, out);
    }

    /// Encoded size of a points batch. JSON is measured with the highest
    /// sequence number this batch can use, so the real payload is never
    /// larger.
    fn measure(&self, points: &[Point2D], last_seq: u64) -> usize {
        let msg = AnnotationMessage::Points(points.to_vec());
        match self.format {
            WireFormat::Text => text::encode(&msg).len(),
            WireFormat::Json => json::encode(last_seq, &msg).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Point2D> {
        (0..n).map(|i| Point2D::new(100.0 + i as f64, 200.5 + i as f64)).collect()
    }

    #[test]
    fn json_sequence_increments() {
        let mut enc = MessageEncoder::new(WireFormat::Json);
        let a = enc.encode(&AnnotationMessage::TouchStart);
        let b = enc.encode(&AnnotationMessage::TouchEnd);
        assert!(a.starts_with(br#"{"seq":0,"#));
        assert!(b.starts_with(br#"{"seq":1,"#));
    }

    #[test]
    fn small_batch_is_one_payload() {
        let mut enc = MessageEncoder::new(WireFormat::Text);
        let out = enc.encode_points(&line(3), 1024);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].points, 3);
        assert_eq!(&out[0].payload[..], b"[(100.0, 200.5), (101.0, 201.5), (102.0, 202.5)]");
    }

    #[test]
    fn large_batch_is_split_in_order() {
        for format in [WireFormat::Text, WireFormat::Json] {
            let mut enc = MessageEncoder::new(format);
            let pts = line(200);
            let out = enc.encode_points(&pts, 256);
            assert!(out.len() > 1, "{format:?} should split");
            assert!(out.iter().all(|p| p.payload.len() <= 256));
            assert_eq!(out.iter().map(|p| p.points).sum::<usize>(), 200);

            let mut dec = crate::AnnotationDecoder::new();
            let mut rebuilt = Vec::new();
            for p in &out {
                match dec.decode(&p.payload).unwrap() {
                    AnnotationMessage::Points(p) => rebuilt.extend(p),
                    other => panic!("unexpected {other:?}"),
                }
            }
            assert_eq!(rebuilt, pts);
        }
    }

    #[test]
    fn one_point_fits_at_the_smallest_allowed_size() {
        let wide = Point2D::new(-1.2345678901234567e-300, -9.876543210987654e300);
        for format in [WireFormat::Text, WireFormat::Json] {
            let mut enc = MessageEncoder::new(format);
            let max = format.min_message_bytes();
            let out = enc.encode_points(&[wide], max);
            assert_eq!(out.len(), 1, "{format:?} dropped the point at {max} bytes");
            assert!(out[0].payload.len() <= max);
        }
    }

    #[test]
    fn json_size_uses_the_real_sequence_number() {
        // With a 20-digit seq this point needs 65 bytes; at seq 0 it needs far fewer.
        let mut enc = MessageEncoder::new(WireFormat::Json);
        let out = enc.encode_points(&[Point2D::new(1.0, 2.0)], 64);
        assert_eq!(out.len(), 1);
        assert!(out[0].payload.len() <= 64);
    }

    #[test]
    fn empty_batch_produces_nothing() {
        let mut enc = MessageEncoder::new(WireFormat::Json);
        assert!(enc.encode_points(&[], 1024).is_empty());
        // No sequence number consumed.
        assert!(enc.encode(&AnnotationMessage::Undo).starts_with(br#"{"seq":0,"#));
    }
}
