//! Sequenced JSON encoding.
//!
//! Each message is a flat object with a `seq` counter and a `kind` tag.
//! Points are decoded pair by pair so one bad entry does not cost the batch.

use arsupport_core::{DecodeError, DrawColor, Point2D};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{AnnotationMessage, Decoded};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Body {
    TouchStart,
    TouchEnd,
    Undo,
    Color { rgba: Vec<f64> },
    Points { points: Vec<Value> },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    seq: u64,
    #[serde(flatten)]
    body: Body,
}

pub fn encode(seq: u64, msg: &AnnotationMessage) -> Vec<u8> {
    let body = match msg {
        AnnotationMessage::TouchStart => Body::TouchStart,
        AnnotationMessage::TouchEnd => Body::TouchEnd,
        AnnotationMessage::Undo => Body::Undo,
        AnnotationMessage::Color(c) => Body::Color { rgba: c.components().to_vec() },
        AnnotationMessage::Points(points) => Body::Points {
            points: points.iter().map(|p| serde_json::json!([p.x, p.y])).collect(),
        },
    };
    // Serialising this envelope cannot fail: no maps with non-string keys.
    serde_json::to_vec(&Envelope { seq, body }).unwrap_or_default()
}

/// Decode one JSON message, returning its sequence number.
pub fn decode(payload: &[u8]) -> Result<(u64, Decoded), DecodeError> {
    let env: Envelope = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::Json { reason: e.to_string() })?;

    let decoded = match env.body {
        Body::TouchStart => Decoded::clean(AnnotationMessage::TouchStart),
        Body::TouchEnd => Decoded::clean(AnnotationMessage::TouchEnd),
        Body::Undo => Decoded::clean(AnnotationMessage::Undo),
        Body::Color { rgba } => {
            let components: [f64; 4] = rgba
                .as_slice()
                .try_into()
                .map_err(|_| DecodeError::ColorComponentCount { found: rgba.len() })?;
            if let Some(bad) = components.iter().find(|v| !v.is_finite()) {
                return Err(DecodeError::InvalidNumber { token: bad.to_string() });
            }
            Decoded::clean(AnnotationMessage::Color(DrawColor::from_components(components)))
        }
        Body::Points { points: raw } => {
            let points: Vec<Point2D> = raw.iter().filter_map(parse_pair).collect();
            if points.is_empty() {
                return Err(DecodeError::NoValidPoints { fragments: raw.len() });
            }
            Decoded {
                fragments_dropped: raw.len() - points.len(),
                message: AnnotationMessage::Points(points),
            }
        }
    };
    Ok((env.seq, decoded))
}

fn parse_pair(v: &Value) -> Option<Point2D> {
    let [x, y] = <[f64; 2]>::deserialize(v).ok()?;
    (x.is_finite() && y.is_finite()).then(|| Point2D::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_flat() {
        let wire = encode(7, &AnnotationMessage::Undo);
        assert_eq!(std::str::from_utf8(&wire).unwrap(), r#"{"seq":7,"kind":"undo"}"#);
    }

    #[test]
    fn points_survive_encoding() {
        let pts = vec![Point2D::new(10.0, 10.0), Point2D::new(12.0, 11.0), Point2D::new(15.0, 13.0)];
        let wire = encode(2, &AnnotationMessage::Points(pts.clone()));
        let (seq, d) = decode(&wire).unwrap();
        assert_eq!(seq, 2);
        assert_eq!(d.message, AnnotationMessage::Points(pts));
    }

    #[test]
    fn bad_pair_is_dropped_individually() {
        let wire = br#"{"seq":1,"kind":"points","points":[[1.0,2.0],["x",3.0],[4.0],[5.0,6.0]]}"#;
        let (_, d) = decode(wire).unwrap();
        assert_eq!(d.fragments_dropped, 2);
        assert_eq!(
            d.message,
            AnnotationMessage::Points(vec![Point2D::new(1.0, 2.0), Point2D::new(5.0, 6.0)])
        );
    }

    #[test]
    fn color_arity_is_checked() {
        let wire = br#"{"seq":1,"kind":"color","rgba":[1.0,0.0,0.0]}"#;
        assert_eq!(decode(wire).unwrap_err(), DecodeError::ColorComponentCount { found: 3 });
    }

    #[test]
    fn unknown_kind_is_a_json_error() {
        let wire = br#"{"seq":1,"kind":"erase_all"}"#;
        assert!(matches!(decode(wire), Err(DecodeError::Json { .. })));
    }
}
