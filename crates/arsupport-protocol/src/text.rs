//! Legacy text encoding.
//!
//! Grammar (ASCII):
//!
//! ```text
//! message = "touch-start" | "touch-end" | "undo" | color | points
//! color   = "color:" ws "[" number "," number "," number "," number "]"
//! points  = ["["] pair { ", " pair } ["]"]
//! pair    = "(" number "," number ")"
//! ```
//!
//! Pairs are split on the literal `"), ("`; each fragment is then stripped
//! of brackets and parentheses and must hold exactly two numbers. Bad
//! fragments are dropped one by one.

use std::fmt::Write as _;

use arsupport_core::{DecodeError, DrawColor, Point2D};

use crate::message::{AnnotationMessage, Decoded};

pub const TOUCH_START: &str = "touch-start";
pub const TOUCH_END: &str = "touch-end";
pub const UNDO: &str = "undo";
pub const COLOR_PREFIX: &str = "color:";
pub const PAIR_SEPARATOR: &str = "), (";

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Render a message in the text encoding.
///
/// Numbers use Rust's shortest round-trip float formatting, so decoding the
/// result yields bit-identical values.
pub fn encode(msg: &AnnotationMessage) -> String {
    match msg {
        AnnotationMessage::TouchStart => TOUCH_START.to_owned(),
        AnnotationMessage::TouchEnd => TOUCH_END.to_owned(),
        AnnotationMessage::Undo => UNDO.to_owned(),
        AnnotationMessage::Color(c) => format!(
            "{} [{:?}, {:?}, {:?}, {:?}]",
            COLOR_PREFIX, c.red, c.green, c.blue, c.alpha
        ),
        AnnotationMessage::Points(points) => {
            let mut out = String::with_capacity(2 + points.len() * 20);
            out.push('[');
            for (i, p) in points.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{p}");
            }
            out.push(']');
            out
        }
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

pub fn decode(payload: &[u8]) -> Result<Decoded, DecodeError> {
    if !payload.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotAscii)?.trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    match text {
        TOUCH_START => Ok(Decoded::clean(AnnotationMessage::TouchStart)),
        TOUCH_END => Ok(Decoded::clean(AnnotationMessage::TouchEnd)),
        UNDO => Ok(Decoded::clean(AnnotationMessage::Undo)),
        s if s.starts_with(COLOR_PREFIX) => {
            let color = parse_color(&s[COLOR_PREFIX.len()..])?;
            Ok(Decoded::clean(AnnotationMessage::Color(color)))
        }
        s => parse_points(s),
    }
}

fn parse_color(body: &str) -> Result<DrawColor, DecodeError> {
    let inner = body.trim().trim_start_matches('[').trim_end_matches(']');
    let tokens: Vec<&str> = inner.split(',').collect();
    if tokens.len() != 4 {
        return Err(DecodeError::ColorComponentCount { found: tokens.len() });
    }
    let mut rgba = [0.0; 4];
    for (slot, token) in rgba.iter_mut().zip(&tokens) {
        *slot = parse_number(token)?;
    }
    Ok(DrawColor::from_components(rgba))
}

fn parse_points(body: &str) -> Result<Decoded, DecodeError> {
    let fragments: Vec<&str> = body.split(PAIR_SEPARATOR).collect();
    let mut points = Vec::with_capacity(fragments.len());
    for fragment in &fragments {
        if let Some(p) = parse_pair(fragment) {
            points.push(p);
        }
    }
    if points.is_empty() {
        return Err(DecodeError::NoValidPoints { fragments: fragments.len() });
    }
    let fragments_dropped = fragments.len() - points.len();
    Ok(Decoded { message: AnnotationMessage::Points(points), fragments_dropped })
}

fn parse_pair(fragment: &str) -> Option<Point2D> {
    let inner = fragment.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')') || c.is_whitespace());
    let mut tokens = inner.split(',');
    let x = parse_number(tokens.next()?).ok()?;
    let y = parse_number(tokens.next()?).ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(Point2D::new(x, y))
}

fn parse_number(token: &str) -> Result<f64, DecodeError> {
    let t = token.trim();
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DecodeError::InvalidNumber { token: t.to_owned() }),
    }
}
