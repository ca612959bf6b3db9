//! arsupport-protocol: annotation wire format
//!
//! Every message on the annotation data stream is one of five kinds:
//! stroke start, stroke end, undo, color change, or a batch of points.
//! [`AnnotationMessage`] is the typed form; the two wire encodings are:
//!
//! | Kind   | Text (`WireFormat::Text`)  | JSON (`WireFormat::Json`)                        |
//! |--------|----------------------------|--------------------------------------------------|
//! | start  | `touch-start`              | `{"seq":0,"kind":"touch_start"}`                 |
//! | end    | `touch-end`                | `{"seq":3,"kind":"touch_end"}`                   |
//! | undo   | `undo`                     | `{"seq":4,"kind":"undo"}`                        |
//! | color  | `color: [0.0, 0.478, 1.0, 1.0]` | `{"seq":1,"kind":"color","rgba":[0.0,0.478,1.0,1.0]}` |
//! | points | `[(120.0, 340.0), (121.5, 341.0)]` | `{"seq":2,"kind":"points","points":[[120.0,340.0],[121.5,341.0]]}` |
//!
//! The decoder detects the encoding per message, so a JSON-speaking peer
//! still understands a legacy text peer. Malformed payloads are reported as
//! [`DecodeError`](arsupport_core::DecodeError) and never poison decoder state.

pub mod decoder;
pub mod encoder;
pub mod json;
pub mod message;
pub mod text;

pub use decoder::{AnnotationDecoder, DecoderStats};
pub use encoder::{MessageEncoder, PointsPayload};
pub use message::{AnnotationMessage, Decoded};
