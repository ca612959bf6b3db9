use arsupport_core::{DrawColor, Point2D};

/// One protocol message, independent of its wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationMessage {
    /// A drag began on the annotating peer.
    TouchStart,
    /// The drag ended. Advisory; carries no geometry.
    TouchEnd,
    /// Remove the most recent stroke.
    Undo,
    /// New draw color for subsequent points.
    Color(DrawColor),
    /// Ordered screen-space samples of the current drag.
    Points(Vec<Point2D>),
}

impl AnnotationMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TouchStart => "touch-start",
            Self::TouchEnd => "touch-end",
            Self::Undo => "undo",
            Self::Color(_) => "color",
            Self::Points(_) => "points",
        }
    }
}

/// A successfully parsed message plus how many point fragments were
/// discarded on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub message: AnnotationMessage,
    pub fragments_dropped: usize,
}

impl Decoded {
    pub(crate) fn clean(message: AnnotationMessage) -> Self {
        Self { message, fragments_dropped: 0 }
    }
}
