pub mod config;
pub mod errors;
pub mod session;
pub mod types;

pub use config::{AnnotationConfig, WireFormat};
pub use errors::{ArSupportError, ConfigError, DecodeError, TransportError};
pub use session::{SessionState, SessionTracker};
pub use types::*;
