use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArSupportError {
    #[error("Configuration invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A payload that could not be turned into an annotation message.
///
/// Always recoverable: the offending message is dropped and the decoder
/// carries on with the next one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Payload is empty")]
    Empty,

    #[error("Payload is not ASCII text")]
    NotAscii,

    #[error("Color needs exactly 4 components, found {found}")]
    ColorComponentCount { found: usize },

    #[error("Invalid number: {token:?}")]
    InvalidNumber { token: String },

    #[error("Points batch contained no valid pair ({fragments} fragments)")]
    NoValidPoints { fragments: usize },

    #[error("Malformed JSON message: {reason}")]
    Json { reason: String },

    #[error("Stale sequence number {seq} (last accepted {last})")]
    StaleSequence { seq: u64, last: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Data stream not ready")]
    NotReady,

    #[error("Channel closed by peer")]
    ConnectionClosed,

    #[error("Message too large: {len} bytes (max {max})")]
    MessageTooLarge { len: usize, max: usize },

    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
