use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("pad index {index} out of range (expected 0..16)")]
    InvalidPad { index: usize },

    #[error("pad {index} pressure sample is not a finite number")]
    NonFiniteSample { index: usize },

    #[error("encoder delta is not a finite number")]
    NonFiniteDelta,

    /// Encoded datagram would not fit the configured OSC buffer.
    #[error("OSC message is {len} bytes, buffer capacity is {capacity}")]
    OscOverflow { len: usize, capacity: usize },

    #[error("invalid OSC string: {0}")]
    InvalidOscString(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
