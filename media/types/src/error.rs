use thiserror::Error;

/**
    Errors shared by every crate in the playback family.

    The type is `Clone` so that it can be carried inside playback events
    delivered to several observers.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ── Caller mistakes ───────────────────────────────────────────────
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),

    // ── Resources ─────────────────────────────────────────────────────
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("I/O error: {0}")]
    Io(String),

    // ── Media content ─────────────────────────────────────────────────
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("unsupported audio codec: {0}")]
    UnsupportedCodec(String),
    #[error("bad bitstream: {0}")]
    BadBitstream(String),

    // ── Hardware ──────────────────────────────────────────────────────
    #[error("accelerator failure: {0}")]
    AcceleratorFailure(String),

    // ── Terminal signals ──────────────────────────────────────────────
    #[error("end of stream")]
    EndOfStream,
    #[error("timed out: {0}")]
    Timeout(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn bad_bitstream(msg: impl Into<String>) -> Self {
        Self::BadBitstream(msg.into())
    }

    pub fn accelerator(msg: impl Into<String>) -> Self {
        Self::AcceleratorFailure(msg.into())
    }

    /**
        Returns true for the end-of-stream signal, which is not a real failure.
    */
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::EndOfStream
        } else {
            Self::Io(e.to_string())
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory(e.to_string())
    }
}

/// Type alias for results that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
