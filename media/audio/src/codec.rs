/*!
    Compressed audio codec transform interface.
*/

use media_types::{AudioCodecKind, PcmFormat};
use thiserror::Error;

/**
    Progress made by one successful decode call.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Input bytes consumed. Zero means the decoder could not make progress.
    pub consumed: usize,
    /// PCM bytes written to the output buffer.
    pub written: usize,
}

/**
    Ways a decode call can fail.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The output buffer cannot hold the next decoded unit. Nothing was
    /// consumed; retry with at least `needed` bytes.
    #[error("output buffer too small, {needed} bytes needed")]
    OutputTooSmall { needed: usize },

    /// The rest of the chunk is unusable, but `written` bytes of PCM
    /// decoded before the problem are valid.
    #[error("corrupt input after {written} decoded bytes: {reason}")]
    Corrupt { written: usize, reason: String },

    /// The decoder failed outright; nothing from this call is valid.
    #[error("decoder failure: {0}")]
    Failed(String),
}

/**
    A compressed audio decoder.
*/
pub trait AudioCodec: Send {
    fn kind(&self) -> AudioCodecKind;

    /**
        Decode as much of `input` as fits into `output`.
    */
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Decoded, CodecError>;

    /**
        PCM format of the decoded output, once the decoder knows it.

        `None` means the stream descriptor's format applies.
    */
    fn output_format(&self) -> Option<PcmFormat> {
        None
    }
}
