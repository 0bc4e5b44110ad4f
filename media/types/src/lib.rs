/*!
    Shared types for the playback crate family.

    This crate defines the vocabulary that crosses crate boundaries: stream
    descriptors, frame records handed out by an extractor, output formats,
    geometry, and the common error type. It has no dependency on any
    accelerator or demuxer, so every other crate can depend on it cheaply.
*/

mod error;
mod format;
mod frame;
mod geometry;
mod stream;

pub use error::{Error, Result};
pub use format::{AudioCodecKind, OutputFormat, PcmFormat, StreamKind, VideoCodec};
pub use frame::{FramePayload, FrameRecord};
pub use geometry::{CropRect, Size};
pub use stream::{AudioStreamInfo, MediaInfo, StreamDescriptor, VideoStreamInfo};
