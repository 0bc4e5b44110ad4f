/*!
    Codec, pixel and sample format types.
*/

use std::fmt;
use std::time::Duration;

use crate::geometry::Size;

/**
    Which elementary stream a frame or descriptor belongs to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

/**
    Video codecs an extractor may report.

    Only MJPEG can be decoded by the JPEG engine; the other variants exist so
    that a source can be rejected with a meaningful message.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VideoCodec {
    /// Motion JPEG, one baseline JPEG picture per frame.
    Mjpeg,
    H264,
    H265,
    Unknown,
}

impl VideoCodec {
    pub const fn is_jpeg(self) -> bool {
        matches!(self, Self::Mjpeg)
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mjpeg => "MJPEG",
            Self::H264 => "H.264",
            Self::H265 => "H.265",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/**
    Audio codecs an extractor may report.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum AudioCodecKind {
    /// Uncompressed interleaved PCM, written to the sink as-is.
    Pcm,
    Aac,
    Mp3,
    Flac,
    Opus,
    Vorbis,
    Adpcm,
}

impl AudioCodecKind {
    /**
        Returns true if the stream needs a codec transform before playback.
    */
    pub const fn is_compressed(self) -> bool {
        !matches!(self, Self::Pcm)
    }
}

impl fmt::Display for AudioCodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pcm => "PCM",
            Self::Aac => "AAC",
            Self::Mp3 => "MP3",
            Self::Flac => "FLAC",
            Self::Opus => "Opus",
            Self::Vorbis => "Vorbis",
            Self::Adpcm => "ADPCM",
        };
        f.write_str(name)
    }
}

/**
    Pixel layout produced by the JPEG and scale engines.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    /// Packed 16-bit 5-6-5, little-endian.
    #[default]
    Rgb565,
    /// Packed 24-bit 8-8-8.
    Rgb888,
}

impl OutputFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb888 => 3,
        }
    }

    /**
        Returns the number of bytes a picture of the given size occupies,
        or `None` if the computation overflows.
    */
    pub fn frame_len(self, size: Size) -> Option<usize> {
        (size.width as usize)
            .checked_mul(size.height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }
}

/**
    Negotiated PCM format used to open an audio sink.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u8, bits_per_sample: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /**
        Bytes per interleaved sample frame (all channels).
    */
    pub const fn bytes_per_frame(&self) -> u32 {
        self.channels as u32 * (self.bits_per_sample as u32 / 8)
    }

    /**
        Returns the playback duration of `len` bytes of PCM in this format,
        or `None` if the format cannot describe a duration.
    */
    pub fn duration_of(&self, len: usize) -> Option<Duration> {
        let bytes_per_second = self.sample_rate as u64 * self.bytes_per_frame() as u64;
        if bytes_per_second == 0 {
            return None;
        }
        Some(Duration::from_millis(len as u64 * 1000 / bytes_per_second))
    }
}
