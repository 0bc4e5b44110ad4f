/*!
    Stream information types.
*/

use std::time::Duration;

use crate::{AudioCodecKind, PcmFormat, Size, StreamKind, VideoCodec};

/**
    Information about a video stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    /// Codec used.
    pub codec: VideoCodec,
    /// Frame width in pixels (0 if the container does not declare it).
    pub width: u32,
    /// Frame height in pixels (0 if the container does not declare it).
    pub height: u32,
    /// Nominal frames per second (0 if unknown).
    pub fps: u32,
    /// Total duration (zero if unknown).
    pub duration: Duration,
}

impl VideoStreamInfo {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /**
        Returns true if the container declared the picture geometry upfront.
    */
    pub fn has_geometry(&self) -> bool {
        !self.size().is_empty()
    }
}

/**
    Information about an audio stream.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioStreamInfo {
    /// Codec used; `None` when the container does not say.
    pub codec: Option<AudioCodecKind>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u8,
    /// Bits per sample.
    pub bits_per_sample: u8,
    /// Total duration (zero if unknown).
    pub duration: Duration,
}

impl AudioStreamInfo {
    /**
        Returns the codec, treating an unspecified codec as raw PCM.

        Some containers (AVI in particular) leave the codec tag empty for
        uncompressed audio.
    */
    pub fn effective_codec(&self) -> AudioCodecKind {
        self.codec.unwrap_or(AudioCodecKind::Pcm)
    }

    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }
}

/**
    Per-stream metadata produced once after the container is parsed.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamDescriptor {
    Video(VideoStreamInfo),
    Audio(AudioStreamInfo),
}

impl StreamDescriptor {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Video(_) => StreamKind::Video,
            Self::Audio(_) => StreamKind::Audio,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Video(v) => v.duration,
            Self::Audio(a) => a.duration,
        }
    }
}

/**
    Combined information about a media source.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// First video stream (if present).
    pub video: Option<VideoStreamInfo>,
    /// First audio stream (if present).
    pub audio: Option<AudioStreamInfo>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /**
        Longest declared duration across the streams.
    */
    pub fn duration(&self) -> Duration {
        let video = self.video.as_ref().map(|v| v.duration).unwrap_or_default();
        let audio = self.audio.as_ref().map(|a| a.duration).unwrap_or_default();
        video.max(audio)
    }
}
