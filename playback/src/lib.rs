/*!
    MJPEG + audio playback core.

    A [`Player`] pulls demuxed frames from an extractor on a worker thread,
    decodes video into a round-robin [`FramePool`] (rescaling through the
    [`solve`]d crop and factor when a target geometry is configured) and
    queues audio for a separate decode-and-play worker. Video is paced by a
    frame-rate governor, or by a shared clock when A/V sync is enabled.

    Container parsing, codecs and audio output are supplied by the caller
    through the `media-source`, `media-accel` and `media-audio` traits.
*/

mod audio_pipeline;
mod audio_queue;
mod config;
mod events;
mod extract;
mod governor;
mod player;
mod pool;
mod scale_solver;
mod signal;
mod stats;
mod video_pipeline;

#[cfg(test)]
mod testing;

pub use config::{AvSyncConfig, PlayerConfig, VideoOutputConfig};
pub use events::{EventCallback, PlaybackEvent};
pub use player::{Player, PlayerBuilder, SessionState, VideoInfo};
pub use pool::FramePool;
pub use scale_solver::{ScaleLimits, ScaleSolution, solve};
pub use stats::PlaybackStats;
pub use video_pipeline::{DeliveredFrame, FrameCallback};

pub use media_types::{Error, Result};
