use std::fmt;
use std::sync::Arc;

use media_types::Error;
use tracing::{debug, warn};

/**
    Notifications delivered from the playback workers.

    Every exit of the extraction worker is reported with exactly one of
    `EndOfStream`, `ReadFailed` or `Stopped`.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    /// A video frame could not be decoded or scaled. Playback continues.
    FrameFailed { error: Error },
    /// The frame callback returned an error. Playback continues.
    FrameCallbackFailed { frame_index: u64, error: Error },
    /// An audio chunk could not be decoded or written. Playback continues.
    AudioFailed { error: Error },
    EndOfStream,
    ReadFailed { error: Error },
    Stopped,
}

pub type EventCallback = Arc<dyn Fn(&PlaybackEvent) + Send + Sync>;

/**
    Optional event callback shared by all workers of a player.
*/
#[derive(Clone, Default)]
pub(crate) struct Events {
    callback: Option<EventCallback>,
}

impl Events {
    pub fn new(callback: Option<EventCallback>) -> Self {
        Self { callback }
    }

    pub fn emit(&self, event: PlaybackEvent) {
        match &event {
            PlaybackEvent::FrameFailed { error }
            | PlaybackEvent::FrameCallbackFailed { error, .. }
            | PlaybackEvent::AudioFailed { error }
            | PlaybackEvent::ReadFailed { error } => warn!("{event:?}: {error}"),
            _ => debug!("{event:?}"),
        }
        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
