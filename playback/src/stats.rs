use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/**
    Counters for one playback session.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Video frames delivered to the frame callback.
    pub frames_processed: u64,
    pub audio_chunks_queued: u64,
    /// Audio chunks discarded because the queue was full.
    pub audio_chunks_dropped: u64,
    pub audio_chunks_played: u64,
    /// Timestamps in milliseconds of the last extracted frames.
    pub last_video_pts: u32,
    pub last_audio_pts: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub frames_processed: AtomicU64,
    pub audio_chunks_queued: AtomicU64,
    pub audio_chunks_dropped: AtomicU64,
    pub audio_chunks_played: AtomicU64,
    pub last_video_pts: AtomicU32,
    pub last_audio_pts: AtomicU32,
}

impl Stats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PlaybackStats {
        PlaybackStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            audio_chunks_queued: self.audio_chunks_queued.load(Ordering::Relaxed),
            audio_chunks_dropped: self.audio_chunks_dropped.load(Ordering::Relaxed),
            audio_chunks_played: self.audio_chunks_played.load(Ordering::Relaxed),
            last_video_pts: self.last_video_pts.load(Ordering::Relaxed),
            last_audio_pts: self.last_audio_pts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.frames_processed,
            &self.audio_chunks_queued,
            &self.audio_chunks_dropped,
            &self.audio_chunks_played,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_video_pts.store(0, Ordering::Relaxed);
        self.last_audio_pts.store(0, Ordering::Relaxed);
    }
}
