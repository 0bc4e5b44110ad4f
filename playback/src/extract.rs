/*!
    Extraction worker: reads demuxed frames and routes them to the video
    and audio pipelines.
*/

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use media_source::Extractor;
use media_types::{Error, FrameRecord, Result, StreamKind};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::audio_queue::{AudioChunk, AudioQueue};
use crate::events::{Events, PlaybackEvent};
use crate::governor::{AvSync, FrameRateGovernor};
use crate::signal::Signal;
use crate::stats::Stats;
use crate::video_pipeline::VideoPipeline;

/**
    An open extractor that is closed exactly once: explicitly through
    [`close`](Self::close), or on drop. A worker detached after a stop
    timeout still closes the source when it finally lets go of it.
*/
pub(crate) struct OpenExtractor {
    inner: Box<dyn Extractor>,
    closed: bool,
}

impl OpenExtractor {
    pub fn new(inner: Box<dyn Extractor>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close()
    }
}

impl Deref for OpenExtractor {
    type Target = dyn Extractor;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for OpenExtractor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for OpenExtractor {
    fn drop(&mut self) {
        if !self.closed {
            debug!("closing extractor on release");
        }
        if let Err(e) = self.close() {
            warn!("failed to close extractor: {e}");
        }
    }
}

pub(crate) type SharedExtractor = Arc<Mutex<Option<OpenExtractor>>>;

pub(crate) enum Pacing {
    Governor(FrameRateGovernor),
    Sync(Arc<AvSync>),
}

impl Pacing {
    /// Returns false if `stop` was raised while waiting.
    fn wait(&mut self, pts: u32, stop: &Signal) -> bool {
        match self {
            Self::Governor(governor) => governor.pace(stop),
            Self::Sync(sync) => sync.wait_video(pts, stop),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Governor(governor) => governor.reset(),
            Self::Sync(sync) => sync.reset(),
        }
    }
}

/**
    Everything the worker needs. Handed back by [`ExtractWorker::stop`] so
    the session can restart the worker after a seek.
*/
pub(crate) struct ExtractContext {
    pub extractor: SharedExtractor,
    pub video: Arc<VideoPipeline>,
    pub audio: Option<Arc<AudioQueue>>,
    pub pacing: Pacing,
    pub stats: Arc<Stats>,
    pub events: Events,
    pub end_of_stream: Arc<AtomicBool>,
}

enum Exit {
    Stopped,
    EndOfStream,
    ReadFailed(Error),
}

impl ExtractContext {
    fn run(&mut self, stop: &Signal) -> Exit {
        loop {
            if stop.is_raised() {
                return Exit::Stopped;
            }
            let next = match self.extractor.lock().as_mut() {
                Some(extractor) => extractor.read_frame(),
                None => Err(Error::invalid_state("extractor closed")),
            };
            let frame = match next {
                Ok(Some(frame)) if !frame.end_of_stream => frame,
                Ok(_) => return Exit::EndOfStream,
                Err(e) if e.is_end_of_stream() => return Exit::EndOfStream,
                Err(e) => return Exit::ReadFailed(e),
            };
            if !self.dispatch(frame, stop) {
                return Exit::Stopped;
            }
        }
    }

    /**
        Route one frame. The payload is released when `frame` drops at the
        end of this call, whatever the outcome.
    */
    fn dispatch(&mut self, frame: FrameRecord, stop: &Signal) -> bool {
        match frame.kind {
            StreamKind::Video => {
                if frame.pts != 0 {
                    self.stats.last_video_pts.store(frame.pts, Ordering::Relaxed);
                }
                if frame.is_empty() {
                    return true;
                }
                if !self.pacing.wait(frame.pts, stop) {
                    return false;
                }
                match self.video.decode_and_deliver(&frame.payload, frame.pts) {
                    Ok(delivery) => {
                        Stats::bump(&self.stats.frames_processed);
                        trace!(index = delivery.index, slot = delivery.slot, "frame delivered");
                        if let Err(error) = delivery.callback {
                            self.events.emit(PlaybackEvent::FrameCallbackFailed {
                                frame_index: delivery.index,
                                error,
                            });
                        }
                    }
                    Err(error) => self.events.emit(PlaybackEvent::FrameFailed { error }),
                }
            }
            StreamKind::Audio => {
                if frame.pts != 0 {
                    self.stats.last_audio_pts.store(frame.pts, Ordering::Relaxed);
                }
                let Some(queue) = &self.audio else {
                    return true;
                };
                if frame.is_empty() {
                    return true;
                }
                let mut data = Vec::new();
                if let Err(e) = data.try_reserve_exact(frame.len()) {
                    self.events.emit(PlaybackEvent::AudioFailed { error: e.into() });
                    return true;
                }
                data.extend_from_slice(&frame.payload);
                match queue.try_push(AudioChunk {
                    data,
                    pts: frame.pts,
                }) {
                    Ok(()) => Stats::bump(&self.stats.audio_chunks_queued),
                    Err(dropped) => {
                        Stats::bump(&self.stats.audio_chunks_dropped);
                        debug!(pts = dropped.pts, "audio queue full, dropping chunk");
                    }
                }
            }
        }
        true
    }
}

/**
    Handle to a running extraction worker.
*/
pub(crate) struct ExtractWorker {
    stop: Arc<Signal>,
    exited: Arc<Signal>,
    handle: JoinHandle<ExtractContext>,
}

impl ExtractWorker {
    pub fn spawn(name: String, mut context: ExtractContext) -> Result<Self> {
        let stop = Arc::new(Signal::new());
        let exited = Arc::new(Signal::new());

        let handle = {
            let stop = stop.clone();
            let exited = exited.clone();
            thread::Builder::new()
                .name(name)
                .spawn(move || {
                    debug!("extraction worker started");
                    let event = match context.run(&stop) {
                        Exit::Stopped => PlaybackEvent::Stopped,
                        Exit::EndOfStream => {
                            context.end_of_stream.store(true, Ordering::Release);
                            PlaybackEvent::EndOfStream
                        }
                        Exit::ReadFailed(error) => PlaybackEvent::ReadFailed { error },
                    };
                    // Raised before the terminal event goes out.
                    exited.raise();
                    context.events.emit(event);
                    context
                })
                .map_err(|e| Error::Io(format!("failed to spawn extraction worker: {e}")))?
        };

        Ok(Self {
            stop,
            exited,
            handle,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.exited.is_raised()
    }

    /**
        Signal the worker to exit and wait up to `timeout` for it.

        Returns the context if the worker acknowledged in time; otherwise the
        worker is left to finish on its own and `None` is returned.
    */
    pub fn stop(self, timeout: Duration) -> Option<ExtractContext> {
        self.stop.raise();
        if !self.exited.wait_timeout(timeout) {
            warn!("extraction worker did not stop within {timeout:?}");
            return None;
        }
        match self.handle.join() {
            Ok(context) => Some(context),
            Err(_) => {
                warn!("extraction worker panicked");
                None
            }
        }
    }
}
