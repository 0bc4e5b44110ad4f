/*!
    Playback lifecycle: source selection, start/stop/seek, probing and
    session queries.
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use media_accel::{JpegEngine, ScaleEngine};
use media_audio::{AudioSink, CodecRegistry};
use media_source::{Extractor, ExtractorFactory, StreamFilter, read_media_info};
use media_types::{AudioStreamInfo, Error, MediaInfo, Result, Size, VideoStreamInfo};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio_pipeline::{AudioPacing, AudioPipeline, AudioWorker, SharedSink};
use crate::audio_queue::AudioQueue;
use crate::config::PlayerConfig;
use crate::events::{EventCallback, Events, PlaybackEvent};
use crate::extract::{ExtractContext, ExtractWorker, OpenExtractor, Pacing, SharedExtractor};
use crate::governor::{AvSync, FrameRateGovernor};
use crate::pool::FramePool;
use crate::stats::{PlaybackStats, Stats};
use crate::video_pipeline::{FrameCallback, VideoPipeline, VideoSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been started for the current source.
    Idle,
    /// A session is open. The worker may have reached end of stream.
    Extracting,
    Stopping,
    Stopped,
}

/**
    Video properties of the current or last session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration: Duration,
}

impl VideoInfo {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Clone, Debug)]
struct Source {
    path: PathBuf,
    want_audio: bool,
}

struct Session {
    id: Uuid,
    extractor: SharedExtractor,
    worker: Option<ExtractWorker>,
    /// Kept while the worker is parked so it can be restarted after a seek.
    idle_context: Option<ExtractContext>,
    audio: Option<AudioPipeline>,
    audio_queue: Option<Arc<AudioQueue>>,
    end_of_stream: Arc<AtomicBool>,
}

impl Session {
    /// True once the extraction worker has exited or is not running.
    fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|w| w.is_finished())
    }

    fn thread_name(&self, role: &str) -> String {
        let id = self.id.simple().to_string();
        format!("{role}-{}", &id[..8])
    }
}

/**
    Builder for [`Player`].
*/
pub struct PlayerBuilder {
    factory: Arc<dyn ExtractorFactory>,
    jpeg: Box<dyn JpegEngine>,
    scaler: Option<Box<dyn ScaleEngine>>,
    pool: FramePool,
    on_frame: FrameCallback,
    audio_sink: Option<Box<dyn AudioSink>>,
    codecs: CodecRegistry,
    on_event: Option<EventCallback>,
    config: PlayerConfig,
}

impl PlayerBuilder {
    pub fn scaler(mut self, scaler: Box<dyn ScaleEngine>) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Player> {
        self.config.validate()?;
        let video = VideoPipeline::new(
            self.jpeg,
            self.scaler,
            self.pool,
            self.on_frame,
            VideoSettings {
                output: self.config.video,
                limits: self.config.scaler,
                max_compressed_frame: self.config.max_compressed_frame,
            },
        )?;
        debug!(
            "player ready: {:?} output, audio sink {}",
            self.config.video.format,
            if self.audio_sink.is_some() { "present" } else { "absent" }
        );
        Ok(Player {
            config: self.config,
            factory: self.factory,
            video: Arc::new(video),
            audio_sink: self.audio_sink.map(|sink| Arc::new(Mutex::new(sink))),
            codecs: Arc::new(self.codecs),
            events: Events::new(self.on_event),
            stats: Arc::default(),
            source: None,
            state: SessionState::Idle,
            session: None,
            info: None,
        })
    }
}

/**
    An MJPEG + audio player driving one source at a time.

    The player owns the frame pool, the accelerators and the audio sink for
    its whole life; sources come and go with [`set_source`](Self::set_source).
    Frames reach the frame callback on the extraction worker's thread.
*/
pub struct Player {
    config: PlayerConfig,
    factory: Arc<dyn ExtractorFactory>,
    video: Arc<VideoPipeline>,
    audio_sink: Option<SharedSink>,
    codecs: Arc<CodecRegistry>,
    events: Events,
    stats: Arc<Stats>,
    source: Option<Source>,
    state: SessionState,
    session: Option<Session>,
    info: Option<MediaInfo>,
}

impl Player {
    /**
        Start building a player from its required collaborators.
    */
    pub fn builder(
        factory: Arc<dyn ExtractorFactory>,
        jpeg: Box<dyn JpegEngine>,
        pool: FramePool,
        on_frame: FrameCallback,
    ) -> PlayerBuilder {
        PlayerBuilder {
            factory,
            jpeg,
            scaler: None,
            pool,
            on_frame,
            audio_sink: None,
            codecs: CodecRegistry::new(),
            on_event: None,
            config: PlayerConfig::default(),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /**
        True once the current session's worker has read the whole source.
    */
    pub fn is_end_of_stream(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.end_of_stream.load(Ordering::Acquire))
    }

    /**
        Select the source for the next [`start`](Self::start), stopping any
        running session. Counters, frame indices and stream info are reset.

        Audio is extracted only if `want_audio` is set and the player has an
        audio sink.
    */
    pub fn set_source<P: AsRef<Path>>(&mut self, path: P, want_audio: bool) -> Result<()> {
        self.stop()?;
        let path = path.as_ref().to_path_buf();
        info!("source set to {} (audio {})", path.display(), want_audio);
        self.source = Some(Source { path, want_audio });
        self.stats.reset();
        self.video.reset();
        self.info = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /**
        Open the current source and start playback from the beginning.

        A session whose worker has already ended (end of stream or a read
        failure) is closed first, so playback can be looped by calling
        `start` again.
    */
    pub fn start(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            if !session.is_finished() {
                self.session = Some(session);
                return Err(Error::invalid_state("playback already running"));
            }
            debug!(session = %session.id, "closing finished session before restart");
            self.teardown(session);
        }
        let source = self
            .source
            .clone()
            .ok_or_else(|| Error::invalid_state("no source set"))?;

        let id = Uuid::new_v4();
        let audio_requested = source.want_audio && self.audio_sink.is_some();
        let filter = StreamFilter::from_flags(true, audio_requested).unwrap_or_default();
        let (extractor, media) = self.open_source(&source.path, filter)?;
        let video = media.video.clone().ok_or_else(|| Error::unsupported_format("no video stream"))?;
        info!(
            session = %id,
            "starting {}: {}x{} @ {} fps, audio {}",
            source.path.display(),
            video.width,
            video.height,
            video.fps,
            media.audio.as_ref().map(|a| a.effective_codec().to_string()).unwrap_or_else(|| "none".into())
        );

        let extractor: SharedExtractor = Arc::new(Mutex::new(Some(OpenExtractor::new(extractor))));
        let mut session = Session {
            id,
            extractor: extractor.clone(),
            worker: None,
            idle_context: None,
            audio: None,
            audio_queue: None,
            end_of_stream: Arc::default(),
        };

        let sync = self.config.av_sync.map(|sync| {
            Arc::new(AvSync::new(
                Duration::from_millis(sync.threshold_ms),
                self.config.governor_ceiling(),
            ))
        });

        if let (true, Some(stream), Some(sink)) = (audio_requested, media.audio.clone(), &self.audio_sink) {
            let queue = Arc::new(AudioQueue::new(self.config.audio_queue_capacity));
            let worker = AudioWorker::new(
                sink.clone(),
                self.codecs.clone(),
                stream,
                AudioPacing::from_config(&self.config),
                sync.clone(),
            );
            match AudioPipeline::start(
                session.thread_name("audio"),
                queue.clone(),
                worker,
                self.stats.clone(),
                self.events.clone(),
            ) {
                Ok(pipeline) => {
                    session.audio = Some(pipeline);
                    session.audio_queue = Some(queue);
                }
                Err(e) => {
                    self.teardown(session);
                    return Err(e);
                }
            }
        }

        let pacing = match sync {
            Some(sync) => Pacing::Sync(sync),
            None => {
                let governor = FrameRateGovernor::new(
                    video.fps,
                    self.config.default_fps,
                    self.config.governor_ceiling(),
                );
                debug!(session = %id, "video paced every {:?}", governor.interval());
                Pacing::Governor(governor)
            }
        };
        let context = ExtractContext {
            extractor,
            video: self.video.clone(),
            audio: session.audio_queue.clone(),
            pacing,
            stats: self.stats.clone(),
            events: self.events.clone(),
            end_of_stream: session.end_of_stream.clone(),
        };
        // Started must precede anything the worker reports.
        self.events.emit(PlaybackEvent::Started);
        match ExtractWorker::spawn(session.thread_name("extract"), context) {
            Ok(worker) => session.worker = Some(worker),
            Err(e) => {
                self.teardown(session);
                self.events.emit(PlaybackEvent::Stopped);
                return Err(e);
            }
        }

        self.info = Some(media);
        self.session = Some(session);
        self.state = SessionState::Extracting;
        Ok(())
    }

    /**
        Stop playback and close the source. Does nothing if nothing is
        running, so it is safe to call repeatedly.

        Waits up to the configured stop timeout for the workers; a worker
        that misses the deadline is logged and left to exit on its own.
    */
    pub fn stop(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.state = SessionState::Stopping;
        info!(session = %session.id, "stopping playback");
        self.teardown(session);
        self.state = SessionState::Stopped;
        Ok(())
    }

    /**
        Move the open session to `position` and resume extraction from there,
        also after the worker has reached end of stream.

        On failure the session is torn down.
    */
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Err(Error::invalid_state("seek without an open session"));
        };
        match self.reposition(&mut session, position) {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!(session = %session.id, "seek to {position:?} failed: {e}");
                self.teardown(session);
                self.state = SessionState::Stopped;
                Err(e)
            }
        }
    }

    fn reposition(&self, session: &mut Session, position: Duration) -> Result<()> {
        let timeout = self.config.stop_timeout();
        if let Some(worker) = session.worker.take() {
            session.idle_context = worker.stop(timeout);
        }
        let mut context = session.idle_context.take().ok_or_else(|| {
            Error::Timeout(format!("extraction worker did not stop within {timeout:?}"))
        })?;

        {
            let mut guard = session
                .extractor
                .try_lock_for(timeout)
                .ok_or_else(|| Error::Timeout("extractor busy".into()))?;
            let extractor = guard
                .as_mut()
                .ok_or_else(|| Error::invalid_state("extractor closed"))?;
            extractor.seek(position)?;
        }
        debug!(session = %session.id, "seeked to {position:?}");

        session.end_of_stream.store(false, Ordering::Release);
        context.pacing.reset();
        if let Some(queue) = &session.audio_queue {
            queue.drain();
        }

        session.worker = Some(ExtractWorker::spawn(session.thread_name("extract"), context)?);
        Ok(())
    }

    /**
        Stop workers, close the extractor and free queued audio.
    */
    fn teardown(&self, mut session: Session) {
        let timeout = self.config.stop_timeout();
        if let Some(worker) = session.worker.take() {
            if worker.is_finished() {
                debug!(session = %session.id, "extraction worker already exited");
            }
            drop(worker.stop(timeout));
        }
        drop(session.idle_context.take());

        if let Some(mut audio) = session.audio.take() {
            audio.stop(timeout);
        }
        if let Some(queue) = session.audio_queue.take() {
            let freed = queue.drain();
            if freed > 0 {
                debug!(session = %session.id, "freed {freed} queued audio chunks");
            }
        }

        match session.extractor.try_lock_for(timeout) {
            Some(mut guard) => {
                if let Some(mut extractor) = guard.take() {
                    if let Err(e) = extractor.close() {
                        warn!(session = %session.id, "failed to close extractor: {e}");
                    }
                }
            }
            None => warn!(
                session = %session.id,
                "extractor still busy, it closes once the worker lets go"
            ),
        }
    }

    /**
        Open `path` with the given stream filter and validate it for
        playback. The extractor is closed again on any failure.
    */
    fn open_source(&self, path: &Path, filter: StreamFilter) -> Result<(Box<dyn Extractor>, MediaInfo)> {
        let mut extractor = self.factory.open(path, filter)?;
        let checked = extractor
            .parse_stream_info()
            .and_then(|()| read_media_info(extractor.as_ref()))
            .and_then(|media| {
                check_playable(&media)?;
                Ok(media)
            });
        match checked {
            Ok(media) => Ok((extractor, media)),
            Err(e) => {
                if let Err(close) = extractor.close() {
                    warn!("failed to close extractor after error: {close}");
                }
                Err(e)
            }
        }
    }

    /**
        Read stream metadata of `path` without starting playback.
    */
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> Result<MediaInfo> {
        let path = path.as_ref();
        let (mut extractor, media) = self.open_source(path, StreamFilter::Both)?;
        if let Err(e) = extractor.close() {
            warn!("failed to close probed extractor: {e}");
        }
        debug!("probed {}: {media:?}", path.display());
        Ok(media)
    }

    /**
        Video properties of the current or last session. Geometry missing
        from the container is filled in from the first decoded frame.
    */
    pub fn info(&self) -> Result<VideoInfo> {
        let video: &VideoStreamInfo = self
            .info
            .as_ref()
            .and_then(|m| m.video.as_ref())
            .ok_or_else(|| Error::invalid_state("no stream info available"))?;
        let size = if video.has_geometry() {
            video.size()
        } else {
            self.video.effective_size().unwrap_or_default()
        };
        Ok(VideoInfo {
            width: size.width,
            height: size.height,
            fps: video.fps,
            duration: video.duration,
        })
    }

    pub fn audio_info(&self) -> Option<AudioStreamInfo> {
        self.info.as_ref().and_then(|m| m.audio.clone())
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats.snapshot()
    }

    /**
        Replace the frame pool, returning the previous one. Not allowed while
        a session is open.
    */
    pub fn resize_buffers(&mut self, pool: FramePool) -> Result<FramePool> {
        if self.session.is_some() {
            return Err(Error::invalid_state("cannot resize buffers while playing"));
        }
        debug!("frame pool replaced: {} x {} bytes", pool.len(), pool.slot_size());
        Ok(self.video.replace_pool(pool))
    }

    /**
        Stop playback and close the audio sink.
    */
    pub fn deinit(mut self) -> Result<()> {
        self.stop()?;
        if let Some(sink) = &self.audio_sink {
            sink.lock().close()?;
        }
        Ok(())
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("failed to stop player on drop: {e}");
        }
    }
}

/**
    Only MJPEG video can be played; audio-only sources are rejected because
    delivery is driven by video frames.
*/
fn check_playable(media: &MediaInfo) -> Result<()> {
    let video = media
        .video
        .as_ref()
        .ok_or_else(|| Error::unsupported_format("no video stream"))?;
    if !video.codec.is_jpeg() {
        return Err(Error::unsupported_format(format!(
            "{} video is not supported, only MJPEG",
            video.codec
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    use media_types::{PcmFormat, VideoCodec};

    use super::*;
    use crate::testing::{
        FakeJpeg, RecordingSink, ScriptedSource, Step, event_channel, fake_jpeg, mjpeg_info, pcm_info,
        video_script, wait_for,
    };
    use crate::video_pipeline::DeliveredFrame;

    const SIZE: Size = Size::new(32, 16);

    type Seen = Arc<Mutex<Vec<(u64, usize)>>>;

    fn video_only(fps: u32) -> MediaInfo {
        MediaInfo {
            video: Some(mjpeg_info(SIZE, fps)),
            audio: None,
        }
    }

    type EventRx = std::sync::mpsc::Receiver<PlaybackEvent>;

    fn player(source: &ScriptedSource) -> (Player, Seen, EventRx) {
        let (builder, seen, rx) = builder(source);
        let mut player = builder.build().unwrap();
        player.set_source("clip.avi", true).unwrap();
        (player, seen, rx)
    }

    fn builder(source: &ScriptedSource) -> (PlayerBuilder, Seen, EventRx) {
        let seen: Seen = Arc::default();
        let frames = seen.clone();
        let on_frame: FrameCallback = Box::new(move |frame: DeliveredFrame<'_>| {
            frames.lock().push((frame.index, frame.slot));
            Ok(())
        });
        let (on_event, rx) = event_channel();
        let builder = Player::builder(
            Arc::new(source.clone()),
            Box::new(FakeJpeg),
            FramePool::allocate(3, SIZE.width as usize * SIZE.height as usize * 2).unwrap(),
            on_frame,
        )
        .on_event(on_event);
        (builder, seen, rx)
    }

    fn is_terminal(event: &PlaybackEvent) -> bool {
        matches!(
            event,
            PlaybackEvent::EndOfStream | PlaybackEvent::ReadFailed { .. } | PlaybackEvent::Stopped
        )
    }

    #[test]
    fn frames_are_delivered_in_order_exactly_once() {
        let source = ScriptedSource::new(video_only(1000), video_script(10, SIZE));
        let (mut player, seen, rx) = player(&source);

        player.start().unwrap();
        let events = wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(events.first(), Some(&PlaybackEvent::Started));
        assert_eq!(events.last(), Some(&PlaybackEvent::EndOfStream));
        assert!(player.is_end_of_stream());

        let seen = seen.lock().clone();
        let indices: Vec<u64> = seen.iter().map(|s| s.0).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        let slots: Vec<usize> = seen.iter().map(|s| s.1).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);

        assert_eq!(player.stats().frames_processed, 10);
        assert_eq!(source.releases(), 10);
        player.stop().unwrap();
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let source = ScriptedSource::new(video_only(1000), video_script(3, SIZE));
        let (mut player, _, rx) = player(&source);

        player.stop().unwrap();
        assert_eq!(player.state(), SessionState::Idle);

        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        player.stop().unwrap();
        player.stop().unwrap();
        assert_eq!(player.state(), SessionState::Stopped);
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(source.releases(), 3);
    }

    #[test]
    fn start_while_running_is_invalid_state() {
        let source = ScriptedSource::new(video_only(1000), video_script(100, SIZE))
            .with_read_delay(Duration::from_millis(20));
        let (mut player, _, _rx) = player(&source);
        player.start().unwrap();
        assert!(matches!(player.start(), Err(Error::InvalidState(_))));
        assert!(player.is_running());
        player.stop().unwrap();
        assert_eq!(source.counters.opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_again_after_end_of_stream_loops() {
        let source = ScriptedSource::new(video_only(1000), video_script(2, SIZE));
        let (mut player, seen, rx) = player(&source);

        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert!(player.is_end_of_stream());

        player.start().unwrap();
        let events = wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(events.first(), Some(&PlaybackEvent::Started));
        assert_eq!(events.last(), Some(&PlaybackEvent::EndOfStream));

        assert_eq!(source.counters.opens.load(Ordering::SeqCst), 2);
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(player.stats().frames_processed, 4);
        assert_eq!(seen.lock().len(), 4);

        player.stop().unwrap();
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn start_again_after_read_failure() {
        let script = vec![
            Step::Video { pts: 0, data: fake_jpeg(SIZE, 1) },
            Step::Fail(Error::Io("cable pulled".into())),
        ];
        let source = ScriptedSource::new(video_only(1000), script);
        let (mut player, _, rx) = player(&source);

        player.start().unwrap();
        let events = wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert!(matches!(events.last(), Some(PlaybackEvent::ReadFailed { .. })));

        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(source.counters.opens.load(Ordering::SeqCst), 2);
        player.stop().unwrap();
    }

    #[test]
    fn extractor_closes_after_worker_misses_stop_deadline() {
        let source = ScriptedSource::new(video_only(1000), video_script(10, SIZE))
            .with_read_delay(Duration::from_millis(300));
        let (builder, _, rx) = builder(&source);
        let mut player = builder
            .config(PlayerConfig {
                stop_timeout_ms: 50,
                ..PlayerConfig::default()
            })
            .build()
            .unwrap();
        player.set_source("clip.avi", false).unwrap();

        player.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        // the worker is inside a 300 ms read and holds the extractor
        player.stop().unwrap();
        assert!(!player.is_running());

        let events = wait_for(&rx, Duration::from_secs(2), |e| *e == PlaybackEvent::Stopped);
        assert_eq!(events.last(), Some(&PlaybackEvent::Stopped));
        let deadline = Instant::now() + Duration::from_secs(2);
        while source.counters.closes.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(source.releases(), 1);
    }

    #[test]
    fn start_without_source_is_invalid_state() {
        let source = ScriptedSource::new(video_only(30), Vec::new());
        let (builder, _, _rx) = builder(&source);
        let mut player = builder.build().unwrap();
        assert!(matches!(player.start(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn probe_then_start_reports_same_geometry() {
        let source = ScriptedSource::new(video_only(25), video_script(2, SIZE));
        let (mut player, _, rx) = player(&source);

        let probed = player.probe("clip.avi").unwrap();
        let probed = probed.video.unwrap();
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(player.state(), SessionState::Idle);

        player.start().unwrap();
        let info = player.info().unwrap();
        assert_eq!(info.size(), probed.size());
        assert_eq!(info.fps, 25);
        assert_eq!(info.duration, probed.duration);

        wait_for(&rx, Duration::from_secs(5), is_terminal);
        player.stop().unwrap();
    }

    #[test]
    fn zero_video_streams_is_unsupported() {
        let info = MediaInfo {
            video: None,
            audio: Some(pcm_info(PcmFormat::new(16000, 1, 16))),
        };
        let source = ScriptedSource::new(info, vec![Step::Audio { pts: 0, data: vec![0; 64] }]);
        let (builder, _, rx) = builder(&source);
        let mut player = builder.audio_sink(Box::new(RecordingSink::default())).build().unwrap();
        player.set_source("voice.wav", true).unwrap();

        assert!(matches!(player.start(), Err(Error::UnsupportedFormat(_))));
        assert!(!player.is_running());
        assert_eq!(player.stats().frames_processed, 0);
        assert_eq!(source.counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(source.counters.closes.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());

        player.deinit().unwrap();
    }

    #[test]
    fn non_mjpeg_video_is_unsupported() {
        let mut info = video_only(30);
        if let Some(video) = info.video.as_mut() {
            video.codec = VideoCodec::H264;
        }
        let source = ScriptedSource::new(info, Vec::new());
        let (mut player, _, _rx) = player(&source);
        assert!(matches!(player.probe("clip.mp4"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(player.start(), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn audio_flood_never_blocks_extraction() {
        let mut script = Vec::new();
        for i in 0..200u32 {
            script.push(Step::Audio { pts: i, data: vec![7; 320] });
            if i % 50 == 0 {
                script.push(Step::Video { pts: i, data: fake_jpeg(SIZE, 1) });
            }
        }
        let info = MediaInfo {
            video: Some(mjpeg_info(SIZE, 1000)),
            audio: Some(pcm_info(PcmFormat::new(8000, 1, 16))),
        };
        let source = ScriptedSource::new(info, script);
        let sink = RecordingSink {
            write_delay: Duration::from_millis(50),
            ..Default::default()
        };
        let (builder, _, rx) = builder(&source);
        let mut player = builder
            .audio_sink(Box::new(sink))
            .config(PlayerConfig {
                audio_queue_capacity: 4,
                ..PlayerConfig::default()
            })
            .build()
            .unwrap();
        player.set_source("clip.avi", true).unwrap();

        let start = Instant::now();
        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        // 200 chunks at 50 ms each would take 10 s if the worker blocked
        assert!(start.elapsed() < Duration::from_secs(3));

        let stats = player.stats();
        assert_eq!(stats.audio_chunks_queued + stats.audio_chunks_dropped, 200);
        assert!(stats.audio_chunks_dropped > 0);
        assert_eq!(stats.frames_processed, 4);

        player.stop().unwrap();
        assert_eq!(source.releases(), 204);
    }

    #[test]
    fn audio_is_skipped_without_sink() {
        let info = MediaInfo {
            video: Some(mjpeg_info(SIZE, 1000)),
            audio: Some(pcm_info(PcmFormat::new(8000, 1, 16))),
        };
        let script = vec![
            Step::Audio { pts: 0, data: vec![1; 16] },
            Step::Video { pts: 0, data: fake_jpeg(SIZE, 1) },
        ];
        let source = ScriptedSource::new(info, script);
        let (mut player, _, rx) = player(&source);
        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(player.stats().audio_chunks_queued, 0);
        assert_eq!(player.stats().frames_processed, 1);
        assert!(player.audio_info().is_none());
    }

    #[test]
    fn audio_reaches_sink() {
        let format = PcmFormat::new(8000, 1, 16);
        let info = MediaInfo {
            video: Some(mjpeg_info(SIZE, 1000)),
            audio: Some(pcm_info(format)),
        };
        let script = vec![
            Step::Audio { pts: 0, data: vec![1; 16] },
            Step::Video { pts: 0, data: fake_jpeg(SIZE, 1) },
            Step::Audio { pts: 2, data: vec![2; 16] },
        ];
        let source = ScriptedSource::new(info, script);
        let sink = RecordingSink::default();
        let (builder, _, rx) = builder(&source);
        let mut player = builder.audio_sink(Box::new(sink.clone())).build().unwrap();
        player.set_source("clip.avi", true).unwrap();

        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.writes.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        player.stop().unwrap();

        let mut expected = vec![1u8; 16];
        expected.extend([2; 16]);
        assert_eq!(sink.written.lock().as_slice(), expected.as_slice());
        assert_eq!(sink.opened.lock().as_slice(), &[format]);
        assert_eq!(player.audio_info().map(|a| a.sample_rate), Some(8000));
        assert_eq!(player.stats().audio_chunks_played, 2);
    }

    #[test]
    fn seek_restarts_after_end_of_stream() {
        let source = ScriptedSource::new(video_only(1000), video_script(6, SIZE));
        let (mut player, seen, rx) = player(&source);

        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert!(player.is_end_of_stream());

        // pts are 0, 10, ..., 50
        player.seek(Duration::from_millis(30)).unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);

        assert_eq!(source.counters.seeks.load(Ordering::SeqCst), 1);
        assert_eq!(player.stats().frames_processed, 9);
        let indices: Vec<u64> = seen.lock().iter().map(|s| s.0).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());
        player.stop().unwrap();
    }

    #[test]
    fn seek_without_session_is_invalid_state() {
        let source = ScriptedSource::new(video_only(30), Vec::new());
        let (mut player, _, _rx) = player(&source);
        assert!(matches!(player.seek(Duration::ZERO), Err(Error::InvalidState(_))));
    }

    #[test]
    fn stop_interrupts_slow_pacing() {
        // 1 fps: every frame after the first waits up to a second
        let source = ScriptedSource::new(video_only(1), video_script(100, SIZE));
        let (mut player, _, rx) = player(&source);
        player.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(matches!(
            player.resize_buffers(FramePool::allocate(1, 16).unwrap()),
            Err(Error::InvalidState(_))
        ));

        let start = Instant::now();
        player.stop().unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
        let events = wait_for(&rx, Duration::from_secs(1), is_terminal);
        assert_eq!(events.last(), Some(&PlaybackEvent::Stopped));
        assert_eq!(source.releases(), player.stats().frames_processed as usize + 1);
    }

    #[test]
    fn set_source_resets_session_state() {
        let source = ScriptedSource::new(video_only(1000), video_script(4, SIZE));
        let (mut player, seen, rx) = player(&source);
        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(player.stats().frames_processed, 4);

        player.set_source("other.avi", false).unwrap();
        assert_eq!(player.stats(), PlaybackStats::default());
        assert_eq!(player.state(), SessionState::Idle);
        assert!(matches!(player.info(), Err(Error::InvalidState(_))));

        let pool = FramePool::allocate(2, SIZE.width as usize * SIZE.height as usize * 2).unwrap();
        let old = player.resize_buffers(pool).unwrap();
        assert_eq!(old.len(), 3);

        seen.lock().clear();
        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        let slots: Vec<(u64, usize)> = seen.lock().clone();
        assert_eq!(slots, vec![(0, 0), (1, 1), (2, 0), (3, 1)]);
    }

    #[test]
    fn callback_failures_are_reported() {
        let source = ScriptedSource::new(video_only(1000), video_script(3, SIZE));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (on_event, rx) = event_channel();
        let mut player = Player::builder(
            Arc::new(source.clone()),
            Box::new(FakeJpeg),
            FramePool::allocate(2, SIZE.width as usize * SIZE.height as usize * 2).unwrap(),
            Box::new(move |frame: DeliveredFrame<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
                if frame.index == 1 {
                    Err(Error::invalid_state("panel busy"))
                } else {
                    Ok(())
                }
            }),
        )
        .on_event(on_event)
        .build()
        .unwrap();
        player.set_source("clip.avi", false).unwrap();
        player.start().unwrap();

        let events = wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert!(events.contains(&PlaybackEvent::FrameCallbackFailed {
            frame_index: 1,
            error: Error::invalid_state("panel busy"),
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(player.stats().frames_processed, 3);
    }

    #[test]
    fn missing_geometry_comes_from_first_frame() {
        let mut info = video_only(1000);
        if let Some(video) = info.video.as_mut() {
            video.width = 0;
            video.height = 0;
        }
        let source = ScriptedSource::new(info, video_script(1, SIZE));
        let (mut player, _, rx) = player(&source);
        player.start().unwrap();
        wait_for(&rx, Duration::from_secs(5), is_terminal);
        assert_eq!(player.info().unwrap().size(), SIZE);
    }
}
