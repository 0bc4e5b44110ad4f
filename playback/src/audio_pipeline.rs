/*!
    Audio decode worker.

    Pulls chunks from the [`AudioQueue`], decodes them if needed, and writes
    PCM to the sink, sleeping for part of each written duration so the
    worker runs at roughly real time without starving the sink.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use media_audio::{AudioCodec, AudioSink, CodecError, CodecRegistry};
use media_types::{AudioStreamInfo, Error, PcmFormat, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::audio_queue::{AudioChunk, AudioQueue};
use crate::config::PlayerConfig;
use crate::events::{Events, PlaybackEvent};
use crate::governor::AvSync;
use crate::signal::Signal;
use crate::stats::Stats;

pub(crate) type SharedSink = Arc<Mutex<Box<dyn AudioSink>>>;

#[derive(Clone, Copy, Debug)]
pub(crate) struct AudioPacing {
    pub pcm_percent: u32,
    pub decoded_percent: u32,
    pub ceiling: Duration,
    pub decode_buffer_size: usize,
    pub decode_buffer_headroom: usize,
    pub dequeue_timeout: Duration,
}

impl AudioPacing {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            pcm_percent: config.pcm_pacing_percent,
            decoded_percent: config.decoded_pacing_percent,
            ceiling: config.pacing_ceiling(),
            decode_buffer_size: config.decode_buffer_size,
            decode_buffer_headroom: config.decode_buffer_headroom,
            dequeue_timeout: config.dequeue_timeout(),
        }
    }

    /**
        Sleep owed after writing `duration` of audio, or `None` if the
        duration is implausible.
    */
    fn delay(&self, duration: Duration, percent: u32) -> Option<Duration> {
        (!duration.is_zero() && duration < self.ceiling).then(|| duration * percent / 100)
    }
}

/**
    State owned exclusively by the audio worker thread.
*/
pub(crate) struct AudioWorker {
    sink: SharedSink,
    sink_open: bool,
    registry: Arc<CodecRegistry>,
    stream: AudioStreamInfo,
    codec: Option<Box<dyn AudioCodec>>,
    buffer: Vec<u8>,
    pacing: AudioPacing,
    sync: Option<Arc<AvSync>>,
}

impl AudioWorker {
    pub fn new(
        sink: SharedSink,
        registry: Arc<CodecRegistry>,
        stream: AudioStreamInfo,
        pacing: AudioPacing,
        sync: Option<Arc<AvSync>>,
    ) -> Self {
        Self {
            sink,
            sink_open: false,
            registry,
            stream,
            codec: None,
            buffer: Vec::new(),
            pacing,
            sync,
        }
    }

    fn output_format(&self) -> PcmFormat {
        self.codec
            .as_ref()
            .and_then(|c| c.output_format())
            .unwrap_or_else(|| self.stream.pcm_format())
    }

    /**
        Write PCM, opening the sink on first use, then pace.
    */
    fn write(&mut self, pcm: &[u8], percent: u32) -> Result<()> {
        let format = self.output_format();
        {
            let mut sink = self.sink.lock();
            if !self.sink_open {
                debug!(
                    "opening audio sink: {} Hz, {} ch, {} bit",
                    format.sample_rate, format.channels, format.bits_per_sample
                );
                sink.open(format)?;
                self.sink_open = true;
            }
            sink.write(pcm)?;
        }
        if let Some(delay) = format
            .duration_of(pcm.len())
            .and_then(|d| self.pacing.delay(d, percent))
        {
            thread::sleep(delay);
        }
        Ok(())
    }

    fn ensure_buffer(&mut self, len: usize) -> Result<()> {
        if self.buffer.len() < len {
            self.buffer.try_reserve_exact(len - self.buffer.len())?;
            self.buffer.resize(len, 0);
        }
        Ok(())
    }

    /**
        Play one queued chunk.
    */
    pub fn process(&mut self, chunk: &AudioChunk) -> Result<()> {
        if let Some(sync) = &self.sync {
            sync.observe_audio(chunk.pts);
        }

        let kind = self.stream.effective_codec();
        if !kind.is_compressed() {
            return self.write(&chunk.data, self.pacing.pcm_percent);
        }

        if self.codec.is_none() {
            let codec = self.registry.create(kind, self.stream.pcm_format())?;
            debug!("audio codec {kind} ready");
            self.codec = Some(codec);
        }
        self.ensure_buffer(self.pacing.decode_buffer_size)?;

        let mut input = chunk.data.as_slice();
        while !input.is_empty() {
            let Some(codec) = self.codec.as_mut() else {
                break;
            };
            match codec.decode(input, &mut self.buffer) {
                Ok(decoded) => {
                    if decoded.written > 0 {
                        let pcm = std::mem::take(&mut self.buffer);
                        let result = self.write(&pcm[..decoded.written], self.pacing.decoded_percent);
                        self.buffer = pcm;
                        result?;
                    }
                    if decoded.consumed == 0 {
                        break;
                    }
                    input = &input[decoded.consumed.min(input.len())..];
                }
                Err(CodecError::OutputTooSmall { needed }) => {
                    let grown = needed + self.pacing.decode_buffer_headroom;
                    if grown <= self.buffer.len() {
                        return Err(Error::invalid_state(format!(
                            "{kind} codec asked for {needed} bytes with {} available",
                            self.buffer.len()
                        )));
                    }
                    debug!("growing audio decode buffer to {grown} bytes");
                    self.ensure_buffer(grown)?;
                }
                Err(CodecError::Corrupt { written, reason }) => {
                    if written > 0 {
                        let pcm = std::mem::take(&mut self.buffer);
                        let result = self.write(&pcm[..written.min(pcm.len())], self.pacing.decoded_percent);
                        self.buffer = pcm;
                        result?;
                    }
                    return Err(Error::bad_bitstream(format!("{kind}: {reason}")));
                }
                Err(CodecError::Failed(reason)) => {
                    return Err(Error::bad_bitstream(format!("{kind} decode failed: {reason}")));
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.sink_open {
            if let Err(e) = self.sink.lock().close() {
                warn!("failed to close audio sink: {e}");
            }
            self.sink_open = false;
        }
    }
}

/**
    Handle to a running audio worker thread.
*/
pub(crate) struct AudioPipeline {
    queue: Arc<AudioQueue>,
    running: Arc<AtomicBool>,
    exited: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl AudioPipeline {
    pub fn start(
        name: String,
        queue: Arc<AudioQueue>,
        mut worker: AudioWorker,
        stats: Arc<Stats>,
        events: Events,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let exited = Arc::new(Signal::new());

        let handle = {
            let queue = queue.clone();
            let running = running.clone();
            let exited = exited.clone();
            let timeout = worker.pacing.dequeue_timeout;
            thread::Builder::new()
                .name(name)
                .spawn(move || {
                    while running.load(Ordering::Acquire) {
                        let Some(chunk) = queue.pop_timeout(timeout) else {
                            continue;
                        };
                        match worker.process(&chunk) {
                            Ok(()) => Stats::bump(&stats.audio_chunks_played),
                            Err(error) => events.emit(PlaybackEvent::AudioFailed { error }),
                        }
                    }
                    let freed = queue.drain();
                    if freed > 0 {
                        debug!("audio worker exiting, freed {freed} queued chunks");
                    }
                    worker.close();
                    exited.raise();
                })
                .map_err(|e| Error::Io(format!("failed to spawn audio worker: {e}")))?
        };

        Ok(Self {
            queue,
            running,
            exited,
            handle: Some(handle),
        })
    }

    /**
        Ask the worker to exit and wait up to `timeout` for it. The queue is
        drained either way.
    */
    pub fn stop(&mut self, timeout: Duration) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if self.exited.wait_timeout(timeout) {
                if handle.join().is_err() {
                    warn!("audio worker panicked");
                }
            } else {
                warn!("audio worker did not stop within {timeout:?}, detaching");
            }
        }
        self.queue.drain();
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop(Duration::ZERO);
        }
    }
}
