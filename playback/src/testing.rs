/*!
    Scripted collaborators for exercising the pipeline without hardware.
*/

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use media_accel::{DecodeConfig, JpegEngine, ScaleEngine, ScaleRequest};
use media_audio::{AudioCodec, AudioSink, CodecError, Decoded};
use media_source::{Extractor, ExtractorFactory, StreamFilter};
use media_types::{
    AudioCodecKind, AudioStreamInfo, Error, FramePayload, FrameRecord, MediaInfo, PcmFormat,
    Result, Size, StreamDescriptor, StreamKind, VideoCodec, VideoStreamInfo,
};
use parking_lot::Mutex;

use crate::events::{EventCallback, PlaybackEvent};

// ── Fake pictures ─────────────────────────────────────────────────────

/**
    A tiny stand-in for a JPEG picture: SOI marker, big-endian width and
    height, and a fill byte.
*/
pub fn fake_jpeg(size: Size, fill: u8) -> Vec<u8> {
    let mut data = vec![0xff, 0xd8];
    data.extend_from_slice(&(size.width as u16).to_be_bytes());
    data.extend_from_slice(&(size.height as u16).to_be_bytes());
    data.push(fill);
    data
}

#[derive(Default)]
pub struct FakeJpeg;

impl JpegEngine for FakeJpeg {
    fn picture_info(&self, data: &[u8]) -> Result<Size> {
        match data {
            [0xff, 0xd8, w0, w1, h0, h1, _, ..] => Ok(Size::new(
                u16::from_be_bytes([*w0, *w1]) as u32,
                u16::from_be_bytes([*h0, *h1]) as u32,
            )),
            _ => Err(Error::bad_bitstream("missing SOI marker")),
        }
    }

    fn decode(&mut self, data: &[u8], output: &mut [u8], config: &DecodeConfig) -> Result<usize> {
        let size = self.picture_info(data)?;
        let len = config
            .format
            .frame_len(size)
            .ok_or_else(|| Error::invalid_argument("picture too large"))?;
        let out = output
            .get_mut(..len)
            .ok_or_else(|| Error::out_of_memory("decode output too small"))?;
        out.fill(data[6]);
        Ok(len)
    }
}

/**
    Scale engine that records requests and fills the output block.
*/
#[derive(Clone, Default)]
pub struct FakeScaler {
    pub requests: Arc<Mutex<Vec<(Size, media_types::CropRect, u32, Size)>>>,
}

impl ScaleEngine for FakeScaler {
    fn scale(&mut self, request: &ScaleRequest<'_>, output: &mut [u8]) -> Result<usize> {
        self.requests.lock().push((
            request.input_size,
            request.crop,
            request.factor.numerator,
            request.output_size,
        ));
        let len = request
            .format
            .frame_len(request.output_size)
            .ok_or_else(|| Error::invalid_argument("output too large"))?;
        let fill = request.input.first().copied().unwrap_or(0);
        output[..len].fill(fill);
        Ok(len)
    }
}

// ── Extractor ─────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum Step {
    Video { pts: u32, data: Vec<u8> },
    Audio { pts: u32, data: Vec<u8> },
    Fail(Error),
}

/**
    Shared counters for every extractor opened from one [`ScriptedSource`].
*/
#[derive(Default)]
pub struct SourceCounters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub releases: AtomicUsize,
    pub seeks: AtomicUsize,
}

/**
    Extractor factory that replays a fixed script on every open.
*/
#[derive(Clone)]
pub struct ScriptedSource {
    pub info: MediaInfo,
    pub script: Vec<Step>,
    pub read_delay: Duration,
    pub counters: Arc<SourceCounters>,
}

impl ScriptedSource {
    pub fn new(info: MediaInfo, script: Vec<Step>) -> Self {
        Self {
            info,
            script,
            read_delay: Duration::ZERO,
            counters: Arc::default(),
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

impl ExtractorFactory for ScriptedSource {
    fn open(&self, _path: &Path, filter: StreamFilter) -> Result<Box<dyn Extractor>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedExtractor {
            source: self.clone(),
            filter,
            pending: self.script.iter().cloned().collect(),
            parsed: false,
        }))
    }
}

pub struct ScriptedExtractor {
    source: ScriptedSource,
    filter: StreamFilter,
    pending: VecDeque<Step>,
    parsed: bool,
}

impl ScriptedExtractor {
    fn payload(&self, data: Vec<u8>) -> FramePayload {
        let counters = self.source.counters.clone();
        FramePayload::with_release(data, move |_| {
            counters.releases.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl Extractor for ScriptedExtractor {
    fn parse_stream_info(&mut self) -> Result<()> {
        self.parsed = true;
        Ok(())
    }

    fn stream_count(&self, kind: StreamKind) -> Result<usize> {
        let present = match kind {
            StreamKind::Video => self.source.info.video.is_some(),
            StreamKind::Audio => self.source.info.audio.is_some(),
        };
        Ok(usize::from(present && self.filter.wants(kind)))
    }

    fn stream_info(&self, kind: StreamKind, _index: usize) -> Result<StreamDescriptor> {
        let info = &self.source.info;
        match kind {
            StreamKind::Video => info.video.clone().map(StreamDescriptor::Video),
            StreamKind::Audio => info.audio.clone().map(StreamDescriptor::Audio),
        }
        .ok_or_else(|| Error::invalid_argument("no such stream"))
    }

    fn read_frame(&mut self) -> Result<Option<FrameRecord>> {
        if !self.parsed {
            return Err(Error::invalid_state("stream info not parsed"));
        }
        if !self.source.read_delay.is_zero() {
            thread::sleep(self.source.read_delay);
        }
        loop {
            let Some(step) = self.pending.pop_front() else {
                return Ok(None);
            };
            let (kind, pts, data) = match step {
                Step::Fail(e) => return Err(e),
                Step::Video { pts, data } => (StreamKind::Video, pts, data),
                Step::Audio { pts, data } => (StreamKind::Audio, pts, data),
            };
            if self.filter.wants(kind) {
                return Ok(Some(FrameRecord::new(kind, pts, self.payload(data))));
            }
        }
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.source.counters.seeks.fetch_add(1, Ordering::SeqCst);
        let ms = position.as_millis() as u32;
        self.pending = self
            .source
            .script
            .iter()
            .filter(|step| match step {
                Step::Video { pts, .. } | Step::Audio { pts, .. } => *pts >= ms,
                Step::Fail(_) => true,
            })
            .cloned()
            .collect();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.source.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn mjpeg_info(size: Size, fps: u32) -> VideoStreamInfo {
    VideoStreamInfo {
        codec: VideoCodec::Mjpeg,
        width: size.width,
        height: size.height,
        fps,
        duration: Duration::from_secs(10),
    }
}

pub fn pcm_info(format: PcmFormat) -> AudioStreamInfo {
    AudioStreamInfo {
        codec: None,
        sample_rate: format.sample_rate,
        channels: format.channels,
        bits_per_sample: format.bits_per_sample,
        duration: Duration::from_secs(10),
    }
}

pub fn video_script(count: u32, size: Size) -> Vec<Step> {
    (0..count)
        .map(|i| Step::Video {
            pts: i * 10,
            data: fake_jpeg(size, i as u8),
        })
        .collect()
}

// ── Audio ─────────────────────────────────────────────────────────────

/**
    Sink that records everything written to it.
*/
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub opened: Arc<Mutex<Vec<PcmFormat>>>,
    pub written: Arc<Mutex<Vec<u8>>>,
    pub writes: Arc<AtomicUsize>,
    pub write_delay: Duration,
}

impl AudioSink for RecordingSink {
    fn open(&mut self, format: PcmFormat) -> Result<()> {
        self.opened.lock().push(format);
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        self.written.lock().extend_from_slice(pcm);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/**
    Codec that expands every input byte into two output bytes, consuming at
    most `block` bytes per call and insisting on room for a whole block.
    A `0xEE` byte in the input triggers `Corrupt`, `0xFF` triggers `Failed`.
*/
pub struct DoublingCodec {
    pub block: usize,
}

impl AudioCodec for DoublingCodec {
    fn kind(&self) -> AudioCodecKind {
        AudioCodecKind::Adpcm
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> std::result::Result<Decoded, CodecError> {
        let needed = self.block * 2;
        if output.len() < needed {
            return Err(CodecError::OutputTooSmall { needed });
        }
        let take = input.len().min(self.block);
        let mut written = 0;
        for &byte in &input[..take] {
            match byte {
                0xff => return Err(CodecError::Failed("poisoned input".into())),
                0xee => {
                    return Err(CodecError::Corrupt {
                        written,
                        reason: "corrupt block".into(),
                    });
                }
                _ => {
                    output[written] = byte;
                    output[written + 1] = byte;
                    written += 2;
                }
            }
        }
        Ok(Decoded {
            consumed: take,
            written,
        })
    }
}

// ── Events ────────────────────────────────────────────────────────────

/**
    Event callback feeding a channel the test can wait on.
*/
pub fn event_channel() -> (EventCallback, mpsc::Receiver<PlaybackEvent>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let callback: EventCallback = Arc::new(move |event: &PlaybackEvent| {
        let _ = tx.lock().send(event.clone());
    });
    (callback, rx)
}

/**
    Wait for the first event matching `pred`, returning everything seen up
    to and including it.
*/
pub fn wait_for(
    rx: &mpsc::Receiver<PlaybackEvent>,
    timeout: Duration,
    pred: impl Fn(&PlaybackEvent) -> bool,
) -> Vec<PlaybackEvent> {
    let deadline = std::time::Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                let done = pred(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(_) => panic!("timed out waiting for event; saw {seen:?}"),
        }
    }
}
