/*!
    [`AudioSink`] backed by the default `cpal` output device.

    PCM written to the sink is converted to `f32`, pushed into a lock-free
    ring and pulled by the device callback. `cpal` streams are not `Send`, so
    the stream lives on a small dedicated thread for as long as the sink is
    open.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::{
    BufferSize, SampleRate, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use media_types::{Error, PcmFormat, Result};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{error, info, warn};

use crate::sink::AudioSink;

/// Ring capacity in seconds of audio.
const RING_SECONDS: usize = 2;

struct Open {
    producer: ringbuf::HeapProd<f32>,
    format: PcmFormat,
    closed: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/**
    Plays PCM on the system's default output device.
*/
#[derive(Default)]
pub struct CpalSink {
    open: Option<Open>,
}

impl CpalSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn shutdown(open: Open) {
        open.closed.store(true, Ordering::Release);
        open.thread.thread().unpark();
        if open.thread.join().is_err() {
            error!("audio output thread panicked");
        }
    }
}

fn to_f32(pcm: &[u8], bits_per_sample: u8) -> Result<Vec<f32>> {
    match bits_per_sample {
        16 => Ok(pcm
            .chunks_exact(2)
            .map(|b| bytemuck::pod_read_unaligned::<i16>(b) as f32 / i16::MAX as f32)
            .collect()),
        32 => Ok(pcm
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect()),
        8 => Ok(pcm.iter().map(|&s| (s as f32 - 128.0) / 128.0).collect()),
        bits => Err(Error::unsupported_format(format!("{bits}-bit PCM output"))),
    }
}

impl AudioSink for CpalSink {
    fn open(&mut self, format: PcmFormat) -> Result<()> {
        if let Some(open) = self.open.take() {
            Self::shutdown(open);
        }
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(Error::invalid_argument(format!("unusable PCM format {format:?}")));
        }

        let ring = HeapRb::<f32>::new(format.sample_rate as usize * format.channels as usize * RING_SECONDS);
        let (producer, mut consumer) = ring.split();
        let closed = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_closed = closed.clone();
        let thread = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let host = cpal::default_host();
                let Some(device) = host.default_output_device() else {
                    let _ = ready_tx.send(Err(Error::Io("no audio output device found".into())));
                    return;
                };
                info!("audio device: {}", device.name().unwrap_or_default());

                let config = StreamConfig {
                    channels: format.channels as u16,
                    sample_rate: SampleRate(format.sample_rate),
                    buffer_size: BufferSize::Default,
                };
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let n = consumer.pop_slice(data);
                        data[n..].fill(0.0);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                );
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::Io(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(Error::Io(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while !thread_closed.load(Ordering::Acquire) {
                    thread::park();
                }
                drop(stream);
            })
            .map_err(|e| Error::Io(e.to_string()))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(Error::Io("audio output thread exited".into())));
        let open = Open {
            producer,
            format,
            closed,
            thread,
        };
        match ready {
            Ok(()) => {
                self.open = Some(open);
                Ok(())
            }
            Err(e) => {
                Self::shutdown(open);
                Err(e)
            }
        }
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| Error::invalid_state("audio sink not open"))?;
        let samples = to_f32(pcm, open.format.bits_per_sample)?;

        let mut offset = 0;
        while offset < samples.len() {
            if open.closed.load(Ordering::Acquire) {
                return Err(Error::invalid_state("audio sink closed"));
            }
            offset += open.producer.push_slice(&samples[offset..]);
            if offset < samples.len() {
                thread::sleep(Duration::from_micros(500));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.open.take() {
            Some(open) => {
                Self::shutdown(open);
                Ok(())
            }
            None => {
                warn!("closing audio sink that was never opened");
                Ok(())
            }
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            Self::shutdown(open);
        }
    }
}
