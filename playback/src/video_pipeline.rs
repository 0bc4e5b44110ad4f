/*!
    JPEG decode, optional rescale, and delivery into the frame pool.
*/

use media_accel::{DecodeConfig, JpegEngine, ScaleEngine, ScaleRequest};
use media_types::{Error, Result, Size};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::VideoOutputConfig;
use crate::pool::FramePool;
use crate::scale_solver::{self, ScaleLimits, ScaleSolution};

/**
    A finished frame handed to the frame callback.

    `data` borrows the pool slot; the slot is not reused until the callback
    returns.
*/
#[derive(Debug)]
pub struct DeliveredFrame<'a> {
    pub data: &'a [u8],
    pub size: Size,
    /// Monotonically increasing per source, starting at 0.
    pub index: u64,
    /// Pool slot holding `data`.
    pub slot: usize,
    /// Presentation timestamp in milliseconds.
    pub pts: u32,
}

pub type FrameCallback = Box<dyn FnMut(DeliveredFrame<'_>) -> Result<()> + Send>;

/**
    What happened to a frame that decoded successfully.
*/
#[derive(Debug)]
pub(crate) struct Delivery {
    pub index: u64,
    pub slot: usize,
    /// Result of the frame callback. Never aborts playback.
    pub callback: Result<()>,
}

pub(crate) struct VideoSettings {
    pub output: VideoOutputConfig,
    pub limits: ScaleLimits,
    pub max_compressed_frame: usize,
}

struct VideoInner {
    jpeg: Box<dyn JpegEngine>,
    scaler: Option<Box<dyn ScaleEngine>>,
    pool: FramePool,
    callback: FrameCallback,
    settings: VideoSettings,
    /// Source-geometry decode target used when rescaling.
    scratch: Vec<u8>,
    solution: Option<(Size, ScaleSolution)>,
    next_index: u64,
    effective: Option<Size>,
}

/**
    The video half of the pipeline.

    Everything from header parse to callback return runs under one mutex, so
    frames are delivered strictly in the order they are submitted and the
    pool cursor never advances concurrently.
*/
pub(crate) struct VideoPipeline {
    inner: Mutex<VideoInner>,
}

impl VideoPipeline {
    pub fn new(
        jpeg: Box<dyn JpegEngine>,
        scaler: Option<Box<dyn ScaleEngine>>,
        pool: FramePool,
        callback: FrameCallback,
        settings: VideoSettings,
    ) -> Result<Self> {
        if settings.output.target.is_some() && scaler.is_none() {
            return Err(Error::invalid_argument("target geometry set without a scale engine"));
        }
        Ok(Self {
            inner: Mutex::new(VideoInner {
                jpeg,
                scaler,
                pool,
                callback,
                settings,
                scratch: Vec::new(),
                solution: None,
                next_index: 0,
                effective: None,
            }),
        })
    }

    /**
        Decode one compressed picture into the next pool slot and hand it to
        the frame callback.

        Decode and scale failures are returned as errors and leave the pool
        cursor and frame index untouched.
    */
    pub fn decode_and_deliver(&self, data: &[u8], pts: u32) -> Result<Delivery> {
        let mut guard = self.inner.lock();
        let VideoInner {
            jpeg,
            scaler,
            pool,
            callback,
            settings,
            scratch,
            solution,
            next_index,
            effective,
        } = &mut *guard;

        if data.len() > settings.max_compressed_frame {
            return Err(Error::out_of_memory(format!(
                "compressed frame of {} bytes exceeds {} byte limit",
                data.len(),
                settings.max_compressed_frame
            )));
        }

        let source = jpeg.picture_info(data)?;
        if source.is_empty() {
            return Err(Error::bad_bitstream("picture header reports empty geometry"));
        }
        let format = settings.output.format;
        let target = settings.output.target.unwrap_or(source);
        let needed = format
            .frame_len(target)
            .ok_or_else(|| Error::invalid_argument(format!("output geometry {target} overflows")))?;
        if needed > pool.slot_size() {
            return Err(Error::out_of_memory(format!(
                "{target} frame needs {needed} bytes, pool slots hold {}",
                pool.slot_size()
            )));
        }
        let config = DecodeConfig::new(format).with_bgr_order(settings.output.bgr_order);

        match scaler.as_mut().filter(|_| target != source) {
            None => {
                jpeg.decode(data, &mut pool.next_slot_mut()[..needed], &config)?;
            }
            Some(scaler) => {
                let source_len = format
                    .frame_len(source)
                    .ok_or_else(|| Error::invalid_argument(format!("source geometry {source} overflows")))?;
                if scratch.len() < source_len {
                    debug!("growing scale scratch buffer to {source_len} bytes");
                    *scratch = jpeg.alloc_buffer(source_len)?;
                }
                jpeg.decode(data, &mut scratch[..source_len], &config)?;

                let cached = solution.filter(|(size, _)| *size == source).map(|(_, plan)| plan);
                let plan = match cached {
                    Some(plan) => plan,
                    None => {
                        let plan = scale_solver::solve(source, target, settings.limits)?;
                        debug!(
                            "scaling {source} -> {target}: crop {}x{}+{}+{} k={}",
                            plan.crop.width,
                            plan.crop.height,
                            plan.crop.x,
                            plan.crop.y,
                            plan.k()
                        );
                        *solution = Some((source, plan));
                        plan
                    }
                };
                let request = ScaleRequest {
                    input: &scratch[..source_len],
                    input_size: source,
                    crop: plan.crop,
                    factor: plan.factor,
                    output_size: target,
                    format,
                };
                scaler.scale(&request, &mut pool.next_slot_mut()[..needed])?;
            }
        }

        let slot = pool.commit();
        if effective.is_none() {
            info!("video geometry {target} (decoded {source})");
            *effective = Some(target);
        }

        let index = *next_index;
        *next_index += 1;
        let frame = DeliveredFrame {
            data: &pool.slot(slot).unwrap_or_default()[..needed],
            size: target,
            index,
            slot,
            pts,
        };
        let callback = callback(frame);

        Ok(Delivery {
            index,
            slot,
            callback,
        })
    }

    /**
        Geometry of the first delivered frame of the current source.
    */
    pub fn effective_size(&self) -> Option<Size> {
        self.inner.lock().effective
    }

    /// Pool slot the next delivered frame will occupy.
    #[cfg(test)]
    pub fn next_slot(&self) -> usize {
        self.inner.lock().pool.next_index()
    }

    /**
        Forget per-source state: frame index, effective geometry, scale plan
        and pool cursor.
    */
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.next_index = 0;
        inner.effective = None;
        inner.solution = None;
        inner.pool.reset_cursor();
    }

    /**
        Swap in a new frame pool, returning the old one.
    */
    pub fn replace_pool(&self, pool: FramePool) -> FramePool {
        let mut inner = self.inner.lock();
        std::mem::replace(&mut inner.pool, pool)
    }
}
