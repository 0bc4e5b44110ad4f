/*!
    Video pacing: the frame-rate governor and the gated A/V sync clock.
*/

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::signal::Signal;

/**
    Spaces video frames `1 / fps` apart in wall time.

    Delays above the sanity ceiling are skipped rather than slept, so a
    corrupt or backwards timestamp cannot stall the worker.
*/
#[derive(Debug)]
pub(crate) struct FrameRateGovernor {
    interval: Duration,
    ceiling: Duration,
    last: Option<Instant>,
}

impl FrameRateGovernor {
    pub fn new(fps: u32, default_fps: u32, ceiling: Duration) -> Self {
        let fps = if fps == 0 { default_fps.max(1) } else { fps };
        Self {
            interval: Duration::from_millis(1000 / fps as u64),
            ceiling,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /**
        How long to wait at `now` before dispatching the next frame.
    */
    pub fn delay_at(&self, now: Instant) -> Option<Duration> {
        let target = self.last? + self.interval;
        let delay = target.checked_duration_since(now)?;
        (!delay.is_zero() && delay < self.ceiling).then_some(delay)
    }

    /**
        Wait out the remaining interval. Returns false if `stop` was raised
        during the wait.
    */
    pub fn pace(&mut self, stop: &Signal) -> bool {
        let stopped = match self.delay_at(Instant::now()) {
            Some(delay) => {
                trace!(?delay, "pacing video frame");
                stop.wait_timeout(delay)
            }
            None => false,
        };
        self.last = Some(Instant::now());
        !stopped
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

struct SyncBase {
    wall: Instant,
    pts: u32,
}

/**
    Shared presentation clock for the gated A/V sync mode.

    The first timestamped unit of a session anchors the clock; later video
    frames that run ahead of it by more than the threshold wait, and audio
    only reports drift.
*/
pub(crate) struct AvSync {
    base: Mutex<Option<SyncBase>>,
    threshold: Duration,
    ceiling: Duration,
}

impl AvSync {
    pub fn new(threshold: Duration, ceiling: Duration) -> Self {
        Self {
            base: Mutex::new(None),
            threshold,
            ceiling,
        }
    }

    /**
        Presentation offset of `pts` relative to the clock at `now`.
        Positive means the unit is early. Anchors the clock on first use.
    */
    fn lead_at(&self, pts: u32, now: Instant) -> i64 {
        let mut base = self.base.lock();
        let base = base.get_or_insert(SyncBase { wall: now, pts });
        let media = pts as i64 - base.pts as i64;
        let wall = now.saturating_duration_since(base.wall).as_millis() as i64;
        media - wall
    }

    /**
        Delay a video frame with timestamp `pts` until it is due.
        Returns false if `stop` was raised during the wait.
    */
    pub fn wait_video(&self, pts: u32, stop: &Signal) -> bool {
        let lead = self.lead_at(pts, Instant::now());
        if lead <= self.threshold.as_millis() as i64 {
            return true;
        }
        let delay = Duration::from_millis(lead as u64).min(self.ceiling);
        trace!(pts, ?delay, "video ahead of sync clock");
        !stop.wait_timeout(delay)
    }

    /**
        Log how far audio at `pts` has drifted from the shared clock.
    */
    pub fn observe_audio(&self, pts: u32) {
        let lead = self.lead_at(pts, Instant::now());
        if lead.unsigned_abs() > self.threshold.as_millis() as u64 {
            debug!(pts, drift_ms = lead, "audio drifting from sync clock");
        }
    }

    pub fn reset(&self) {
        *self.base.lock() = None;
    }
}
