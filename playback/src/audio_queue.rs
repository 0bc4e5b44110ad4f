use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/**
    One queued audio chunk: an owned copy of the extracted payload.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AudioChunk {
    pub data: Vec<u8>,
    pub pts: u32,
}

struct AudioQueueInner {
    chunks: VecDeque<AudioChunk>,
    capacity: usize,
}

/**
    Bounded single-producer audio queue with drop-on-full.

    The producer never blocks: a push onto a full queue hands the chunk back
    to be dropped. The consumer waits with a timeout so it can re-check its
    running flag.
*/
pub(crate) struct AudioQueue {
    inner: Mutex<AudioQueueInner>,
    not_empty: Condvar,
}

impl AudioQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(AudioQueueInner {
                chunks: VecDeque::with_capacity(capacity),
                capacity,
            }),
            not_empty: Condvar::new(),
        }
    }

    /**
        Enqueue without blocking. Gives the chunk back if the queue is full.
    */
    pub fn try_push(&self, chunk: AudioChunk) -> Result<(), AudioChunk> {
        let mut inner = self.inner.lock();
        if inner.chunks.len() >= inner.capacity {
            return Err(chunk);
        }
        inner.chunks.push_back(chunk);
        self.not_empty.notify_one();
        Ok(())
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<AudioChunk> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(chunk) = inner.chunks.pop_front() {
                return Some(chunk);
            }
            if self.not_empty.wait_until(&mut inner, deadline).timed_out() {
                return inner.chunks.pop_front();
            }
        }
    }

    /**
        Discard everything queued, returning how many chunks were freed.
    */
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock();
        let n = inner.chunks.len();
        inner.chunks.clear();
        n
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().chunks.len()
    }
}
