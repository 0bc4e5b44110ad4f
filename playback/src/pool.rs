/*!
    Round-robin pool of output frame buffers.
*/

use media_accel::alloc_buffer;
use media_types::{Error, Result};

/**
    A fixed set of equally sized buffers handed out in rotation.

    The cursor points at the slot delivered last and starts just before
    slot 0, so the first delivered frame lands in slot 0. It only advances
    when a frame is committed; a failed decode leaves it where it was.
*/
#[derive(Debug)]
pub struct FramePool {
    slots: Vec<Vec<u8>>,
    slot_size: usize,
    cursor: usize,
}

impl FramePool {
    /**
        Build a pool over caller-supplied buffers, which must all be the same
        non-zero size.
    */
    pub fn new(buffers: Vec<Vec<u8>>) -> Result<Self> {
        let Some(slot_size) = buffers.first().map(Vec::len) else {
            return Err(Error::invalid_argument("frame pool needs at least one buffer"));
        };
        if slot_size == 0 {
            return Err(Error::invalid_argument("frame pool buffers must be non-empty"));
        }
        if let Some(odd) = buffers.iter().position(|b| b.len() != slot_size) {
            return Err(Error::invalid_argument(format!(
                "frame pool buffer {odd} is {} bytes, expected {slot_size}",
                buffers[odd].len()
            )));
        }
        let cursor = buffers.len() - 1;
        Ok(Self {
            slots: buffers,
            slot_size,
            cursor,
        })
    }

    /**
        Allocate `count` zeroed buffers of `size` bytes.
    */
    pub fn allocate(count: usize, size: usize) -> Result<Self> {
        let mut buffers = Vec::new();
        buffers.try_reserve_exact(count)?;
        for _ in 0..count {
            buffers.push(alloc_buffer(size)?);
        }
        Self::new(buffers)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Index of the slot delivered last.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index the next delivered frame will occupy.
    pub fn next_index(&self) -> usize {
        (self.cursor + 1) % self.slots.len()
    }

    pub fn next_slot_mut(&mut self) -> &mut [u8] {
        let index = self.next_index();
        &mut self.slots[index]
    }

    /**
        Mark the next slot as delivered and return its index.
    */
    pub fn commit(&mut self) -> usize {
        self.cursor = self.next_index();
        self.cursor
    }

    pub fn slot(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index).map(Vec::as_slice)
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = self.slots.len() - 1;
    }

    pub fn into_buffers(self) -> Vec<Vec<u8>> {
        self.slots
    }
}
