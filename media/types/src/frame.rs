/*!
    Demuxed frame records.
*/

use std::fmt;
use std::ops::Deref;

use crate::StreamKind;

type ReleaseFn = Box<dyn FnOnce(Vec<u8>) + Send>;

/**
    Payload bytes owned by an extractor.

    Extractors usually hand out memory from their own output pool. The
    payload carries an optional release hook that gives the bytes back to
    that pool. The hook runs exactly once, when the payload is dropped, so
    whichever stage ends up owning the payload releases it simply by letting
    it go out of scope.
*/
pub struct FramePayload {
    data: Vec<u8>,
    release: Option<ReleaseFn>,
}

impl FramePayload {
    /**
        Create a payload that needs no release.
    */
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            release: None,
        }
    }

    /**
        Create a payload that calls `release` with its bytes when dropped.
    */
    pub fn with_release<F>(data: Vec<u8>, release: F) -> Self
    where
        F: FnOnce(Vec<u8>) + Send + 'static,
    {
        Self {
            data,
            release: Some(Box::new(release)),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for FramePayload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for FramePayload {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(std::mem::take(&mut self.data));
        }
    }
}

impl fmt::Debug for FramePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePayload")
            .field("len", &self.data.len())
            .field("pooled", &self.release.is_some())
            .finish()
    }
}

/**
    One demuxed unit in flight between the extractor and a pipeline.
*/
#[derive(Debug)]
pub struct FrameRecord {
    /// Stream the frame belongs to.
    pub kind: StreamKind,
    /// Presentation timestamp in milliseconds.
    pub pts: u32,
    /// Compressed (or raw PCM) bytes.
    pub payload: FramePayload,
    /// Set by extractors that signal the end of the stream in-band.
    pub end_of_stream: bool,
}

impl FrameRecord {
    pub fn new(kind: StreamKind, pts: u32, payload: FramePayload) -> Self {
        Self {
            kind,
            pts,
            payload,
            end_of_stream: false,
        }
    }

    /**
        Create an in-band end-of-stream marker with an empty payload.
    */
    pub fn end_of_stream(kind: StreamKind) -> Self {
        Self {
            kind,
            pts: 0,
            payload: FramePayload::new(Vec::new()),
            end_of_stream: true,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
