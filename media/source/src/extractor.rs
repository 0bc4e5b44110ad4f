/*!
    Extractor (demuxer) interface.
*/

use std::path::Path;
use std::time::Duration;

use media_types::{FrameRecord, Result, StreamDescriptor, StreamKind};

/**
    Which kinds of frames an opened extractor hands out. Frames of other
    kinds are skipped by `read_frame` and do not count as streams.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamFilter {
    VideoOnly,
    AudioOnly,
    #[default]
    Both,
}

impl StreamFilter {
    /// `None` when neither kind is wanted.
    pub fn from_flags(video: bool, audio: bool) -> Option<Self> {
        match (video, audio) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::VideoOnly),
            (false, true) => Some(Self::AudioOnly),
            (false, false) => None,
        }
    }

    pub fn wants(self, kind: StreamKind) -> bool {
        match (self, kind) {
            (Self::Both, _) => true,
            (Self::VideoOnly, StreamKind::Video) => true,
            (Self::AudioOnly, StreamKind::Audio) => true,
            _ => false,
        }
    }
}

/**
    An opened container that produces tagged frames.

    Frames are returned in file order, interleaved between streams. The
    payload of each [`FrameRecord`] may belong to the extractor's own output
    pool; it is given back when the record's payload is dropped.
*/
pub trait Extractor: Send {
    /**
        Parse container headers. Must be called once before any query.
    */
    fn parse_stream_info(&mut self) -> Result<()>;

    /**
        Number of streams of the given kind.
    */
    fn stream_count(&self, kind: StreamKind) -> Result<usize>;

    /**
        Metadata for the `index`-th stream of the given kind.
    */
    fn stream_info(&self, kind: StreamKind, index: usize) -> Result<StreamDescriptor>;

    /**
        Read the next frame.

        Returns `Ok(Some(frame))` for each frame, `Ok(None)` at end of stream,
        or an error if the container is damaged or the input fails.
    */
    fn read_frame(&mut self) -> Result<Option<FrameRecord>>;

    /**
        Seek to a position in the media.

        The next frame read will be at or before the target position.
    */
    fn seek(&mut self, position: Duration) -> Result<()>;

    /**
        Release container resources. Further calls are invalid.
    */
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/**
    Opens extractors for a media path.

    Implementations pick a container parser (typically by probing the first
    bytes of the file) and restrict demuxing to the requested streams.
*/
pub trait ExtractorFactory: Send + Sync {
    fn open(&self, path: &Path, filter: StreamFilter) -> Result<Box<dyn Extractor>>;
}

impl<F> ExtractorFactory for F
where
    F: Fn(&Path, StreamFilter) -> Result<Box<dyn Extractor>> + Send + Sync,
{
    fn open(&self, path: &Path, filter: StreamFilter) -> Result<Box<dyn Extractor>> {
        self(path, filter)
    }
}
