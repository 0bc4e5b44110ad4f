/*!
    Demuxer interface and byte inputs for the playback crate family.

    Container parsing itself lives outside this workspace. This crate defines
    the narrow surface the playback core consumes from a demuxer (open, parse,
    stream queries, frame reads, seek, close) plus a file-backed byte input
    that demuxer implementations can read from.
*/

mod extractor;
mod input;
mod probe;

pub use extractor::{Extractor, ExtractorFactory, StreamFilter};
pub use input::{ByteInput, FileInput};
pub use probe::read_media_info;
