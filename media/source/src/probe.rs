/*!
    Gathering stream metadata from a parsed extractor.
*/

use media_types::{Error, MediaInfo, Result, StreamDescriptor, StreamKind};
use tracing::{debug, warn};

use crate::Extractor;

/**
    Collect the first video and first audio stream descriptors.

    Audio problems are tolerated: a failing audio query leaves the media
    video-only. Failing to query video streams is an error, but a container
    without any video stream yields `MediaInfo { video: None, .. }` and the
    caller decides whether that is acceptable.
*/
pub fn read_media_info(extractor: &dyn Extractor) -> Result<MediaInfo> {
    let audio_count = match extractor.stream_count(StreamKind::Audio) {
        Ok(n) => n,
        Err(e) => {
            warn!("audio stream query failed (ok for video-only files): {e}");
            0
        }
    };
    let video_count = extractor.stream_count(StreamKind::Video)?;
    debug!("found {audio_count} audio and {video_count} video streams");

    let audio = if audio_count > 0 {
        match extractor.stream_info(StreamKind::Audio, 0) {
            Ok(StreamDescriptor::Audio(info)) => Some(info),
            Ok(other) => {
                warn!("audio query returned a {:?} descriptor, ignoring", other.kind());
                None
            }
            Err(e) => {
                warn!("failed to get audio stream info (ignoring): {e}");
                None
            }
        }
    } else {
        None
    };

    let video = if video_count > 0 {
        match extractor.stream_info(StreamKind::Video, 0)? {
            StreamDescriptor::Video(info) => Some(info),
            StreamDescriptor::Audio(_) => {
                return Err(Error::bad_bitstream("video query returned an audio descriptor"));
            }
        }
    } else {
        None
    };

    Ok(MediaInfo { video, audio })
}
