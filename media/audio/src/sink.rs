use media_types::{PcmFormat, Result};

/**
    Destination for interleaved PCM.

    `write` may block for flow control but must return once the samples are
    accepted.
*/
pub trait AudioSink: Send {
    /**
        Configure the sink for `format`. Called once before the first write
        of a session.
    */
    fn open(&mut self, format: PcmFormat) -> Result<()>;

    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
