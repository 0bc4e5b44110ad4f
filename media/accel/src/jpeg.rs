/*!
    JPEG decode engine interface.
*/

use media_types::{OutputFormat, Result, Size};

use crate::buffer::alloc_buffer;

/**
    Output configuration for one decode call.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Packed pixel layout to produce.
    pub format: OutputFormat,
    /// Emit channels in B, G, R order instead of R, G, B.
    pub bgr_order: bool,
}

impl DecodeConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            bgr_order: false,
        }
    }

    pub fn with_bgr_order(mut self, bgr_order: bool) -> Self {
        self.bgr_order = bgr_order;
        self
    }
}

/**
    A (usually hardware) JPEG decoder.

    Calls are synchronous: when `decode` returns, the output buffer holds the
    complete picture.
*/
pub trait JpegEngine: Send {
    /**
        Parse the picture header and return its geometry.

        Fails with `BadBitstream` if the header cannot be parsed.
    */
    fn picture_info(&self, data: &[u8]) -> Result<Size>;

    /**
        Decode one picture into `output`, returning the number of bytes written.

        `output` must hold at least `width * height * bytes_per_pixel` bytes.
    */
    fn decode(&mut self, data: &[u8], output: &mut [u8], config: &DecodeConfig) -> Result<usize>;

    /**
        Allocate a buffer the engine can write into directly.

        Hardware engines override this to hand out DMA-capable memory.
    */
    fn alloc_buffer(&self, len: usize) -> Result<Vec<u8>> {
        alloc_buffer(len)
    }
}
