/*!
    JPEG decode and 2D scale engine interfaces.

    The playback core drives two accelerators: a JPEG decoder that turns one
    compressed picture into packed RGB, and a scale engine that crops and
    rescales a packed picture by a fixed-point factor. Both are modelled as
    synchronous traits so that hardware drivers, CPU fallbacks and test
    doubles are interchangeable. Software implementations backed by the
    `image` crate are provided in [`soft`].
*/

mod buffer;
mod jpeg;
mod pixel;
mod scale;
pub mod soft;

pub use buffer::alloc_buffer;
pub use jpeg::{DecodeConfig, JpegEngine};
pub use pixel::{pack_rgb, unpack_rgb};
pub use scale::{ScaleEngine, ScaleFactor, ScaleRequest};
pub use soft::{SoftJpegEngine, SoftScaleEngine};
