/*!
    2D scale engine interface.
*/

use media_types::{CropRect, OutputFormat, Result, Size};

/**
    Fixed-point isotropic scale factor `numerator / denominator`.

    Scale engines of this kind only accept factors whose denominator is the
    engine's fractional resolution (`FRAG`) and whose numerator is an integer
    in `1..=K_MAX`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScaleFactor {
    pub numerator: u32,
    pub denominator: u32,
}

impl ScaleFactor {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /**
        Scale `len` pixels by this factor, rounding to nearest.
    */
    pub const fn apply(&self, len: u32) -> u32 {
        let scaled = len as u64 * self.numerator as u64 + self.denominator as u64 / 2;
        (scaled / self.denominator as u64) as u32
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub const fn is_identity(&self) -> bool {
        self.numerator == self.denominator
    }
}

/**
    One crop + scale + color-convert operation.
*/
#[derive(Clone, Copy, Debug)]
pub struct ScaleRequest<'a> {
    /// Packed source picture.
    pub input: &'a [u8],
    /// Geometry of `input`.
    pub input_size: Size,
    /// Region of `input` to scale.
    pub crop: CropRect,
    /// Factor applied to the cropped region.
    pub factor: ScaleFactor,
    /// Geometry of the output block.
    pub output_size: Size,
    /// Pixel layout of both input and output.
    pub format: OutputFormat,
}

impl ScaleRequest<'_> {
    /**
        Size the cropped region occupies once scaled.
    */
    pub fn scaled_size(&self) -> Size {
        Size::new(
            self.factor.apply(self.crop.width),
            self.factor.apply(self.crop.height),
        )
    }
}

/**
    A (usually hardware) scale/rotate engine.
*/
pub trait ScaleEngine: Send {
    /**
        Run one scale operation into `output`, returning bytes written.

        The output block always has `request.output_size` geometry; if the
        scaled region is smaller the remainder is left black, if larger it is
        clipped.
    */
    fn scale(&mut self, request: &ScaleRequest<'_>, output: &mut [u8]) -> Result<usize>;
}
