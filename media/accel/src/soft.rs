/*!
    CPU implementations of the engine traits, built on the `image` crate.

    These stand in for the hardware blocks on hosts that lack them and act as
    the reference behaviour in tests.
*/

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::imageops::{self, FilterType};
use image::{ImageDecoder, ImageFormat, RgbImage};
use media_types::{Error, Result, Size};
use tracing::trace;

use crate::jpeg::{DecodeConfig, JpegEngine};
use crate::pixel::{pack_rgb, unpack_rgb};
use crate::scale::{ScaleEngine, ScaleRequest};

/**
    Baseline/progressive JPEG decoder running on the CPU.
*/
#[derive(Debug, Default)]
pub struct SoftJpegEngine {
    decoded: u64,
}

impl SoftJpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pictures decoded successfully so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

impl JpegEngine for SoftJpegEngine {
    fn picture_info(&self, data: &[u8]) -> Result<Size> {
        let decoder =
            JpegDecoder::new(Cursor::new(data)).map_err(|e| Error::bad_bitstream(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        Ok(Size::new(width, height))
    }

    fn decode(&mut self, data: &[u8], output: &mut [u8], config: &DecodeConfig) -> Result<usize> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| Error::bad_bitstream(e.to_string()))?;
        let rgb = img.to_rgb8();
        let written = pack_rgb(rgb.as_raw(), config.format, config.bgr_order, output)?;
        self.decoded += 1;
        trace!(
            width = rgb.width(),
            height = rgb.height(),
            written,
            "decoded jpeg picture"
        );
        Ok(written)
    }
}

/**
    Crop + resize engine running on the CPU.
*/
#[derive(Debug)]
pub struct SoftScaleEngine {
    filter: FilterType,
}

impl Default for SoftScaleEngine {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl SoftScaleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl ScaleEngine for SoftScaleEngine {
    fn scale(&mut self, request: &ScaleRequest<'_>, output: &mut [u8]) -> Result<usize> {
        let ScaleRequest {
            input,
            input_size,
            crop,
            output_size,
            format,
            ..
        } = *request;

        if !crop.fits_in(input_size) || crop.size().is_empty() {
            return Err(Error::invalid_argument(format!(
                "crop {}x{}+{}+{} outside {input_size}",
                crop.width, crop.height, crop.x, crop.y
            )));
        }
        let out_len = format
            .frame_len(output_size)
            .ok_or_else(|| Error::invalid_argument("output size overflows"))?;
        if output.len() < out_len {
            return Err(Error::out_of_memory(format!(
                "output holds {} bytes, {out_len} needed",
                output.len()
            )));
        }

        let src = RgbImage::from_raw(input_size.width, input_size.height, unpack_rgb(input, format, false)?)
            .ok_or_else(|| Error::invalid_argument(format!("input too short for {input_size}")))?;
        let cropped = imageops::crop_imm(&src, crop.x, crop.y, crop.width, crop.height).to_image();

        let scaled_size = request.scaled_size();
        if scaled_size.is_empty() {
            return Err(Error::invalid_argument("scale factor collapses the crop"));
        }
        let scaled = if scaled_size == crop.size() {
            cropped
        } else {
            imageops::resize(&cropped, scaled_size.width, scaled_size.height, self.filter)
        };

        let mut canvas = RgbImage::new(output_size.width, output_size.height);
        imageops::replace(&mut canvas, &scaled, 0, 0);
        pack_rgb(canvas.as_raw(), format, false, output)
    }
}
