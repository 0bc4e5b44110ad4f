/*!
    Packed pixel conversions between tightly packed RGB888 and the output
    formats the engines produce.

    RGB565 pixels are stored little-endian, red in the high bits.
*/

use media_types::{Error, OutputFormat, Result};

#[inline]
fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

#[inline]
fn expand565(v: u16) -> [u8; 3] {
    let r = ((v >> 11) & 0x1f) as u8;
    let g = ((v >> 5) & 0x3f) as u8;
    let b = (v & 0x1f) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/**
    Pack RGB888 pixels (`R, G, B` byte triples) into `output` in `format`.

    Returns the number of bytes written.
*/
pub fn pack_rgb(rgb: &[u8], format: OutputFormat, bgr_order: bool, output: &mut [u8]) -> Result<usize> {
    let pixels = rgb.len() / 3;
    let needed = pixels * format.bytes_per_pixel();
    if output.len() < needed {
        return Err(Error::out_of_memory(format!(
            "output holds {} bytes, {needed} needed",
            output.len()
        )));
    }

    match format {
        OutputFormat::Rgb888 => {
            for (src, dst) in rgb.chunks_exact(3).zip(output.chunks_exact_mut(3)) {
                if bgr_order {
                    dst.copy_from_slice(&[src[2], src[1], src[0]]);
                } else {
                    dst.copy_from_slice(src);
                }
            }
        }
        OutputFormat::Rgb565 => {
            for (src, dst) in rgb.chunks_exact(3).zip(output.chunks_exact_mut(2)) {
                let (r, b) = if bgr_order { (src[2], src[0]) } else { (src[0], src[2]) };
                dst.copy_from_slice(&rgb565(r, src[1], b).to_le_bytes());
            }
        }
    }
    Ok(needed)
}

/**
    Unpack `data` in `format` back to RGB888 triples.
*/
pub fn unpack_rgb(data: &[u8], format: OutputFormat, bgr_order: bool) -> Result<Vec<u8>> {
    let bpp = format.bytes_per_pixel();
    let pixels = data.len() / bpp;
    let mut rgb = Vec::new();
    rgb.try_reserve_exact(pixels * 3)?;

    match format {
        OutputFormat::Rgb888 => {
            for px in data.chunks_exact(3) {
                if bgr_order {
                    rgb.extend_from_slice(&[px[2], px[1], px[0]]);
                } else {
                    rgb.extend_from_slice(px);
                }
            }
        }
        OutputFormat::Rgb565 => {
            for px in data.chunks_exact(2) {
                let [r, g, b] = expand565(u16::from_le_bytes([px[0], px[1]]));
                if bgr_order {
                    rgb.extend_from_slice(&[b, g, r]);
                } else {
                    rgb.extend_from_slice(&[r, g, b]);
                }
            }
        }
    }
    Ok(rgb)
}
