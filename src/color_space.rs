//! Conversion between host pixel layouts and the float RGB work image
//!
//! YUV layouts use BT.601 limited-range coefficients. The decode and encode matrices are exact
//! inverses, and the work image is left unclamped after decoding, so a frame converted to the
//! work image and straight back reproduces every sample within one code value.

use crate::error::{FilterError, Result};
use crate::types::{chroma_dimensions, PixelFormat, VideoFrame, WorkImage};
use image::{ImageBuffer, Rgb};

const KR: f32 = 0.299;
const KB: f32 = 0.114;
const KG: f32 = 1.0 - KR - KB;

const Y_OFFSET: f32 = 16.0;
const Y_RANGE: f32 = 219.0;
const C_OFFSET: f32 = 128.0;
const C_RANGE: f32 = 224.0;

/// Decode one limited-range YUV sample to unit-range RGB
#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [f32; 3] {
    let yn = (f32::from(y) - Y_OFFSET) / Y_RANGE;
    let pb = (f32::from(u) - C_OFFSET) / C_RANGE;
    let pr = (f32::from(v) - C_OFFSET) / C_RANGE;

    let r = yn + 2.0 * (1.0 - KR) * pr;
    let b = yn + 2.0 * (1.0 - KB) * pb;
    let g = (yn - KR * r - KB * b) / KG;
    [r, g, b]
}

/// Normalized luma of a unit-range RGB pixel
#[inline]
fn luma(rgb: [f32; 3]) -> f32 {
    KR * rgb[0] + KG * rgb[1] + KB * rgb[2]
}

#[inline]
fn encode_y(rgb: [f32; 3]) -> u8 {
    quantize(Y_OFFSET + Y_RANGE * luma(rgb))
}

/// Encode `(Cb, Cr)` from an (averaged) unit-range RGB value
#[inline]
fn encode_chroma(rgb: [f32; 3]) -> (u8, u8) {
    let yn = luma(rgb);
    let cb = C_OFFSET + C_RANGE * (rgb[2] - yn) / (2.0 * (1.0 - KB));
    let cr = C_OFFSET + C_RANGE * (rgb[0] - yn) / (2.0 * (1.0 - KR));
    (quantize(cb), quantize(cr))
}

/// Round then saturate into a byte
#[inline]
fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Converts host frames to [`WorkImage`]s and writes composited images back in place
pub struct ColorSpaceBridge;

impl ColorSpaceBridge {
    /// Decode a frame into the work format
    ///
    /// Unsupported layouts fail with `UnsupportedFormat` without touching the frame; malformed
    /// frames fail with `Inference`.
    pub fn to_work_image(frame: &VideoFrame) -> Result<WorkImage> {
        if !frame.format.is_supported() {
            return Err(FilterError::unsupported_format(frame.format.to_string()));
        }
        frame.validate()?;

        match frame.format {
            PixelFormat::I420 | PixelFormat::Nv12 => Ok(Self::decode_yuv420(frame)),
            PixelFormat::Rgba => Ok(Self::decode_rgba(frame)),
            other => Err(FilterError::unsupported_format(other.to_string())),
        }
    }

    /// Encode a work image back into the frame's own layout
    ///
    /// The image must have the frame's dimensions. RGBA frames keep their original alpha.
    pub fn write_back(image: &WorkImage, frame: &mut VideoFrame) -> Result<()> {
        if !frame.format.is_supported() {
            return Err(FilterError::unsupported_format(frame.format.to_string()));
        }
        frame.validate()?;
        if image.dimensions() != frame.dimensions() {
            return Err(FilterError::inference(format!(
                "Work image is {}x{} but frame is {}x{}",
                image.width(),
                image.height(),
                frame.width,
                frame.height
            )));
        }

        match frame.format {
            PixelFormat::I420 | PixelFormat::Nv12 => {
                Self::encode_yuv420(image, frame);
                Ok(())
            },
            PixelFormat::Rgba => {
                Self::encode_rgba(image, frame);
                Ok(())
            },
            other => Err(FilterError::unsupported_format(other.to_string())),
        }
    }

    /// Byte offsets of the (U, V) samples for chroma cell `(cx, cy)`
    fn chroma_offsets(format: PixelFormat, width: u32, height: u32, cx: u32, cy: u32) -> (usize, usize) {
        let luma_len = width as usize * height as usize;
        let (cw, ch) = chroma_dimensions(width, height);
        let cell = cy as usize * cw as usize + cx as usize;
        match format {
            PixelFormat::Nv12 => (luma_len + cell * 2, luma_len + cell * 2 + 1),
            _ => {
                let chroma_len = cw as usize * ch as usize;
                (luma_len + cell, luma_len + chroma_len + cell)
            },
        }
    }

    #[allow(clippy::indexing_slicing)]
    // Safe: frame.validate() guarantees the buffer covers the full 4:2:0 layout
    fn decode_yuv420(frame: &VideoFrame) -> WorkImage {
        let (width, height) = frame.dimensions();
        let data = &frame.data;
        ImageBuffer::from_fn(width, height, |x, y| {
            let luma = data[y as usize * width as usize + x as usize];
            let (u_idx, v_idx) = Self::chroma_offsets(frame.format, width, height, x / 2, y / 2);
            Rgb(yuv_to_rgb(luma, data[u_idx], data[v_idx]))
        })
    }

    #[allow(clippy::indexing_slicing)]
    // Safe: frame.validate() guarantees the buffer covers the full 4:2:0 layout
    fn encode_yuv420(image: &WorkImage, frame: &mut VideoFrame) {
        let (width, height) = frame.dimensions();
        let format = frame.format;
        let data = &mut frame.data;

        for (x, y, pixel) in image.enumerate_pixels() {
            data[y as usize * width as usize + x as usize] = encode_y(pixel.0);
        }

        let (cw, ch) = chroma_dimensions(width, height);
        for cy in 0..ch {
            for cx in 0..cw {
                let mut sum = [0.0f32; 3];
                let mut count = 0.0f32;
                for y in (cy * 2)..(cy * 2 + 2).min(height) {
                    for x in (cx * 2)..(cx * 2 + 2).min(width) {
                        let p = image.get_pixel(x, y).0;
                        sum[0] += p[0];
                        sum[1] += p[1];
                        sum[2] += p[2];
                        count += 1.0;
                    }
                }
                let avg = [sum[0] / count, sum[1] / count, sum[2] / count];
                let (cb, cr) = encode_chroma(avg);
                let (u_idx, v_idx) = Self::chroma_offsets(format, width, height, cx, cy);
                data[u_idx] = cb;
                data[v_idx] = cr;
            }
        }
    }

    #[allow(clippy::indexing_slicing)]
    // Safe: frame.validate() guarantees width * height * 4 bytes
    fn decode_rgba(frame: &VideoFrame) -> WorkImage {
        let (width, height) = frame.dimensions();
        let data = &frame.data;
        ImageBuffer::from_fn(width, height, |x, y| {
            let idx = (y as usize * width as usize + x as usize) * 4;
            Rgb([
                f32::from(data[idx]) / 255.0,
                f32::from(data[idx + 1]) / 255.0,
                f32::from(data[idx + 2]) / 255.0,
            ])
        })
    }

    #[allow(clippy::indexing_slicing)]
    // Safe: frame.validate() guarantees width * height * 4 bytes
    fn encode_rgba(image: &WorkImage, frame: &mut VideoFrame) {
        let width = frame.width as usize;
        for (x, y, pixel) in image.enumerate_pixels() {
            let idx = (y as usize * width + x as usize) * 4;
            frame.data[idx] = quantize(pixel[0] * 255.0);
            frame.data[idx + 1] = quantize(pixel[1] * 255.0);
            frame.data[idx + 2] = quantize(pixel[2] * 255.0);
        }
    }
}
