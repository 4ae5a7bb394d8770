//! Simple RGBA8 image container with the raster operations the pipeline
//! needs: PNG decode/encode, blitting, cropping, rotation, and
//! opaque-bounds queries for trim detection.

use std::io::{Read, Write};

use thiserror::Error;

const STRIDE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Image {
    size: (u32, u32),
    data: Vec<u8>,
}

impl Image {
    pub fn new_rgba8<D: Into<Vec<u8>>>(size: (u32, u32), data: D) -> Self {
        let data = data.into();

        assert!(data.len() == (size.0 as usize) * (size.1 as usize) * STRIDE);

        Self { size, data }
    }

    pub fn new_empty_rgba8(size: (u32, u32)) -> Self {
        let data = vec![0; (size.0 as usize) * (size.1 as usize) * STRIDE];
        Self::new_rgba8(size, data)
    }

    pub fn decode_png<R: Read>(input: R) -> Result<Self, DecodeError> {
        let decoder = png::Decoder::new(input);

        let (info, mut reader) = decoder.read_info()?;

        if info.bit_depth != png::BitDepth::Eight {
            return Err(DecodeError::UnsupportedBitDepth {
                bit_depth: info.bit_depth,
            });
        }

        let mut data = vec![0; info.buffer_size()];
        reader.next_frame(&mut data)?;

        let size = (info.width, info.height);

        match info.color_type {
            png::ColorType::RGBA => Ok(Self::new_rgba8(size, data)),
            png::ColorType::RGB => {
                // Promote to RGBA with every pixel fully opaque.
                let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
                for rgb in data.chunks_exact(3) {
                    rgba.extend_from_slice(rgb);
                    rgba.push(255);
                }

                Ok(Self::new_rgba8(size, rgba))
            }
            color_type => Err(DecodeError::UnsupportedColorType { color_type }),
        }
    }

    pub fn encode_png<W: Write>(&self, output: W) -> Result<(), png::EncodingError> {
        let mut encoder = png::Encoder::new(output, self.size.0, self.size.1);
        encoder.set_color(png::ColorType::RGBA);
        encoder.set_depth(png::BitDepth::Eight);

        let mut output_writer = encoder.write_header()?;
        output_writer.write_image_data(&self.data)?;

        // On drop, output_writer will write the last chunk of the PNG
        // file.
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Copies `other` into this image with its top-left corner at
    /// `pos`. The source must fit entirely inside this image.
    pub fn blit(&mut self, other: &Image, pos: (u32, u32)) {
        assert!(pos.0 + other.size.0 <= self.size.0);
        assert!(pos.1 + other.size.1 <= self.size.1);

        let other_width_bytes = other.size.0 as usize * STRIDE;
        let other_rows = other.data.chunks_exact(other_width_bytes);

        for (other_y, other_row) in other_rows.enumerate() {
            let self_y = pos.1 + other_y as u32;

            let start_px = (pos.0 + self.size.0 * self_y) as usize;

            let start_in_bytes = STRIDE * start_px;
            let end_in_bytes = start_in_bytes + other_row.len();

            let self_row = &mut self.data[start_in_bytes..end_in_bytes];
            self_row.copy_from_slice(other_row);
        }
    }

    pub fn get_pixel(&self, pos: (u32, u32)) -> Pixel {
        assert!(pos.0 < self.size.0);
        assert!(pos.1 < self.size.1);

        let start = STRIDE * (pos.0 + pos.1 * self.size.0) as usize;

        Pixel {
            r: self.data[start],
            g: self.data[start + 1],
            b: self.data[start + 2],
            a: self.data[start + 3],
        }
    }

    pub fn set_pixel(&mut self, pos: (u32, u32), pixel: Pixel) {
        assert!(pos.0 < self.size.0);
        assert!(pos.1 < self.size.1);

        let start = STRIDE * (pos.0 + pos.1 * self.size.0) as usize;

        self.data[start] = pixel.r;
        self.data[start + 1] = pixel.g;
        self.data[start + 2] = pixel.b;
        self.data[start + 3] = pixel.a;
    }

    /// Returns a copy of the given region of this image.
    pub fn crop(&self, pos: (u32, u32), size: (u32, u32)) -> Image {
        assert!(pos.0 + size.0 <= self.size.0);
        assert!(pos.1 + size.1 <= self.size.1);

        let mut data = Vec::with_capacity(size.0 as usize * size.1 as usize * STRIDE);

        for y in pos.1..pos.1 + size.1 {
            let start = STRIDE * (pos.0 + y * self.size.0) as usize;
            let end = start + size.0 as usize * STRIDE;
            data.extend_from_slice(&self.data[start..end]);
        }

        Image::new_rgba8(size, data)
    }

    /// Returns this image rotated 90 degrees clockwise.
    pub fn rotated90(&self) -> Image {
        let (w, h) = self.size;
        let mut rotated = Image::new_empty_rgba8((h, w));

        for y in 0..h {
            for x in 0..w {
                rotated.set_pixel((h - 1 - y, x), self.get_pixel((x, y)));
            }
        }

        rotated
    }

    /// The smallest rectangle `(x, y, w, h)` containing every pixel
    /// with nonzero alpha, or `None` for a fully transparent image.
    pub fn opaque_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = self.size;

        let mut min = (w, h);
        let mut max = (0, 0);
        let mut any = false;

        for y in 0..h {
            for x in 0..w {
                if self.get_pixel((x, y)).a != 0 {
                    any = true;
                    min.0 = min.0.min(x);
                    min.1 = min.1.min(y);
                    max.0 = max.0.max(x);
                    max.1 = max.1.max(y);
                }
            }
        }

        if any {
            Some((min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1))
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed png data: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("unsupported color type {color_type:?}; sources must be 8-bit RGB or RGBA")]
    UnsupportedColorType { color_type: png::ColorType },

    #[error("unsupported bit depth {bit_depth:?}; sources must be 8-bit")]
    UnsupportedBitDepth { bit_depth: png::BitDepth },
}
