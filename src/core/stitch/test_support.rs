//! Deterministic synthetic pages for stitching tests.

use std::io::Cursor;

use super::frame::Frame;

const CONTENT_SEED: u64 = 0x5EED_C0DE;
const HEADER_SEED: u64 = 0x00AD_BEEF;

fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn pixel(seed: u64, row: u32, x: u32) -> [u8; 4] {
    let h = mix(seed ^ ((row as u64) << 20) ^ x as u64);
    [h as u8, (h >> 8) as u8, (h >> 16) as u8, 255]
}

/// A tall page of hash-coloured rows, optionally topped by a sticky header
/// that stays put while the content scrolls underneath it.
pub struct SyntheticPage {
    pub width: u32,
    pub height: u32,
    pub header: u32,
}

impl SyntheticPage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            header: 0,
        }
    }

    pub fn with_header(mut self, header: u32) -> Self {
        self.header = header;
        self
    }

    /// Content row `row` of the page, without any header.
    pub fn content_row(&self, row: u32) -> Vec<u8> {
        (0..self.width)
            .flat_map(|x| pixel(CONTENT_SEED, row, x))
            .collect()
    }

    pub fn header_row(&self, row: u32) -> Vec<u8> {
        (0..self.width)
            .flat_map(|x| pixel(HEADER_SEED, row, x))
            .collect()
    }

    /// The viewport after the content has scrolled by `scroll` rows.
    pub fn frame(&self, source_id: usize, scroll: u32) -> Frame {
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for r in 0..self.height {
            if r < self.header {
                data.extend(self.header_row(r));
            } else {
                data.extend(self.content_row(scroll + r - self.header));
            }
        }
        Frame::from_rgba(source_id, self.width, self.height, data).unwrap()
    }

    pub fn png(&self, scroll: u32) -> Vec<u8> {
        encode_png(&self.frame(0, scroll))
    }
}

pub fn encode_png(frame: &Frame) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone()).unwrap();
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}
