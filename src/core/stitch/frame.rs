use super::error::DecodeError;

/// 每像素字节数（RGBA8）
pub const BYTES_PER_PIXEL: usize = 4;

/// 解码后的单帧截图，捕获后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub source_id: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>, // RGBA 格式，行优先
}

impl Frame {
    /// Decode an encoded capture (PNG/JPEG/BMP) into an RGBA8 frame.
    pub fn decode(source_id: usize, bytes: &[u8]) -> Result<Self, DecodeError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(source_id, width, height, rgba.into_raw())
    }

    pub fn from_rgba(
        source_id: usize,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroDimensions { width, height });
        }

        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(DecodeError::BufferSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            source_id,
            width,
            height,
            pixels,
        })
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            top_offset: 0,
        }
    }
}

/// 帧的只读视图，裁掉顶部若干行后不复制像素
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    top_offset: u32,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rows removed from the top of the source frame.
    pub fn top_offset(&self) -> u32 {
        self.top_offset
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Returns the RGBA bytes of row `y` of this view.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    /// Drops `rows` from the top. Saturates at an empty view.
    pub fn crop_top(self, rows: u32) -> FrameView<'a> {
        let rows = rows.min(self.height);
        let start = rows as usize * self.stride();
        FrameView {
            pixels: &self.pixels[start..],
            width: self.width,
            height: self.height - rows,
            top_offset: self.top_offset + rows,
        }
    }
}
