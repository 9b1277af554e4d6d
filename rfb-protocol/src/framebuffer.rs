//! Local copy of the remote framebuffer.
//!
//! Pixels are stored exactly as the server sends them (its native pixel
//! format, row-major, `bytes_per_pixel` bytes each). The buffer is allocated
//! when the first rectangle is applied and only ever grows. Every applied
//! rectangle bumps [`Framebuffer::version`], so callers can detect new content
//! by polling the counter.

use rfb_common::Rect;

/// Pixel store plus a monotonically increasing version counter.
#[derive(Debug, Default, Clone)]
pub struct Framebuffer {
    data: Vec<u8>,
    version: u64,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rectangles applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Raw pixel bytes, or `None` before the first rectangle arrives.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        if self.data.is_empty() {
            None
        } else {
            Some(&self.data)
        }
    }

    /// Copy a raw rectangle into a `width` x `height` surface.
    ///
    /// The rectangle is clipped to the surface; rows and columns falling
    /// outside it are dropped. `pixels` holds the rectangle's full payload,
    /// `rect.width * rect.height * bytes_per_pixel` bytes.
    pub fn apply_raw(
        &mut self,
        width: u16,
        height: u16,
        bytes_per_pixel: u8,
        rect: Rect,
        pixels: &[u8],
    ) {
        let bpp = usize::from(bytes_per_pixel);
        let stride = usize::from(width) * bpp;
        let size = stride * usize::from(height);
        if self.data.len() < size {
            self.data.resize(size, 0);
        }

        let clipped = rect.clip_to(width, height);
        if !clipped.is_empty() {
            let row_bytes = usize::from(clipped.width) * bpp;
            let src_stride = usize::from(rect.width) * bpp;
            let dst_x = usize::from(clipped.x) * bpp;

            for row in 0..usize::from(clipped.height) {
                let src = row * src_stride;
                let dst = (usize::from(clipped.y) + row) * stride + dst_x;
                let Some(source) = pixels.get(src..src + row_bytes) else {
                    break;
                };
                self.data[dst..dst + row_bytes].copy_from_slice(source);
            }
        }

        self.version += 1;
    }
}
