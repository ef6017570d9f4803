use std::convert::Infallible;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// A resizable RGBA surface.
///
/// Rendering writes RGBA pixels into `frame_mut()`; the owner decides where they end up (blitted
/// into the window panel, or only hashed in headless runs).
pub trait Surface {
    type Error;

    fn size(&self) -> SurfaceSize;
    fn frame_mut(&mut self) -> &mut [u8];

    fn resize(&mut self, size: SurfaceSize) -> Result<(), Self::Error>;
}

/// In-memory RGBA surface. The board is drawn into one of these and later blitted into the
/// window frame, so it doubles as the headless/test surface.
#[derive(Debug, Clone, Default)]
pub struct RgbaBufferSurface {
    size: SurfaceSize,
    buf: Vec<u8>,
}

impl RgbaBufferSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            buf: vec![0u8; size.rgba_len()],
        }
    }

    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let idx = (y as usize * self.size.width as usize + x as usize) * 4;
        let px = self.buf.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Hex sha256 of the raw RGBA bytes; stable across runs for identical content.
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.size.width.to_le_bytes());
        hasher.update(self.size.height.to_le_bytes());
        hasher.update(&self.buf);
        hex::encode(hasher.finalize())
    }
}

impl Surface for RgbaBufferSurface {
    type Error = Infallible;

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), Self::Error> {
        self.size = size;
        self.buf.resize(size.rgba_len(), 0u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_tracks_rgba_len() {
        let mut surface = RgbaBufferSurface::new(SurfaceSize::new(4, 3));
        assert_eq!(surface.frame().len(), 4 * 3 * 4);

        surface.resize(SurfaceSize::new(10, 2)).unwrap();
        assert_eq!(surface.size(), SurfaceSize::new(10, 2));
        assert_eq!(surface.frame().len(), 10 * 2 * 4);
    }

    #[test]
    fn pixel_is_none_outside_bounds() {
        let surface = RgbaBufferSurface::new(SurfaceSize::new(2, 2));
        assert_eq!(surface.pixel(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(2, 0), None);
        assert_eq!(surface.pixel(0, 2), None);
    }

    #[test]
    fn digest_depends_on_shape_not_only_bytes() {
        let a = RgbaBufferSurface::new(SurfaceSize::new(4, 1));
        let b = RgbaBufferSurface::new(SurfaceSize::new(1, 4));
        assert_eq!(a.frame(), b.frame());
        assert_ne!(a.sha256_hex(), b.sha256_hex());
        assert_eq!(a.sha256_hex().len(), 64);
    }
}
