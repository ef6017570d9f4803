use pixels::Pixels;

use crate::graphics::{CpuRenderer, Renderer2d};
use crate::surface::SurfaceSize;

/// Window frame backed by `pixels`: drawn on the CPU, uploaded and presented on `render`.
///
/// The pixel buffer always matches the window's inner size, so window coordinates are frame
/// coordinates.
pub struct PixelsRenderer2d {
    pixels: Pixels,
    size: SurfaceSize,
}

impl PixelsRenderer2d {
    pub fn new(mut pixels: Pixels, size: SurfaceSize) -> Result<Self, pixels::Error> {
        let size = SurfaceSize::new(size.width.max(1), size.height.max(1));
        pixels.resize_buffer(size.width, size.height)?;
        Ok(Self { pixels, size })
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Follows a window resize. A 0x0 (minimised) window keeps the previous buffer.
    pub fn resize(&mut self, size: SurfaceSize) -> Result<(), pixels::Error> {
        if size.is_empty() || size == self.size {
            return Ok(());
        }
        self.pixels.resize_surface(size.width, size.height)?;
        self.pixels.resize_buffer(size.width, size.height)?;
        self.size = size;
        Ok(())
    }

    /// Draws a whole frame through `draw`, then presents it.
    pub fn render<F>(&mut self, draw: F) -> Result<(), pixels::Error>
    where
        F: FnOnce(&mut dyn Renderer2d),
    {
        {
            let mut cpu = CpuRenderer::new(self.pixels.frame_mut(), self.size);
            cpu.begin_frame(self.size);
            draw(&mut cpu);
        }
        self.pixels.render()
    }
}
