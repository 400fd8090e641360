//! The rendering backend contract.
//!
//! The generator treats text shaping and rasterization as an opaque
//! capability behind four operations: measure, create a transparent surface,
//! paint, encode PNG. The real implementation lives in [`cpu`]; tests use
//! fakes that record calls instead of producing pixels.

pub mod cpu;

use crate::error::{MarkshotError, MarkshotResult};
use crate::markup::Rgba8;

/// A drawing surface: premultiplied RGBA8 pixels, row-major.
///
/// Freshly created surfaces are fully transparent.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> MarkshotResult<Self> {
        if width == 0 || height == 0 {
            return Err(MarkshotError::render("surface dimensions must be nonzero"));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| MarkshotError::render("surface dimensions overflow"))?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Default styling applied to text outside any markup span.
#[derive(Clone, Debug, PartialEq)]
pub struct TextOptions {
    /// Default font family (or generic family such as `sans-serif`).
    pub family: String,
    /// Default font size in pixels.
    pub size_px: f32,
    /// Default text color.
    pub color: Rgba8,
    /// Optional wrap width in pixels. `None` lays out on a single line.
    pub max_width_px: Option<f32>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size_px: 64.0,
            color: Rgba8::WHITE,
            max_width_px: None,
        }
    }
}

/// Text layout and rasterization capability.
///
/// Implementations may keep internal shaping state across calls; callers
/// confine usage to one render at a time.
pub trait RenderBackend {
    /// Pixel extents of the laid-out markup.
    fn measure(&mut self, markup: &str, opts: &TextOptions) -> MarkshotResult<(u32, u32)>;

    /// Create a fully transparent surface.
    fn create_surface(&mut self, width: u32, height: u32) -> MarkshotResult<Surface>;

    /// Rasterize the markup onto the surface, centered.
    fn paint(
        &mut self,
        surface: &mut Surface,
        markup: &str,
        opts: &TextOptions,
    ) -> MarkshotResult<()>;

    /// Encode the surface as a straight-alpha RGBA PNG byte stream.
    fn encode_png(&mut self, surface: &Surface) -> MarkshotResult<Vec<u8>>;
}

#[derive(Clone, Copy, Debug)]
pub enum BackendKind {
    Cpu,
}

pub fn create_backend(kind: BackendKind) -> MarkshotResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(cpu::CpuBackend::new())),
    }
}
