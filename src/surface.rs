//! Premultiplied-alpha pixel surface the page is painted onto.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::debug;

use crate::{Error, Result, Size};

/// Largest pixel buffer a surface may hold (2 GiB)
pub const MAX_SURFACE_BYTES: usize = i32::MAX as usize;

/// Memory layout of a [`Surface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, color channels pre-multiplied by alpha
    Rgba8Premultiplied,
}

/// Axis-aligned rectangle in surface pixels; edges may be fractional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// An owned raster the paint step draws into.
///
/// Pixels are stored premultiplied, so `r`, `g` and `b` never exceed `a`.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// A fully transparent surface.
    ///
    /// Fails with [`Error::RenderError`] when the pixel buffer would exceed
    /// [`MAX_SURFACE_BYTES`] or cannot be allocated.
    pub fn new_transparent(size: Size) -> Result<Self> {
        let len = buffer_len(size)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| Error::RenderError(format!("cannot allocate a {} surface: {}", size, e)))?;
        buf.resize(len, 0);
        let pixels = RgbaImage::from_raw(size.width, size.height, buf)
            .ok_or_else(|| Error::RenderError(format!("bad buffer for a {} surface", size)))?;
        Ok(Self { pixels })
    }

    pub fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8Premultiplied
    }

    /// Premultiplied RGBA bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Premultiplied value of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// Composite a straight-alpha `color` over `rect`.
    ///
    /// With `antialias` set, pixels the rectangle only partly covers get
    /// proportional coverage; otherwise edges snap to the nearest pixel.
    pub fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>, antialias: bool) {
        if rect.width <= 0.0 || rect.height <= 0.0 || color[3] == 0 {
            return;
        }
        let (w, h) = (self.pixels.width() as f32, self.pixels.height() as f32);
        let (mut x0, mut y0) = (rect.x, rect.y);
        let (mut x1, mut y1) = (rect.x + rect.width, rect.y + rect.height);
        if !antialias {
            x0 = x0.round();
            y0 = y0.round();
            x1 = x1.round();
            y1 = y1.round();
        }
        let (x0, y0) = (x0.max(0.0), y0.max(0.0));
        let (x1, y1) = (x1.min(w), y1.min(h));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for py in (y0.floor() as u32)..(y1.ceil() as u32) {
            let cov_y = overlap(py as f32, y0, y1);
            for px in (x0.floor() as u32)..(x1.ceil() as u32) {
                let coverage = cov_y * overlap(px as f32, x0, x1);
                if coverage > 0.0 {
                    let dst = self.pixels.get_pixel_mut(px, py);
                    blend_over(dst, color, coverage);
                }
            }
        }
    }

    /// Composite a straight-alpha image with its top-left corner at
    /// `(x, y)`. Parts outside the surface are clipped.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        for (sx, sy, src) in image.enumerate_pixels() {
            let (dx, dy) = (x + sx as i64, y + sy as i64);
            if dx < 0 || dy < 0 || dx >= self.pixels.width() as i64 || dy >= self.pixels.height() as i64 {
                continue;
            }
            let dst = self.pixels.get_pixel_mut(dx as u32, dy as u32);
            blend_over(dst, *src, 1.0);
        }
    }

    /// Resample to `size`, ignoring aspect ratio, with a smooth filter.
    pub fn scaled(&self, size: Size) -> Result<Surface> {
        if size == self.size() {
            return Ok(self.clone());
        }
        buffer_len(size)?;
        Ok(Surface {
            pixels: imageops::resize(&self.pixels, size.width, size.height, FilterType::Triangle),
        })
    }

    /// Convert to a straight-alpha image for encoding.
    pub fn to_straight(&self) -> RgbaImage {
        let mut out = self.pixels.clone();
        for p in out.pixels_mut() {
            let a = p[3];
            for c in 0..3 {
                p[c] = if a == 0 {
                    0
                } else {
                    ((p[c] as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8
                };
            }
        }
        out
    }

    /// Encode to `path`, picking the format from its extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = ImageFormat::from_path(path)
            .map_err(|e| Error::EncodeError(format!("{}: {}", path.display(), e)))?;
        if self.size().is_empty() {
            return Err(Error::EncodeError(format!(
                "{}: cannot encode an empty {} image",
                path.display(),
                self.size()
            )));
        }

        let image = DynamicImage::ImageRgba8(self.to_straight());
        let image = match format {
            // no alpha channel in these containers
            ImageFormat::Jpeg | ImageFormat::Pnm => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => image,
        };
        image
            .save_with_format(path, format)
            .map_err(|e| Error::EncodeError(format!("{}: {}", path.display(), e)))?;
        debug!("wrote {} {:?} image to {}", self.size(), format, path.display());
        Ok(())
    }
}

// Byte length of an RGBA8 buffer for `size`, within the surface limit.
fn buffer_len(size: Size) -> Result<usize> {
    (size.width as usize)
        .checked_mul(size.height as usize)
        .and_then(|px| px.checked_mul(4))
        .filter(|&len| len <= MAX_SURFACE_BYTES)
        .ok_or_else(|| Error::RenderError(format!("{} surface is too large", size)))
}

// Fraction of the unit cell starting at `p` that lies inside [lo, hi).
fn overlap(p: f32, lo: f32, hi: f32) -> f32 {
    ((p + 1.0).min(hi) - p.max(lo)).clamp(0.0, 1.0)
}

// Source-over with a straight-alpha source onto a premultiplied pixel.
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = src[3] as f32 / 255.0 * coverage;
    let inv = 1.0 - sa;
    for c in 0..3 {
        let v = src[c] as f32 * sa + dst[c] as f32 * inv;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    let a = 255.0 * sa + dst[3] as f32 * inv;
    dst[3] = a.round().clamp(0.0, 255.0) as u8;
}
