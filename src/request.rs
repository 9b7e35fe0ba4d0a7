//! What to capture and how.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::location::{resolve_url, PageUrl};
use crate::Size;

/// Smallest zoom and scale percentage a request accepts
pub const MIN_PERCENT: u32 = 10;

/// Typed capture options, validated once from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub zoom_percent: u32,
    pub scale_percent: u32,
    pub output: PathBuf,
    /// 0 = natural content width
    pub width: u32,
    /// 0 = natural content height
    pub height: u32,
    pub pause_secs: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            zoom_percent: 100,
            scale_percent: 100,
            output: PathBuf::from("image.png"),
            width: 0,
            height: 0,
            pause_secs: 0,
        }
    }
}

/// Parse an integer option the forgiving way: surrounding whitespace and a
/// sign are accepted, anything unparseable is 0.
pub fn parse_int(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Non-negative variant of [`parse_int`]; negative values become 0.
pub fn parse_dimension(raw: &str) -> u32 {
    parse_int(raw).clamp(0, u32::MAX as i64) as u32
}

/// Percentage option floored at [`MIN_PERCENT`].
pub fn parse_percent(raw: &str) -> u32 {
    parse_dimension(raw).max(MIN_PERCENT)
}

/// Immutable description of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    url: PageUrl,
    zoom_percent: u32,
    scale_percent: u32,
    output_path: PathBuf,
    width: u32,
    height: u32,
    pause_millis: u64,
}

impl CaptureRequest {
    /// Build a request from the positional URL argument and typed options.
    ///
    /// Zoom and scale below [`MIN_PERCENT`] are raised to it.
    pub fn new(target: &str, options: CaptureOptions) -> Self {
        Self {
            url: resolve_url(target),
            zoom_percent: options.zoom_percent.max(MIN_PERCENT),
            scale_percent: options.scale_percent.max(MIN_PERCENT),
            output_path: options.output,
            width: options.width,
            height: options.height,
            pause_millis: options.pause_secs.saturating_mul(1000),
        }
    }

    pub fn url(&self) -> &PageUrl {
        &self.url
    }

    pub fn zoom_percent(&self) -> u32 {
        self.zoom_percent
    }

    pub fn scale_percent(&self) -> u32 {
        self.scale_percent
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pause_millis(&self) -> u64 {
        self.pause_millis
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_millis)
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom_percent as f64 / 100.0
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_percent as f64 / 100.0
    }

    /// Layout hint applied before the load: a 4:3 box of the requested
    /// width, pre-divided by the output scale.
    pub fn initial_viewport(&self) -> Size {
        let height = (self.width as u64 * 3 / 4) as u32;
        Size::new(self.width, height).divided(self.scale_factor())
    }

    /// Apply the width/height overrides to the page's natural size.
    pub fn capture_size(&self, content: Size) -> Size {
        let mut size = content;
        if self.height != 0 {
            size.height = self.height;
        }
        if self.width != 0 {
            size.width = self.width;
        }
        size
    }
}
