//! webcapture
//!
//! Renders a single web page to a scaled raster image file. The interesting
//! part is the capture pipeline: a page load reports progress and completion
//! as events, an optional delay lets page scripts settle, and the page is
//! then painted, scaled and encoded to the output path.
//!
//! # Features
//!
//! - **RFEngine** (default): pure-Rust backend that fetches with reqwest,
//!   parses with scraper and rasterizes a simple block layout
//! - **CDP** (`cdp` feature): drives headless Chrome via the DevTools protocol
//!
//! # Example
//!
//! ```no_run
//! use webcapture::{CaptureOptions, CaptureRequest, EngineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CaptureOptions {
//!     scale_percent: 50,
//!     ..Default::default()
//! };
//! let request = CaptureRequest::new("example.com", options);
//! let renderer = webcapture::new_renderer(EngineConfig::default())?;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()?;
//! let outcome = runtime.block_on(webcapture::run_capture(
//!     request,
//!     renderer,
//!     &mut std::io::stdout(),
//! ));
//! println!("captured: {}", outcome.is_ok());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

pub mod cli;
pub mod error;
pub mod location;
pub mod reactor;
pub mod request;
pub mod session;
pub mod surface;

pub use error::{Error, Result};
pub use location::{resolve_url, PageUrl};
pub use reactor::{run_capture, EventSink, OneShotTimer};
pub use request::{CaptureOptions, CaptureRequest};
pub use session::{CaptureEvent, CaptureSession, Directive, Outcome, SessionState};
pub use surface::Surface;

#[cfg(feature = "cdp")]
pub mod cdp;

// RFEngine: pure-Rust backend (HTTP/file fetch, block layout, greeked text)
#[cfg(feature = "rfengine")]
pub mod rfengine;

#[cfg(feature = "rfengine")]
pub mod rendering;

/// Configuration for a rendering backend
///
/// The capture request decides what is captured; this struct decides how the
/// backend talks to the outside world.
///
/// # Examples
///
/// ```
/// let cfg = webcapture::EngineConfig::default();
/// assert!(cfg.user_agent.contains("webcapture"));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Layout size used while the viewport is still empty
    pub viewport: Size,
    /// Timeout for fetching the page in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Whether to honour `HTTP_PROXY` and friends
    pub use_system_proxy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) webcapture/{}",
                env!("CARGO_PKG_VERSION")
            ),
            viewport: Size::new(1024, 768),
            timeout_ms: 30000,
            headers: HashMap::new(),
            use_system_proxy: true,
        }
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either axis is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Multiply both axes by `factor`, rounding each to the nearest pixel.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            width: round_px(self.width as f64 * factor),
            height: round_px(self.height as f64 * factor),
        }
    }

    /// Divide both axes by `divisor`, rounding each to the nearest pixel.
    pub fn divided(self, divisor: f64) -> Self {
        Self {
            width: round_px(self.width as f64 / divisor),
            height: round_px(self.height as f64 / divisor),
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn round_px(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Scroll bar visibility applied to both axes of the main frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBarPolicy {
    #[default]
    AsNeeded,
    AlwaysOff,
}

/// Quality switches for the paint step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderHints {
    /// Coverage-based edges for shapes that do not sit on pixel boundaries
    pub antialiasing: bool,
    /// Same for text
    pub text_antialiasing: bool,
    /// Smooth filtering when images are drawn scaled
    pub smooth_pixmap_transform: bool,
}

impl RenderHints {
    /// All hints on.
    pub fn high_quality() -> Self {
        Self {
            antialiasing: true,
            text_antialiasing: true,
            smooth_pixmap_transform: true,
        }
    }
}

/// The rendering engine the capture session drives.
///
/// Loading is asynchronous: `load` returns immediately and the backend
/// reports progress and the single completion through the `EventSink`.
/// Everything else is called on the reactor thread between events.
pub trait PageRenderer {
    /// Apply the scroll bar policy to both axes
    fn set_scroll_bars(&mut self, policy: ScrollBarPolicy);

    /// Page zoom factor (1.0 = no zoom)
    fn set_zoom_factor(&mut self, factor: f64);

    /// Size of the area the page is laid out and painted into
    fn set_viewport_size(&mut self, size: Size);

    /// Start loading `url`; progress and completion arrive through `events`
    fn load(&mut self, url: &PageUrl, events: EventSink);

    /// URL of the page currently in the main frame
    fn url(&self) -> String;

    /// Natural size of the laid-out page at the current viewport and zoom
    fn content_size(&self) -> Size;

    /// Paint the page onto `surface`, top-left aligned
    fn paint(&mut self, surface: &mut Surface, hints: RenderHints) -> Result<()>;
}

/// Create a renderer with the default backend
///
/// This prefers the CDP backend when the `cdp` feature is enabled, and the
/// pure-Rust `RFEngine` otherwise.
#[cfg(feature = "cdp")]
pub fn new_renderer(config: EngineConfig) -> Result<impl PageRenderer> {
    cdp::CdpRenderer::new(config)
}

#[cfg(all(not(feature = "cdp"), feature = "rfengine"))]
pub fn new_renderer(config: EngineConfig) -> Result<impl PageRenderer> {
    Ok(rfengine::RFEngine::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport, Size::new(1024, 768));
        assert!(config.use_system_proxy);
    }

    #[test]
    fn size_scaling_rounds_each_axis() {
        assert_eq!(Size::new(800, 600).scaled(0.5), Size::new(400, 300));
        assert_eq!(Size::new(3, 5).scaled(0.5), Size::new(2, 3));
        assert_eq!(Size::new(1024, 768).divided(0.5), Size::new(2048, 1536));
        assert_eq!(Size::new(0, 0).divided(0.1), Size::new(0, 0));
    }

    #[test]
    fn empty_size() {
        assert!(Size::new(0, 10).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }
}
