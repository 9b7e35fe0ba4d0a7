//! Chrome DevTools Protocol renderer (uses the `headless_chrome` crate)

use std::sync::Arc;
use std::thread;

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde::Deserialize;

use crate::reactor::EventSink;
use crate::{
    EngineConfig, Error, PageRenderer, PageUrl, RenderHints, Result, ScrollBarPolicy, Size, Surface,
};

const CONTENT_SIZE_SCRIPT: &str = r#"
(function() {
    const doc = document.documentElement;
    const body = document.body;
    return JSON.stringify({
        width: Math.max(doc.scrollWidth, body ? body.scrollWidth : 0),
        height: Math.max(doc.scrollHeight, body ? body.scrollHeight : 0)
    });
})()
"#;

#[derive(Debug, Deserialize)]
struct ScrollSize {
    width: u32,
    height: u32,
}

/// Headless Chrome backend.
///
/// Launches a browser with a single tab. Navigation runs on a loader thread;
/// zoom and scroll bar policy are applied to the document once it has
/// navigated, and painting captures a PNG screenshot of the requested size.
pub struct CdpRenderer {
    // Kept alive for as long as the tab is in use
    _browser: Browser,
    tab: Arc<Tab>,
    zoom: f64,
    viewport: Size,
    scroll_bars: ScrollBarPolicy,
    current_url: String,
}

impl CdpRenderer {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;

        if !config.headers.is_empty() {
            // headless_chrome expects a HashMap<&str, &str>
            let headers: std::collections::HashMap<&str, &str> = config
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            tab.set_extra_http_headers(headers)
                .map_err(|e| Error::InitializationError(format!("Failed to set headers: {}", e)))?;
        }

        Ok(Self {
            _browser: browser,
            tab,
            zoom: 1.0,
            viewport: Size::default(),
            scroll_bars: ScrollBarPolicy::AsNeeded,
            current_url: String::new(),
        })
    }

    // Headless windows have no frame, so the window bounds are the viewport.
    fn window_bounds(size: Size) -> Option<Bounds> {
        if size.is_empty() {
            return None;
        }
        Some(Bounds::Normal {
            left: Some(0),
            top: Some(0),
            width: Some(size.width as f64),
            height: Some(size.height as f64),
        })
    }

    fn page_script(zoom: f64, scroll_bars: ScrollBarPolicy) -> String {
        let mut script = format!("if (document.body) {{ document.body.style.zoom = '{}'; }}", zoom);
        if scroll_bars == ScrollBarPolicy::AlwaysOff {
            script.push_str("document.documentElement.style.overflow = 'hidden';");
        }
        script
    }
}

impl PageRenderer for CdpRenderer {
    fn set_scroll_bars(&mut self, policy: ScrollBarPolicy) {
        self.scroll_bars = policy;
    }

    fn set_zoom_factor(&mut self, factor: f64) {
        self.zoom = factor;
    }

    fn set_viewport_size(&mut self, size: Size) {
        self.viewport = size;
        let Some(bounds) = Self::window_bounds(size) else {
            return;
        };
        if let Err(e) = self.tab.set_bounds(bounds) {
            warn!("Failed to resize the window to {}: {}", size, e);
        }
    }

    fn load(&mut self, url: &PageUrl, events: EventSink) {
        self.current_url = url.to_string();
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let script = Self::page_script(self.zoom, self.scroll_bars);
        let fail_events = events.clone();

        let spawned = thread::Builder::new().name("cdp-loader".into()).spawn(move || {
            if let Err(e) = tab.navigate_to(&target) {
                warn!("Navigation to {} failed: {}", target, e);
                events.load_complete(false);
                return;
            }
            events.progress(10);
            if let Err(e) = tab.wait_until_navigated() {
                warn!("Wait for navigation of {} failed: {}", target, e);
                events.load_complete(false);
                return;
            }
            events.progress(90);
            if let Err(e) = tab.evaluate(&script, false) {
                warn!("Failed to apply zoom to {}: {}", target, e);
            }
            events.progress(100);
            events.load_complete(true);
        });

        if let Err(e) = spawned {
            warn!("failed to spawn loader thread: {}", e);
            fail_events.load_complete(false);
        }
    }

    fn url(&self) -> String {
        let url = self.tab.get_url();
        if url.is_empty() {
            self.current_url.clone()
        } else {
            url
        }
    }

    fn content_size(&self) -> Size {
        let measured = self
            .tab
            .evaluate(CONTENT_SIZE_SCRIPT, false)
            .map_err(|e| Error::RenderError(format!("Evaluation failed: {}", e)))
            .and_then(|obj| {
                let value = obj
                    .value
                    .ok_or_else(|| Error::RenderError("No value returned from evaluation".into()))?;
                let json = value.as_str().map(str::to_owned).unwrap_or_else(|| value.to_string());
                serde_json::from_str::<ScrollSize>(&json)
                    .map(|s| Size::new(s.width, s.height))
                    .map_err(|e| Error::RenderError(format!("Bad content size {:?}: {}", json, e)))
            });
        match measured {
            Ok(size) => Size::new(size.width.max(self.viewport.width), size.height.max(self.viewport.height)),
            Err(e) => {
                warn!("{}", e);
                self.viewport
            }
        }
    }

    fn paint(&mut self, surface: &mut Surface, _hints: RenderHints) -> Result<()> {
        let size = surface.size();
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: size.width as f64,
            height: size.height as f64,
            scale: 1.0,
        };
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;
        let shot = image::load_from_memory(&png)
            .map_err(|e| Error::RenderError(format!("Screenshot could not be decoded: {}", e)))?
            .to_rgba8();
        debug!("screenshot {}x{} onto {}", shot.width(), shot.height(), size);
        surface.draw_image(&shot, 0, 0);
        Ok(())
    }
}
