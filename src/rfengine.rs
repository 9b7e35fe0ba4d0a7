//! RFEngine: lightweight pure-Rust backend.
//!
//! Pages are fetched on a loader thread (blocking reqwest client for
//! `http`/`https`, plain file reads for `file`), laid out as a column of
//! blocks and painted with greeked text. No JavaScript runs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use reqwest::blocking::Client;
use url::Url;

use crate::reactor::EventSink;
use crate::rendering::{self, PageLayout};
use crate::{
    EngineConfig, Error, PageRenderer, PageUrl, RenderHints, Result, ScrollBarPolicy, Size, Surface,
};

/// Width reserved for a vertical scroll bar when one is shown
pub const SCROLL_BAR_EXTENT: u32 = 15;

const SCROLL_BAR_TRACK: [u8; 4] = [220, 220, 220, 255];

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

pub struct RFEngine {
    config: EngineConfig,
    zoom: f64,
    viewport: Size,
    scroll_bars: ScrollBarPolicy,
    current_url: String,
    // Written once by the loader thread, read on the reactor thread after
    // LoadComplete(true) has been delivered.
    page: Arc<Mutex<Option<LoadedPage>>>,
}

impl RFEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            viewport: Size::default(),
            scroll_bars: ScrollBarPolicy::AsNeeded,
            current_url: String::new(),
            page: Arc::new(Mutex::new(None)),
        }
    }

    /// Load `html` directly, as if it had been fetched from `url`.
    pub fn set_html(&mut self, html: &str, url: &str) {
        self.current_url = url.to_string();
        if let Ok(mut slot) = self.page.lock() {
            *slot = Some(LoadedPage {
                url: url.to_string(),
                html: html.to_string(),
            });
        }
    }

    fn zoom(&self) -> f64 {
        if self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    // Viewport width in device pixels, falling back to the configured one
    // while the viewport has no width yet.
    fn device_width(&self) -> u32 {
        if self.viewport.width > 0 {
            self.viewport.width
        } else {
            self.config.viewport.width
        }
    }

    fn css_px(&self, device: u32) -> u32 {
        ((device as f64 / self.zoom()).round() as u32).max(1)
    }

    /// Layout plus whether a scroll bar gutter was reserved.
    fn layout(&self) -> Option<(PageLayout, bool)> {
        let guard = self.page.lock().ok()?;
        let page = guard.as_ref()?;

        let width = self.device_width();
        let layout = rendering::layout_html(&page.html, self.css_px(width));
        let overflows = self.viewport.height > 0
            && layout.height as f64 * self.zoom() > self.viewport.height as f64;
        if self.scroll_bars == ScrollBarPolicy::AsNeeded && overflows && width > SCROLL_BAR_EXTENT {
            let narrowed = rendering::layout_html(&page.html, self.css_px(width - SCROLL_BAR_EXTENT));
            return Some((narrowed, true));
        }
        Some((layout, false))
    }
}

impl PageRenderer for RFEngine {
    fn set_scroll_bars(&mut self, policy: ScrollBarPolicy) {
        self.scroll_bars = policy;
    }

    fn set_zoom_factor(&mut self, factor: f64) {
        self.zoom = factor;
    }

    fn set_viewport_size(&mut self, size: Size) {
        self.viewport = size;
    }

    fn load(&mut self, url: &PageUrl, events: EventSink) {
        self.current_url = url.to_string();
        if let Ok(mut slot) = self.page.lock() {
            *slot = None;
        }

        let target = url.clone();
        let config = self.config.clone();
        let page = Arc::clone(&self.page);
        let fail_events = events.clone();

        let spawned = thread::Builder::new()
            .name("rfengine-loader".into())
            .spawn(move || {
                let ok = match fetch(&target, &config, &events) {
                    Ok(html) => match page.lock() {
                        Ok(mut slot) => {
                            *slot = Some(LoadedPage {
                                url: target.to_string(),
                                html,
                            });
                            true
                        }
                        Err(_) => false,
                    },
                    Err(e) => {
                        warn!("{}", e);
                        false
                    }
                };
                events.load_complete(ok);
            });

        if let Err(e) = spawned {
            error!("failed to spawn loader thread: {}", e);
            fail_events.load_complete(false);
        }
    }

    fn url(&self) -> String {
        match self.page.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|p| p.url.clone())
                .unwrap_or_else(|| self.current_url.clone()),
            Err(_) => self.current_url.clone(),
        }
    }

    fn content_size(&self) -> Size {
        let Some((layout, gutter)) = self.layout() else {
            return self.viewport;
        };
        let zoom = self.zoom();
        let gutter = if gutter { SCROLL_BAR_EXTENT } else { 0 };
        let width = (layout.width as f64 * zoom).ceil() as u32 + gutter;
        let height = (layout.height as f64 * zoom).ceil() as u32;
        Size::new(width.max(self.viewport.width), height.max(self.viewport.height))
    }

    fn paint(&mut self, surface: &mut Surface, hints: RenderHints) -> Result<()> {
        let (layout, gutter) = self
            .layout()
            .ok_or_else(|| Error::RenderError("No document loaded".into()))?;
        debug!(
            "painting {} blocks onto {} at zoom {}",
            layout.nodes.len(),
            surface.size(),
            self.zoom()
        );
        rendering::paint_layout(&layout, surface, self.zoom(), hints);

        if gutter {
            let size = surface.size();
            let x = size.width.saturating_sub(SCROLL_BAR_EXTENT);
            surface.fill_rect(
                crate::surface::RectF::new(x as f32, 0.0, SCROLL_BAR_EXTENT as f32, size.height as f32),
                image::Rgba(SCROLL_BAR_TRACK),
                false,
            );
        }
        Ok(())
    }
}

fn fetch(url: &PageUrl, config: &EngineConfig, events: &EventSink) -> Result<String> {
    let Some(url) = url.as_url() else {
        return Err(Error::LoadError(format!("{} is not a valid URL", url)));
    };
    match url.scheme() {
        "http" | "https" => fetch_http(url, config, events),
        "file" => fetch_file(url, events),
        other => Err(Error::LoadError(format!(
            "{}: unsupported scheme {:?}",
            url, other
        ))),
    }
}

fn fetch_http(url: &Url, config: &EngineConfig, events: &EventSink) -> Result<String> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone());
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    let client = builder
        .build()
        .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

    let mut request = client.get(url.clone());
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    events.progress(10);
    let resp = request
        .send()
        .map_err(|e| Error::LoadError(format!("{}: {}", url, e)))?;
    events.progress(60);

    if !resp.status().is_success() {
        warn!("{} answered {}, rendering the response anyway", url, resp.status());
    }
    let body = resp
        .text()
        .map_err(|e| Error::LoadError(format!("{}: failed to read response body: {}", url, e)))?;
    events.progress(100);
    Ok(body)
}

fn fetch_file(url: &Url, events: &EventSink) -> Result<String> {
    let path: PathBuf = url
        .to_file_path()
        .map_err(|_| Error::LoadError(format!("{} does not name a local path", url)))?;
    events.progress(10);
    let html = std::fs::read_to_string(&path)
        .map_err(|e| Error::LoadError(format!("{}: {}", path.display(), e)))?;
    events.progress(100);
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CaptureEvent;

    const PAGE: &str = "<html><head><title>Hi</title></head><body><p>Hello world</p></body></html>";

    fn engine_with(html: &str) -> RFEngine {
        let mut engine = RFEngine::new(EngineConfig::default());
        engine.set_html(html, "http://example.com/");
        engine
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        while let Some(ev) = rx.blocking_recv() {
            let done = matches!(ev, CaptureEvent::LoadComplete(_));
            events.push(ev);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn content_width_falls_back_to_config_viewport() {
        let engine = engine_with(PAGE);
        let size = engine.content_size();
        assert_eq!(size.width, 1024);
        assert!(size.height > 0);
    }

    #[test]
    fn zoom_scales_content_height() {
        let mut engine = engine_with(PAGE);
        engine.set_viewport_size(Size::new(400, 0));
        let plain = engine.content_size();
        engine.set_zoom_factor(2.0);
        let zoomed = engine.content_size();
        assert_eq!(plain.width, 400);
        assert_eq!(zoomed.width, 400);
        assert!(zoomed.height > plain.height);
    }

    #[test]
    fn content_is_at_least_the_viewport() {
        let mut engine = engine_with(PAGE);
        engine.set_scroll_bars(ScrollBarPolicy::AlwaysOff);
        engine.set_viewport_size(Size::new(300, 2000));
        assert_eq!(engine.content_size(), Size::new(300, 2000));
    }

    #[test]
    fn scroll_bar_gutter_only_when_allowed() {
        let tall = format!("<body>{}</body>", "<p>line</p>".repeat(100));
        let mut engine = engine_with(&tall);
        engine.set_viewport_size(Size::new(300, 100));

        let mut surface = Surface::new_transparent(Size::new(300, 100)).unwrap();
        engine.paint(&mut surface, RenderHints::high_quality()).unwrap();
        assert_eq!(surface.pixel(299, 50), [220, 220, 220, 255]);

        engine.set_scroll_bars(ScrollBarPolicy::AlwaysOff);
        let mut surface = Surface::new_transparent(Size::new(300, 100)).unwrap();
        engine.paint(&mut surface, RenderHints::high_quality()).unwrap();
        assert_eq!(surface.pixel(299, 50), [255, 255, 255, 255]);
    }

    #[test]
    fn paint_fills_background_and_text() {
        let mut engine = engine_with(PAGE);
        engine.set_scroll_bars(ScrollBarPolicy::AlwaysOff);
        let size = Size::new(200, 100);
        engine.set_viewport_size(size);
        let mut surface = Surface::new_transparent(size).unwrap();
        engine.paint(&mut surface, RenderHints::high_quality()).unwrap();

        assert_eq!(surface.pixel(199, 99), [255, 255, 255, 255]);
        let dark = surface.as_raw().chunks(4).filter(|p| p[0] < 100).count();
        assert!(dark > 0, "no text was painted");
    }

    #[test]
    fn paint_without_page_is_an_error() {
        let mut engine = RFEngine::new(EngineConfig::default());
        let mut surface = Surface::new_transparent(Size::new(4, 4)).unwrap();
        assert!(matches!(
            engine.paint(&mut surface, RenderHints::default()),
            Err(Error::RenderError(_))
        ));
    }

    #[test]
    fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, PAGE).unwrap();
        let url = PageUrl::Valid(Url::from_file_path(&path).unwrap());

        let mut engine = RFEngine::new(EngineConfig::default());
        let (sink, mut rx) = EventSink::channel();
        engine.load(&url, sink);
        let events = drain(&mut rx);

        assert_eq!(
            events,
            vec![
                CaptureEvent::Progress(10),
                CaptureEvent::Progress(100),
                CaptureEvent::LoadComplete(true)
            ]
        );
        assert_eq!(engine.url(), url.to_string());
        assert!(engine.content_size().height > 0);
    }

    #[test]
    fn missing_file_and_odd_schemes_fail() {
        for url in [
            PageUrl::Valid(Url::parse("file:///definitely/not/here.html").unwrap()),
            PageUrl::Valid(Url::parse("ftp://ftp.example.com/").unwrap()),
            PageUrl::Raw("not a url".into()),
        ] {
            let mut engine = RFEngine::new(EngineConfig::default());
            let (sink, mut rx) = EventSink::channel();
            engine.load(&url, sink);
            let events = drain(&mut rx);
            assert_eq!(events.last(), Some(&CaptureEvent::LoadComplete(false)), "{}", url);
        }
    }
}
