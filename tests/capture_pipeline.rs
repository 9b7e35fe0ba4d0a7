use std::time::{Duration, Instant};

use webcapture::surface::RectF;
use webcapture::{
    run_capture, CaptureOptions, CaptureRequest, Error, EventSink, PageRenderer, PageUrl, RenderHints,
    Result, ScrollBarPolicy, Size, Surface,
};

/// Renderer that completes its load synchronously and paints a solid page
struct InstantPage {
    content: Size,
    succeed: bool,
}

impl PageRenderer for InstantPage {
    fn set_scroll_bars(&mut self, _policy: ScrollBarPolicy) {}

    fn set_zoom_factor(&mut self, _factor: f64) {}

    fn set_viewport_size(&mut self, _size: Size) {}

    fn load(&mut self, _url: &PageUrl, events: EventSink) {
        events.progress(30);
        // stale and out-of-range progress must not be echoed
        events.progress(20);
        events.progress(100);
        events.progress(100);
        events.load_complete(self.succeed);
    }

    fn url(&self) -> String {
        String::new()
    }

    fn content_size(&self) -> Size {
        self.content
    }

    fn paint(&mut self, surface: &mut Surface, _hints: RenderHints) -> Result<()> {
        let size = surface.size();
        surface.fill_rect(
            RectF::new(0.0, 0.0, size.width as f32, size.height as f32),
            image::Rgba([200, 30, 30, 255]),
            true,
        );
        Ok(())
    }
}

fn page(succeed: bool) -> InstantPage {
    InstantPage {
        content: Size::new(800, 600),
        succeed,
    }
}

#[tokio::test]
async fn successful_capture_writes_scaled_image() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("shot.png");
    let request = CaptureRequest::new(
        "http://example.test/",
        CaptureOptions {
            scale_percent: 50,
            output: output.clone(),
            ..Default::default()
        },
    );

    let mut out = Vec::new();
    run_capture(request, page(true), &mut out).await.unwrap();

    assert_eq!(image::image_dimensions(&output).unwrap(), (400, 300));
    let echoed = String::from_utf8(out).unwrap();
    assert_eq!(echoed, format!("Loading http://example.test/\n{}\n", "#".repeat(100)));
}

#[tokio::test]
async fn failed_load_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("shot.png");
    let request = CaptureRequest::new(
        "http://unreachable.test/",
        CaptureOptions {
            output: output.clone(),
            ..Default::default()
        },
    );

    let mut out = Vec::new();
    let err = run_capture(request, page(false), &mut out).await.unwrap_err();

    assert_eq!(err, Error::LoadError("http://unreachable.test/".into()));
    assert!(err.to_string().contains("http://unreachable.test/"));
    assert!(!output.exists());
}

#[tokio::test]
async fn pause_delays_the_picture() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("late.jpg");
    let request = CaptureRequest::new(
        "http://example.test/",
        CaptureOptions {
            output: output.clone(),
            pause_secs: 1,
            width: 64,
            height: 48,
            ..Default::default()
        },
    );

    let started = Instant::now();
    let mut out = Vec::new();
    run_capture(request, page(true), &mut out).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(image::image_dimensions(&output).unwrap(), (64, 48));
}

#[tokio::test]
async fn unwritable_output_fails_the_capture() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing-dir").join("shot.png");
    let request = CaptureRequest::new(
        "http://example.test/",
        CaptureOptions {
            output: output.clone(),
            ..Default::default()
        },
    );

    let mut out = Vec::new();
    let err = run_capture(request, page(true), &mut out).await.unwrap_err();
    assert!(matches!(err, Error::EncodeError(_)), "{:?}", err);
    assert!(!output.exists());
}
