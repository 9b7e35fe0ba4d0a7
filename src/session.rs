//! The capture state machine.
//!
//! ```text
//! Idle --start--> Loading --LoadComplete(true)--> Rendering ----> Finished
//!                    |             (pause > 0)        ^
//!                    |                 v              |
//!                    |           AwaitingDelay --TimerFired
//!                    +--LoadComplete(false)--> Finished(failed)
//! ```
//!
//! The session owns the renderer and is the only mutable state of a capture.
//! Events go in through [`CaptureSession::handle`] and the host gets back the
//! [`Directive`]s it has to carry out, so the whole machine runs without a
//! reactor in tests.

use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::reactor::EventSink;
use crate::{CaptureRequest, Error, PageRenderer, RenderHints, Result, ScrollBarPolicy, Surface};

/// Something the engine or the reactor reports to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Load progress in percent
    Progress(u8),
    /// The single completion signal of a load
    LoadComplete(bool),
    /// The post-load delay elapsed
    TimerFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    AwaitingDelay,
    Rendering,
    Finished(Outcome),
}

/// Work a transition hands back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Progress moved forward; echo it
    Progress { previous: u8, current: u8 },
    /// Deliver `TimerFired` after this long
    ScheduleTimer(Duration),
    /// Terminal signal, emitted once per session
    Finished(Result<()>),
}

pub struct CaptureSession<R> {
    request: CaptureRequest,
    renderer: R,
    state: SessionState,
    progress_percent: u8,
    load_succeeded: Option<bool>,
    image: Option<Surface>,
}

impl<R: PageRenderer> CaptureSession<R> {
    pub fn new(request: CaptureRequest, renderer: R) -> Self {
        Self {
            request,
            renderer,
            state: SessionState::Idle,
            progress_percent: 0,
            load_succeeded: None,
            image: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished(_))
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn load_succeeded(&self) -> Option<bool> {
        self.load_succeeded
    }

    /// The scaled surface, once the paint step has produced it
    pub fn image(&self) -> Option<&Surface> {
        self.image.as_ref()
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Configure the renderer for the request and issue the load.
    ///
    /// Only valid from `Idle`; later calls do nothing.
    pub fn start(&mut self, events: EventSink) -> Vec<Directive> {
        if self.state != SessionState::Idle {
            debug!("start() ignored in state {:?}", self.state);
            return Vec::new();
        }

        self.renderer.set_scroll_bars(ScrollBarPolicy::AlwaysOff);
        self.renderer.set_zoom_factor(self.request.zoom_factor());
        self.renderer.set_viewport_size(self.request.initial_viewport());

        self.state = SessionState::Loading;
        info!("loading {}", self.request.url());
        self.renderer.load(self.request.url(), events);
        Vec::new()
    }

    /// Feed one event through the state machine.
    pub fn handle(&mut self, event: CaptureEvent) -> Vec<Directive> {
        match (self.state, event) {
            (SessionState::Finished(_), _) => {
                warn!("{:?} after finish, ignored", event);
                Vec::new()
            }
            (SessionState::Loading, CaptureEvent::Progress(p)) => self.on_progress(p),
            (SessionState::Loading, CaptureEvent::LoadComplete(ok)) => self.on_load_complete(ok),
            (SessionState::AwaitingDelay, CaptureEvent::TimerFired) => self.render(),
            (state, event) => {
                debug!("{:?} ignored in state {:?}", event, state);
                Vec::new()
            }
        }
    }

    fn on_progress(&mut self, percent: u8) -> Vec<Directive> {
        let percent = percent.min(100);
        if percent <= self.progress_percent {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.progress_percent, percent);
        trace!("progress {}% -> {}%", previous, percent);
        vec![Directive::Progress {
            previous,
            current: percent,
        }]
    }

    fn on_load_complete(&mut self, ok: bool) -> Vec<Directive> {
        self.load_succeeded = Some(ok);
        if !ok {
            info!(
                "failed loading {} (main frame at {:?})",
                self.request.url(),
                self.renderer.url()
            );
            return self.finish(Err(Error::LoadError(self.request.url().to_string())));
        }

        if self.request.pause_millis() == 0 {
            return self.render();
        }
        self.state = SessionState::AwaitingDelay;
        vec![Directive::ScheduleTimer(self.request.pause())]
    }

    fn render(&mut self) -> Vec<Directive> {
        self.state = SessionState::Rendering;
        let result = self.paint_and_encode();
        if let Err(e) = &result {
            info!("capture of {} failed: {}", self.request.url(), e);
        }
        self.finish(result)
    }

    fn finish(&mut self, result: Result<()>) -> Vec<Directive> {
        let outcome = if result.is_ok() {
            Outcome::Succeeded
        } else {
            Outcome::Failed
        };
        self.state = SessionState::Finished(outcome);
        vec![Directive::Finished(result)]
    }

    fn paint_and_encode(&mut self) -> Result<()> {
        let content = self.renderer.content_size();
        let size = self.request.capture_size(content);
        debug!("content size {}, capturing {}", content, size);

        let mut surface = Surface::new_transparent(size)?;
        self.renderer.set_viewport_size(size);
        self.renderer.paint(&mut surface, RenderHints::high_quality())?;

        let target = size.scaled(self.request.scale_factor());
        let scaled = surface.scaled(target)?;
        let saved = scaled.save(self.request.output_path());
        self.image = Some(scaled);
        saved
    }
}
