//! The host side of a capture: event channel, one-shot timers and the loop
//! that feeds events into a [`CaptureSession`] until it finishes.

use std::io::Write;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::{CaptureEvent, CaptureSession, Directive};
use crate::{CaptureRequest, Error, PageRenderer, Result};

/// Sending half of the session's event channel.
///
/// Cheap to clone and safe to use from any thread; backends hand it to their
/// loader threads.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl EventSink {
    /// A new single-consumer channel.
    pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    /// Queue an event. Returns false once the receiving side is gone.
    pub fn send(&self, event: CaptureEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn progress(&self, percent: u8) -> bool {
        self.send(CaptureEvent::Progress(percent))
    }

    pub fn load_complete(&self, ok: bool) -> bool {
        self.send(CaptureEvent::LoadComplete(ok))
    }
}

/// A single delayed `TimerFired` event.
///
/// Must be started from inside a tokio runtime with the time driver enabled.
#[derive(Debug)]
pub struct OneShotTimer {
    handle: JoinHandle<()>,
}

impl OneShotTimer {
    pub fn start(delay: Duration, sink: EventSink) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.send(CaptureEvent::TimerFired);
        });
        Self { handle }
    }

    /// Stop the timer; if it has not fired yet it never will.
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run one capture to completion.
///
/// Writes `Loading <url>` and a `#` per percent of load progress to `out`,
/// then returns the session's terminal result. A page that never reports
/// completion keeps this future pending.
pub async fn run_capture<R, W>(request: CaptureRequest, renderer: R, out: &mut W) -> Result<()>
where
    R: PageRenderer,
    W: Write,
{
    let (sink, mut events) = EventSink::channel();
    let _ = writeln!(out, "Loading {}", request.url());

    let mut session = CaptureSession::new(request, renderer);
    let mut timers: Vec<OneShotTimer> = Vec::new();
    let mut pending = session.start(sink.clone());

    loop {
        for directive in pending.drain(..) {
            match directive {
                Directive::Progress { previous, current } => {
                    let hashes = "#".repeat(current.saturating_sub(previous) as usize);
                    let _ = out.write_all(hashes.as_bytes());
                    let _ = out.flush();
                }
                Directive::ScheduleTimer(delay) => {
                    debug!("waiting {:?} before painting", delay);
                    timers.push(OneShotTimer::start(delay, sink.clone()));
                }
                Directive::Finished(result) => {
                    for timer in timers {
                        timer.cancel();
                    }
                    match &result {
                        Ok(()) => info!("wrote {}", session.request().output_path().display()),
                        Err(e) => info!("capture failed: {}", e),
                    }
                    return result;
                }
            }
        }

        let event = events
            .recv()
            .await
            .ok_or_else(|| Error::Other("event channel closed before the capture finished".into()))?;
        if matches!(event, CaptureEvent::LoadComplete(_)) {
            let _ = writeln!(out);
        }
        pending = session.handle(event);
    }
}
