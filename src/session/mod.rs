// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Session loop
///
/// - `Session`: Idle/Active state machine owning the frame source, detector and event log
/// - `Ticker`: the fixed-period timer that drives cycles
/// - `run_blocking`: headless driver (sleep between ticks, stop flag)
pub mod runner;
pub mod ticker;

pub use runner::run_blocking;
pub use ticker::{Ticker, DEFAULT_TICK};

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, error, info, trace, warn};

use crate::annotate::Annotator;
use crate::detection::{DetectionBatch, Detector};
use crate::display::DisplaySink;
use crate::error::{FireError, Result};
use crate::event_log::{Alert, EventLog};
use crate::input::{DeviceGuard, FrameSource};

/// Cycles between throughput summaries.
const STATS_EVERY: u64 = 60;

/// Wall-clock time stamped onto event records.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device open, timer stopped.
    Idle,
    /// Device open, timer running.
    Active,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    /// The session was not active.
    Idle,
    /// No frame was available.
    Skipped,
    Rendered(CycleReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub detections: DetectionBatch,
    /// Only set when the event log is enabled.
    pub alert: Option<Alert>,
    pub inference: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub cycles: u64,
    pub positives: u64,
    pub last_inference: Duration,
}

pub struct Session<S: FrameSource, D: Detector, C: Clock = SystemClock> {
    source: S,
    detector: D,
    annotator: Annotator,
    clock: C,
    device: Option<DeviceGuard<S::Capture>>,
    ticker: Ticker,
    event_log: Option<EventLog>,
    stats: SessionStats,
    window_start: Instant,
    window_inference: Duration,
}

impl<S: FrameSource, D: Detector> Session<S, D> {
    pub fn new(source: S, detector: D) -> Self {
        Self::with_clock(source, detector, SystemClock)
    }
}

impl<S: FrameSource, D: Detector, C: Clock> Session<S, D, C> {
    pub fn with_clock(source: S, detector: D, clock: C) -> Self {
        Self {
            source,
            detector,
            annotator: Annotator::default(),
            clock,
            device: None,
            ticker: Ticker::default(),
            event_log: None,
            stats: SessionStats::default(),
            window_start: Instant::now(),
            window_inference: Duration::ZERO,
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_tick(mut self, period: Duration) -> Self {
        self.ticker = Ticker::new(period);
        self
    }

    /// Records positive cycles and reports an alert for every cycle.
    pub fn with_event_log(mut self) -> Self {
        self.event_log = Some(EventLog::new());
        self
    }

    pub fn state(&self) -> SessionState {
        if self.device.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.event_log.as_ref()
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// Idle → Active: opens the device and arms the timer. A no-op when already active.
    ///
    /// When the device cannot be opened the session stays idle and the error is returned.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        if self.device.is_some() {
            debug!("session already active");
            return Ok(());
        }
        let capture = self.source.open()?;
        self.device = Some(DeviceGuard::new(capture));
        self.ticker.start(now);
        self.window_start = now;
        self.window_inference = Duration::ZERO;
        info!("▶️ session started on {}", self.source.describe());
        Ok(())
    }

    /// Active → Idle: stops the timer and releases the device.
    pub fn stop(&mut self) {
        self.ticker.stop();
        if self.device.take().is_some() {
            info!(
                "⏹️ session stopped after {} cycles ({} with fire)",
                self.stats.cycles, self.stats.positives
            );
        }
    }

    /// Runs a cycle when the timer is due.
    pub fn poll<K: DisplaySink>(&mut self, now: Instant, sink: &mut K) -> Result<Cycle> {
        if self.device.is_none() || !self.ticker.poll(now) {
            return Ok(Cycle::Idle);
        }
        self.tick(sink)
    }

    /// One full cycle: read, detect, annotate, log, render.
    ///
    /// The device is held outside the session while the detector runs; it is put back
    /// only when detection succeeds, so a failing or panicking detector leaves the
    /// session idle with the device released.
    pub fn tick<K: DisplaySink>(&mut self, sink: &mut K) -> Result<Cycle> {
        let Some(mut device) = self.device.take() else {
            return Ok(Cycle::Idle);
        };

        let Some(frame) = device.read() else {
            trace!("no frame available, cycle skipped");
            self.device = Some(device);
            return Ok(Cycle::Skipped);
        };

        let t = Instant::now();
        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                drop(device);
                self.ticker.stop();
                error!("❌ detection failed, session stopped: {}", e);
                return Err(e);
            }
        };
        let inference = t.elapsed();
        self.device = Some(device);

        let annotated = self.annotator.annotate(&frame, &detections);

        let has_fire = !detections.is_empty();
        let alert = match self.event_log.as_mut() {
            Some(log) => Some(log.record(self.clock.now(), has_fire)),
            None => None,
        };
        if has_fire {
            info!("🔥 {} fire region(s) detected", detections.len());
        }

        sink.show(&annotated);

        self.stats.cycles += 1;
        self.stats.positives += has_fire as u64;
        self.stats.last_inference = inference;
        self.window_inference += inference;
        if self.stats.cycles % STATS_EVERY == 0 {
            let elapsed = self.window_start.elapsed().as_secs_f64();
            debug!(
                "📊 {} cycles | {:.1} cycles/s | avg inference {:.1}ms | {} with fire",
                self.stats.cycles,
                STATS_EVERY as f64 / elapsed.max(1e-6),
                self.window_inference.as_secs_f64() * 1000.0 / STATS_EVERY as f64,
                self.stats.positives
            );
            self.window_start = Instant::now();
            self.window_inference = Duration::ZERO;
        }

        Ok(Cycle::Rendered(CycleReport {
            detections,
            alert,
            inference,
        }))
    }

    /// Writes the event log to `path`. Nothing is written when the log is disabled.
    pub fn export(&self, path: &Path) -> Result<()> {
        match &self.event_log {
            Some(log) => log.export(path),
            None => {
                warn!("event log disabled, nothing exported");
                Ok(())
            }
        }
    }

    /// Export errors are reported, never propagated.
    pub fn export_or_report(&self, path: &Path) -> Option<FireError> {
        match self.export(path) {
            Ok(()) => None,
            Err(e) => {
                error!("❌ {}", crate::error::report(&e));
                Some(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::frame::Frame;
    use crate::input::Capture;

    struct OneFrame;

    struct OneFrameCapture(bool);

    impl Capture for OneFrameCapture {
        fn read(&mut self) -> Option<Frame> {
            std::mem::take(&mut self.0).then(|| Frame::filled(8, 8, [0, 0, 0]))
        }
        fn close(&mut self) {}
    }

    impl FrameSource for OneFrame {
        type Capture = OneFrameCapture;
        fn open(&mut self) -> Result<OneFrameCapture> {
            Ok(OneFrameCapture(true))
        }
        fn describe(&self) -> String {
            "one-frame".into()
        }
    }

    struct Always(usize);

    impl Detector for Always {
        fn detect(&mut self, _frame: &Frame) -> Result<DetectionBatch> {
            Ok(vec![Detection::new(1.0, 1.0, 4.0, 4.0, 0.9, 0); self.0])
        }
    }

    struct NullSink;

    impl DisplaySink for NullSink {
        fn show(&mut self, _frame: &Frame) {}
    }

    #[test]
    fn idle_session_does_nothing() {
        let mut session = Session::new(OneFrame, Always(1));
        assert_eq!(session.tick(&mut NullSink).unwrap(), Cycle::Idle);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_is_idempotent_and_stop_returns_to_idle() {
        let now = Instant::now();
        let mut session = Session::new(OneFrame, Always(0));
        session.start(now).unwrap();
        session.start(now).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.ticker().is_armed());
        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.ticker().is_armed());
    }

    #[test]
    fn skipped_cycle_keeps_the_session_active() {
        let mut session = Session::new(OneFrame, Always(2));
        session.start(Instant::now()).unwrap();
        assert!(matches!(session.tick(&mut NullSink).unwrap(), Cycle::Rendered(_)));
        assert_eq!(session.tick(&mut NullSink).unwrap(), Cycle::Skipped);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.stats().cycles, 1);
        assert_eq!(session.stats().positives, 1);
    }

    #[test]
    fn poll_waits_for_the_timer() {
        let t0 = Instant::now();
        let mut session = Session::new(OneFrame, Always(0)).with_tick(Duration::from_millis(30));
        session.start(t0).unwrap();
        assert_eq!(session.poll(t0, &mut NullSink).unwrap(), Cycle::Idle);
        assert!(matches!(
            session.poll(t0 + Duration::from_millis(30), &mut NullSink).unwrap(),
            Cycle::Rendered(_)
        ));
    }

    #[test]
    fn alerts_only_with_event_log() {
        let mut plain = Session::new(OneFrame, Always(1));
        plain.start(Instant::now()).unwrap();
        let Cycle::Rendered(report) = plain.tick(&mut NullSink).unwrap() else {
            panic!("expected a rendered cycle");
        };
        assert_eq!(report.alert, None);
        assert!(plain.event_log().is_none());

        let mut logged = Session::new(OneFrame, Always(1)).with_event_log();
        logged.start(Instant::now()).unwrap();
        let Cycle::Rendered(report) = logged.tick(&mut NullSink).unwrap() else {
            panic!("expected a rendered cycle");
        };
        assert!(report.alert.unwrap().to_string().contains("Fire detected"));
        assert_eq!(logged.event_log().map(EventLog::len), Some(1));
    }
}
