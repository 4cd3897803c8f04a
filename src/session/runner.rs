// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::info;

use super::{Clock, Session};
use crate::detection::Detector;
use crate::display::DisplaySink;
use crate::error::Result;
use crate::input::FrameSource;

/// Upper bound on a single sleep so the stop flag is noticed promptly.
const MAX_NAP: Duration = Duration::from_millis(50);

/// Headless driver: starts the session and runs cycles on the ticker until `stop` is
/// set. The session is stopped (device released) on every return path.
pub fn run_blocking<S, D, C, K>(
    session: &mut Session<S, D, C>,
    sink: &mut K,
    stop: &AtomicBool,
) -> Result<()>
where
    S: FrameSource,
    D: Detector,
    C: Clock,
    K: DisplaySink,
{
    session.start(Instant::now())?;

    let result = loop {
        if stop.load(Ordering::Relaxed) {
            info!("🛑 stop requested");
            break Ok(());
        }
        let now = Instant::now();
        if let Err(e) = session.poll(now, sink) {
            break Err(e);
        }
        let nap = session
            .ticker()
            .until_next(Instant::now())
            .unwrap_or(MAX_NAP)
            .min(MAX_NAP);
        if !nap.is_zero() {
            std::thread::sleep(nap);
        }
    };

    session.stop();
    result
}
