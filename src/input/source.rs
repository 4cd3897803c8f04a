// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame source seam.
//!
//! A [`FrameSource`] opens a device and hands out a [`Capture`]. The session keeps the
//! capture inside a [`DeviceGuard`] so the device is released on every exit path:
//! normal stop, early return, error, or unwinding out of a detection call.

use crate::error::Result;
use crate::frame::Frame;

/// An open device.
pub trait Capture {
    /// Next frame, or `None` on end-of-stream or a transient read failure. The two are
    /// not distinguished.
    fn read(&mut self) -> Option<Frame>;

    /// Releases the device. Must be idempotent.
    fn close(&mut self);
}

/// Something that can open a [`Capture`].
pub trait FrameSource {
    type Capture: Capture;

    /// Fails with `FireError::DeviceUnavailable` when the device cannot be opened.
    fn open(&mut self) -> Result<Self::Capture>;

    /// Human-readable device name for logs and status text.
    fn describe(&self) -> String;
}

/// Scoped ownership of an open capture: closes it when dropped.
pub struct DeviceGuard<C: Capture> {
    capture: C,
}

impl<C: Capture> DeviceGuard<C> {
    pub fn new(capture: C) -> Self {
        Self { capture }
    }

    pub fn read(&mut self) -> Option<Frame> {
        self.capture.read()
    }
}

impl<C: Capture> Drop for DeviceGuard<C> {
    fn drop(&mut self) {
        self.capture.close();
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    type Capture = S::Capture;

    fn open(&mut self) -> Result<Self::Capture> {
        (**self).open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<C: Capture + ?Sized> Capture for Box<C> {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl Capture for Counting {
        fn read(&mut self) -> Option<Frame> {
            None
        }
        fn close(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = DeviceGuard::new(Counting(closes.clone()));
            assert!(guard.read().is_none());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_closes_while_unwinding() {
        let closes = Arc::new(AtomicUsize::new(0));
        let c = closes.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = DeviceGuard::new(Counting(c));
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
