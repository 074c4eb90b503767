use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Request state shared between the connection and one dispatch.
///
/// Written by the connection's message loop and read by the in-flight
/// dispatch at its checkpoints.
#[derive(Debug, Default)]
pub struct Session {
    cancelled: AtomicBool,
    in_flight: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request: clears the cancellation flag and marks the session busy.
    /// Returns `false` without touching the flag if a request is already running.
    pub fn begin_request(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.cancelled.store(false, Ordering::Release);
        true
    }

    pub fn finish_request(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Connection-level holder of the most recent request's session.
///
/// Each accepted prompt gets a fresh [`Session`], so a cancelled dispatch
/// keeps observing its own flag while a newer request runs unaffected.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Mutex<Arc<Session>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a session for a new request.
    ///
    /// Supersedes a running request that was already cancelled. Returns
    /// `None` while the current request is running and not cancelled.
    pub fn begin_request(&self) -> Option<Arc<Session>> {
        let mut current = self.current.lock();
        if current.is_in_flight() && !current.is_cancelled() {
            return None;
        }
        let next = Arc::new(Session::new());
        let _ = next.begin_request();
        *current = Arc::clone(&next);
        Some(next)
    }

    /// Cancel the most recent request.
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }

    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.current.lock())
    }

    pub fn is_in_flight(&self) -> bool {
        self.current.lock().is_in_flight()
    }
}
