// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Cooperative cancellation for the synchronous worker pool.
//!
//! The worker pool is plain OS threads with no coroutine yield points, so
//! cancellation cannot rely on an async runtime's cancellation token the way
//! the bootstrap crate's control-plane shutdown coordinator does. Instead
//! every blocking wait in the core (task-queue `next()`, buffer-pool
//! `acquire()`, admission submission) polls this token at a bounded
//! granularity of <= 100ms.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The interval at which blocking waits recheck the stop flag.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Inner {
    stopped: AtomicBool,
    signal: (Mutex<()>, Condvar),
}

/// A cloneable handle; cloning does not create a new token, all clones
/// observe the same stop flag.
#[derive(Clone)]
pub struct StopToken {
    inner: Arc<Inner>,
}

impl StopToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Requests a stop and wakes every waiter blocked in `wait_timeout`.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        let (lock, cvar) = &self.inner.signal;
        let _guard = lock.lock();
        cvar.notify_all();
    }

    /// Blocks for up to `STOP_POLL_INTERVAL`, or until `stop()` is called,
    /// whichever comes first. Callers loop this against their own
    /// wait-for-work condition; it never itself decides whether to keep
    /// waiting.
    pub fn wait_one_interval(&self) {
        let (lock, cvar) = &self.inner.signal;
        let mut guard = lock.lock();
        if self.is_stopped() {
            return;
        }
        cvar.wait_for(&mut guard, STOP_POLL_INTERVAL);
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

impl streaming_domain::repositories::StopSignal for StopToken {
    fn is_stopped(&self) -> bool {
        StopToken::is_stopped(self)
    }
}
