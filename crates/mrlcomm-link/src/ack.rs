use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// How long a sender waits for the device's acknowledgement.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Outcome of waiting for an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckWait {
    /// Acknowledgements are off; nothing was waited for.
    Disabled,
    /// The device acknowledged within the timeout.
    Acked,
    /// No acknowledgement arrived; the slot was released anyway.
    TimedOut,
    /// The controller was cancelled while waiting.
    Cancelled,
}

#[derive(Debug, Default)]
struct AckState {
    enabled: bool,
    /// Method id of the single in-flight unacknowledged message.
    pending: Option<u8>,
    cancelled: bool,
}

/// Best-effort flow control: at most one outbound message may be awaiting
/// acknowledgement at a time.
///
/// This is delivery *confidence*, not guaranteed delivery: a timeout
/// releases the slot, signals the caller once, and nobody retransmits.
/// Every wait is time-bounded and unblocked promptly by [`cancel`].
///
/// [`cancel`]: AckController::cancel
#[derive(Debug)]
pub struct AckController {
    state: Mutex<AckState>,
    cond: Condvar,
    timeout: Duration,
}

impl AckController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(AckState::default()),
            cond: Condvar::new(),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AckState> {
        self.state.lock().expect("ack state lock poisoned")
    }

    /// Turn the protocol on or off. Turning it off releases any in-flight
    /// slot so nobody waits for an ack that will never be checked.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        state.enabled = enabled;
        if !enabled {
            state.pending = None;
            self.cond.notify_all();
        }
        debug!(enabled, "acknowledgement protocol toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Claim the outbound slot before transmitting.
    ///
    /// Blocks while another message is in flight, bounded at twice the ack
    /// timeout (the in-flight waiter frees the slot after one). Returns
    /// false if the controller was cancelled.
    pub fn begin_send(&self, method: u8) -> bool {
        let mut state = self.lock();
        if !state.enabled {
            return !state.cancelled;
        }

        let deadline = Instant::now() + self.timeout * 2;
        while state.pending.is_some() && !state.cancelled {
            let now = Instant::now();
            if now >= deadline {
                warn!(stale = ?state.pending, "outbound slot never cleared, taking it over");
                break;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .expect("ack state lock poisoned");
            state = guard;
        }

        if state.cancelled {
            return false;
        }
        state.pending = Some(method);
        true
    }

    /// Wait for the in-flight message to be acknowledged.
    ///
    /// On timeout the slot is released so later sends are not blocked by a
    /// message the device never confirmed.
    pub fn wait(&self, method: u8) -> AckWait {
        let mut state = self.lock();
        if !state.enabled {
            return AckWait::Disabled;
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if state.cancelled {
                state.pending = None;
                self.cond.notify_all();
                return AckWait::Cancelled;
            }
            if state.pending != Some(method) {
                return AckWait::Acked;
            }

            let now = Instant::now();
            if now >= deadline {
                state.pending = None;
                self.cond.notify_all();
                return AckWait::TimedOut;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .expect("ack state lock poisoned");
            state = guard;
        }
    }

    /// Record an acknowledgement observed on the inbound path.
    pub fn acknowledge(&self, method: u8) {
        let mut state = self.lock();
        if let Some(pending) = state.pending {
            if pending != method {
                warn!(pending, acked = method, "acknowledgement does not match in-flight method");
            }
        }
        state.pending = None;
        self.cond.notify_all();
    }

    /// Release a claimed slot after a failed transmit.
    pub fn abort_send(&self) {
        let mut state = self.lock();
        state.pending = None;
        self.cond.notify_all();
    }

    /// Unblock every waiter and refuse further sends until [`reset`].
    ///
    /// [`reset`]: AckController::reset
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        state.pending = None;
        self.cond.notify_all();
    }

    /// Fresh-connection state: no pending message, not cancelled. The
    /// enabled flag is a host setting and survives.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.pending = None;
        state.cancelled = false;
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn disabled_controller_never_blocks() {
        let ack = AckController::new(SHORT);
        let started = Instant::now();
        assert!(ack.begin_send(10));
        assert_eq!(ack.wait(10), AckWait::Disabled);
        assert!(started.elapsed() < SHORT);
    }

    #[test]
    fn timeout_releases_the_slot() {
        let ack = AckController::new(SHORT);
        ack.set_enabled(true);

        assert!(ack.begin_send(10));
        let started = Instant::now();
        assert_eq!(ack.wait(10), AckWait::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed >= SHORT, "returned early: {elapsed:?}");
        assert!(elapsed < SHORT * 4, "overshot: {elapsed:?}");

        // The slot is free again: the next claim is immediate.
        let started = Instant::now();
        assert!(ack.begin_send(11));
        assert!(started.elapsed() < SHORT);
    }

    #[test]
    fn acknowledge_unblocks_the_waiter() {
        let ack = Arc::new(AckController::new(Duration::from_secs(5)));
        ack.set_enabled(true);
        assert!(ack.begin_send(10));

        let acker = {
            let ack = Arc::clone(&ack);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                ack.acknowledge(10);
            })
        };

        let started = Instant::now();
        assert_eq!(ack.wait(10), AckWait::Acked);
        assert!(started.elapsed() < Duration::from_secs(1));
        acker.join().unwrap();
    }

    #[test]
    fn mismatched_ack_still_clears_pending() {
        let ack = AckController::new(SHORT);
        ack.set_enabled(true);
        assert!(ack.begin_send(10));
        ack.acknowledge(42);
        assert_eq!(ack.wait(10), AckWait::Acked);
    }

    #[test]
    fn cancel_unblocks_promptly_and_clears_pending() {
        let ack = Arc::new(AckController::new(Duration::from_secs(10)));
        ack.set_enabled(true);
        assert!(ack.begin_send(10));

        let canceller = {
            let ack = Arc::clone(&ack);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                ack.cancel();
            })
        };

        let started = Instant::now();
        assert_eq!(ack.wait(10), AckWait::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
        canceller.join().unwrap();

        // Cancelled controllers refuse new sends until reset.
        assert!(!ack.begin_send(11));
        ack.reset();
        assert!(ack.begin_send(11));
    }

    #[test]
    fn second_sender_waits_for_the_slot() {
        let ack = Arc::new(AckController::new(Duration::from_secs(5)));
        ack.set_enabled(true);
        assert!(ack.begin_send(10));

        let second = {
            let ack = Arc::clone(&ack);
            thread::spawn(move || {
                let started = Instant::now();
                assert!(ack.begin_send(11));
                started.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(30));
        ack.acknowledge(10);
        let waited = second.join().unwrap();
        assert!(waited >= Duration::from_millis(20), "claimed too early: {waited:?}");
    }

    #[test]
    fn disabling_frees_a_stuck_slot() {
        let ack = AckController::new(SHORT);
        ack.set_enabled(true);
        assert!(ack.begin_send(10));
        ack.set_enabled(false);
        assert_eq!(ack.wait(10), AckWait::Disabled);
        assert!(ack.begin_send(11));
    }
}
