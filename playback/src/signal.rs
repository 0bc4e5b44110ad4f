use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/**
    A latching flag that threads can wait on with a deadline.

    Used both for stop requests (observed by workers at their next safe
    point, and able to cut short a pacing sleep) and for exit
    acknowledgments (waited on by the controller with a bounded timeout).
*/
#[derive(Default)]
pub(crate) struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        *self.raised.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    /**
        Block until the signal is raised or `timeout` elapses.

        Returns true if the signal was raised.
    */
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut raised = self.raised.lock();
        while !*raised {
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        *raised
    }
}
