use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// One-shot readiness flag with a blocking wait.
///
/// Goes from not ready to ready once; further notifications are no-ops.
#[derive(Default)]
pub struct ReadySignal {
    ready: Mutex<bool>,
    cond: Condvar,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut ready = self.ready.lock();
        if !*ready {
            *ready = true;
            self.cond.notify_all();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    pub fn wait(&self) {
        let mut ready = self.ready.lock();
        while !*ready {
            self.cond.wait(&mut ready);
        }
    }

    /// Wait at most `timeout`, returning whether the signal fired
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.lock();
        if !*ready {
            self.cond.wait_while_for(&mut ready, |ready| !*ready, timeout);
        }
        *ready
    }
}
