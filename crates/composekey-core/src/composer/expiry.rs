// Composekey Expiry Timer
// One background thread that aborts idle compose sequences

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Remaining time below which a firing timer expires the sequence instead
/// of re-arming
pub const REARM_THRESHOLD: Duration = Duration::from_millis(10);

/// What the composer did when the timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Recent activity pushed the deadline out by this much
    Rearmed(Duration),
    /// The sequence was aborted
    Expired,
    /// Not composing, or expiry is disabled
    Ignored,
}

#[derive(Debug, Default)]
struct TimerSlot {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<TimerSlot>,
    wakeup: Condvar,
}

/// Arms and disarms the timer. Locks only the timer slot, so it can be
/// used while the composer is locked.
#[derive(Debug, Clone, Default)]
pub struct ExpiryHandle {
    shared: Arc<Shared>,
}

impl ExpiryHandle {
    pub fn arm_at(&self, deadline: Instant) {
        self.shared.slot.lock().deadline = Some(deadline);
        self.shared.wakeup.notify_one();
    }

    pub fn arm(&self, delay: Duration) {
        self.arm_at(Instant::now() + delay);
    }

    pub fn disarm(&self) {
        let mut slot = self.shared.slot.lock();
        if slot.deadline.take().is_some() {
            self.shared.wakeup.notify_one();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.shared.slot.lock().deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.shared.slot.lock().deadline
    }
}

/// Owner of the timer thread; stops and joins it on drop
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ExpiryHandle {
        ExpiryHandle {
            shared: self.shared.clone(),
        }
    }

    /// Spawn the timer thread. `fire` runs with the slot unlocked and the
    /// deadline already cleared, so it may arm again.
    pub fn start<F>(&mut self, fire: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        if self.thread.is_some() {
            return;
        }
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name("composekey-expiry".to_string())
            .spawn(move || run(&shared, fire));
        match spawned {
            Ok(thread) => self.thread = Some(thread),
            Err(e) => log::warn!("Failed to start expiry timer, sequences will not expire: {}", e),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

fn run<F: FnMut(Instant)>(shared: &Shared, mut fire: F) {
    let mut slot = shared.slot.lock();
    loop {
        if slot.shutdown {
            return;
        }
        match slot.deadline {
            None => shared.wakeup.wait(&mut slot),
            Some(deadline) => {
                let now = Instant::now();
                if now < deadline {
                    shared.wakeup.wait_until(&mut slot, deadline);
                    continue;
                }
                slot.deadline = None;
                MutexGuard::unlocked(&mut slot, || fire(now));
            }
        }
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.shared.slot.lock().shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Expiry timer thread panicked");
            }
        }
    }
}
