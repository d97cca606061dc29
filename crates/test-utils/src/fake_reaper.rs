use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tickd::engine::{ExitState, Reaped, Reaper};
use tickd::errors::Result;

/// A scripted reaper: returns queued exits one by one, then `None`.
///
/// Clones share the queue, so a test can keep a handle after moving the
/// reaper into a runtime.
#[derive(Debug, Clone, Default)]
pub struct FakeReaper {
    queue: Arc<Mutex<VecDeque<Reaped>>>,
}

impl FakeReaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reaped: Reaped) {
        self.queue.lock().unwrap().push_back(reaped);
    }

    /// Queue a clean exit of `pid`.
    pub fn exit(&self, pid: u32) {
        self.push(Reaped {
            pid,
            state: ExitState::Exited(0),
        });
    }

    pub fn exit_all(&self, pids: impl IntoIterator<Item = u32>) {
        for pid in pids {
            self.exit(pid);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl Reaper for FakeReaper {
    fn try_reap(&mut self) -> Result<Option<Reaped>> {
        Ok(self.queue.lock().unwrap().pop_front())
    }
}
