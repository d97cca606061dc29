// src/engine/tracker.rs

//! Process Tracker: which live child pids belong to which worker.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::types::WorkerId;

/// Everything a child wrote to its stdout, or the error that ended the read.
pub type ResultBytes = io::Result<Vec<u8>>;

/// Receiving end of a child's drained stdout.
///
/// The bytes arrive once every holder of the pipe has closed it. That can be
/// well after the child itself was reaped, when a grandchild inherited the
/// pipe, so the slot is only ever polled.
#[derive(Debug)]
pub struct ResultSlot(Receiver<ResultBytes>);

/// What a poll of a [`ResultSlot`] found.
#[derive(Debug)]
pub enum SlotPoll {
    Ready(ResultBytes),
    /// The pipe is still open somewhere.
    Pending,
    /// The draining side went away without delivering anything.
    Lost,
}

impl ResultSlot {
    pub fn channel() -> (Sender<ResultBytes>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self(rx))
    }

    /// A slot that already holds `bytes`.
    pub fn ready(bytes: Vec<u8>) -> Self {
        let (tx, slot) = Self::channel();
        // The receiver is alive, so the send cannot fail.
        let _ = tx.send(Ok(bytes));
        slot
    }

    pub fn poll(&self) -> SlotPoll {
        match self.0.try_recv() {
            Ok(bytes) => SlotPoll::Ready(bytes),
            Err(TryRecvError::Empty) => SlotPoll::Pending,
            Err(TryRecvError::Disconnected) => SlotPoll::Lost,
        }
    }
}

#[derive(Debug)]
struct TrackedChild {
    worker: WorkerId,
    result: Option<ResultSlot>,
}

/// A child removed from tracking, with its result slot if it had one.
#[derive(Debug)]
pub struct ReleasedChild {
    pub worker: WorkerId,
    pub result: Option<ResultSlot>,
}

/// Output of a reaped child that was still being drained at reap time.
#[derive(Debug)]
struct AwaitedResult {
    worker: WorkerId,
    pid: u32,
    slot: ResultSlot,
}

/// An awaited result that has settled. `bytes` is `None` when the drain was
/// lost.
#[derive(Debug)]
pub struct SettledResult {
    pub worker: WorkerId,
    pub pid: u32,
    pub bytes: Option<ResultBytes>,
}

#[derive(Default)]
pub struct ProcessTracker {
    live: HashMap<WorkerId, BTreeSet<u32>>,
    children: HashMap<u32, TrackedChild>,
    awaited: Vec<AwaitedResult>,
}

impl fmt::Debug for ProcessTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessTracker")
            .field("live", &self.live)
            .field("awaited", &self.awaited.len())
            .finish_non_exhaustive()
    }
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `pid` as a live child of `worker`.
    pub fn record(&mut self, worker: &str, pid: u32, result: Option<ResultSlot>) {
        self.live.entry(worker.to_string()).or_default().insert(pid);
        self.children.insert(
            pid,
            TrackedChild {
                worker: worker.to_string(),
                result,
            },
        );
    }

    pub fn live_count(&self, worker: &str) -> usize {
        self.live.get(worker).map_or(0, BTreeSet::len)
    }

    pub fn live_pids(&self, worker: &str) -> Vec<u32> {
        self.live
            .get(worker)
            .map(|pids| pids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn total_live(&self) -> usize {
        self.children.len()
    }

    /// Stop tracking `pid`. Unknown pids (already released, or never ours)
    /// return `None`.
    pub fn release(&mut self, pid: u32) -> Option<ReleasedChild> {
        let child = self.children.remove(&pid)?;
        if let Some(pids) = self.live.get_mut(&child.worker) {
            pids.remove(&pid);
            if pids.is_empty() {
                self.live.remove(&child.worker);
            }
        }
        Some(ReleasedChild {
            worker: child.worker,
            result: child.result,
        })
    }

    /// Keep polling the output of an already reaped child. It no longer
    /// counts as live.
    pub fn await_result(&mut self, worker: WorkerId, pid: u32, slot: ResultSlot) {
        self.awaited.push(AwaitedResult { worker, pid, slot });
    }

    pub fn awaited_results(&self) -> usize {
        self.awaited.len()
    }

    /// Poll every awaited result once and hand back the ones that settled,
    /// in the order their children were reaped.
    pub fn take_settled(&mut self) -> Vec<SettledResult> {
        let mut settled = Vec::new();
        self.awaited.retain(|awaited| {
            let bytes = match awaited.slot.poll() {
                SlotPoll::Pending => return true,
                SlotPoll::Ready(bytes) => Some(bytes),
                SlotPoll::Lost => None,
            };
            settled.push(SettledResult {
                worker: awaited.worker.clone(),
                pid: awaited.pid,
                bytes,
            });
            false
        });
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_removes_pid_from_its_worker_only() {
        let mut tracker = ProcessTracker::new();
        tracker.record("a", 10, None);
        tracker.record("a", 11, None);
        tracker.record("b", 20, None);

        let released = tracker.release(11).unwrap();
        assert_eq!(released.worker, "a");
        assert_eq!(tracker.live_pids("a"), vec![10]);
        assert_eq!(tracker.live_count("b"), 1);
        assert_eq!(tracker.total_live(), 2);
    }

    #[test]
    fn releasing_unknown_pid_is_a_no_op() {
        let mut tracker = ProcessTracker::new();
        tracker.record("a", 10, None);
        assert!(tracker.release(99).is_none());
        assert!(tracker.release(10).is_some());
        assert!(tracker.release(10).is_none());
        assert_eq!(tracker.live_count("a"), 0);
    }

    #[test]
    fn awaited_results_settle_once_their_drain_delivers() {
        let mut tracker = ProcessTracker::new();
        let (open_tx, open) = ResultSlot::channel();
        let (dropped_tx, dropped) = ResultSlot::channel();
        drop(dropped_tx);
        tracker.await_result("a".into(), 10, open);
        tracker.await_result("b".into(), 20, dropped);

        let first = tracker.take_settled();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].worker, "b");
        assert!(first[0].bytes.is_none());
        assert_eq!(tracker.awaited_results(), 1);

        open_tx.send(Ok(b"{}".to_vec())).unwrap();
        let second = tracker.take_settled();
        assert_eq!(second[0].pid, 10);
        assert_eq!(second[0].bytes.as_ref().unwrap().as_ref().unwrap(), b"{}");
        assert_eq!(tracker.awaited_results(), 0);
    }
}
