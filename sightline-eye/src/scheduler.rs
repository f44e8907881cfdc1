//! Single-slot frame admission

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Another frame is in flight
    Busy,
    /// Older than the last admitted frame
    Stale,
    /// The producer has not drained earlier answers
    Backlog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Dropped(DropReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Admission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub admitted: u64,
    pub dropped_busy: u64,
    pub dropped_stale: u64,
    #[serde(default)]
    pub dropped_backlog: u64,
    pub completed: u64,
}

impl SchedulerStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_busy + self.dropped_stale + self.dropped_backlog
    }
}

/// Admits at most one frame at a time and never goes back in time.
///
/// There is no queue: a frame arriving while another is in flight is dropped,
/// which keeps latency bounded when frames arrive faster than inference.
#[derive(Debug)]
pub struct FrameScheduler {
    state: SchedulerState,
    last_admitted: Option<u64>,
    stats: SchedulerStats,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_admitted: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn submit(&mut self, frame_id: u64) -> Admission {
        if self.state == SchedulerState::Busy {
            self.stats.dropped_busy += 1;
            debug!("Frame {} dropped: inference in flight", frame_id);
            return Admission::Dropped(DropReason::Busy);
        }

        if let Some(last) = self.last_admitted {
            if frame_id < last {
                self.stats.dropped_stale += 1;
                debug!("Frame {} dropped: older than frame {}", frame_id, last);
                return Admission::Dropped(DropReason::Stale);
            }
        }

        self.state = SchedulerState::Busy;
        self.last_admitted = Some(frame_id);
        self.stats.admitted += 1;
        Admission::Admitted
    }

    /// Turn a frame away because its answer has nowhere to go; the slot is untouched
    pub fn shed(&mut self, frame_id: u64) -> Admission {
        self.stats.dropped_backlog += 1;
        debug!("Frame {} dropped: response backlog full", frame_id);
        Admission::Dropped(DropReason::Backlog)
    }

    /// Release the slot, whether the frame succeeded or failed
    pub fn complete(&mut self) {
        if self.state == SchedulerState::Busy {
            self.stats.completed += 1;
        }
        self.state = SchedulerState::Idle;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SchedulerState::Busy
    }

    pub fn last_admitted_frame_id(&self) -> Option<u64> {
        self.last_admitted
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}
