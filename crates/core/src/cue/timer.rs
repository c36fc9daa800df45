use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::cue::CueId;
use super::scheduler::FadeDirection;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Work carried by a delayed action. Generations are checked against the cue when the timer
/// fires, so a timer armed for an earlier run of a cue never acts on a later one.
#[derive(Clone, Debug, PartialEq)]
pub enum TimerAction {
    PreWaitElapsed { cue: CueId, generation: u64 },
    PostWaitElapsed { cue: CueId, generation: u64 },
    CommandSettled { cue: CueId, generation: u64 },
    FadeStep {
        cue: CueId,
        generation: u64,
        direction: FadeDirection,
    },
    SlideshowTick { generation: u64 },
}

/// One-shot delayed actions on a virtual clock.
///
/// The clock only moves when the owner calls [`TimerQueue::pop_due`] or
/// [`TimerQueue::advance_to`]; while a timer is being dispatched the clock reads that timer's
/// deadline, so a re-armed timer is scheduled relative to when it was due rather than when it
/// was noticed.
#[derive(Debug)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), TimerAction>,
    deadlines: HashMap<TimerId, Duration>,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, action: TimerAction) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let deadline = self.now + delay;
        self.queue.insert((deadline, id.0), action);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending timer. Cancelling twice, or after it fired, is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn remaining(&self, id: TimerId) -> Option<Duration> {
        self.deadlines
            .get(&id)
            .map(|deadline| deadline.saturating_sub(self.now))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|((deadline, _), _)| *deadline)
    }

    /// Remove and return the earliest timer due at or before `target`.
    pub fn pop_due(&mut self, target: Duration) -> Option<(TimerId, TimerAction)> {
        let (&(deadline, raw), _) = self.queue.first_key_value()?;
        if deadline > target {
            return None;
        }

        let action = self.queue.remove(&(deadline, raw))?;
        let id = TimerId(raw);
        self.deadlines.remove(&id);
        if deadline > self.now {
            self.now = deadline;
        }
        Some((id, action))
    }

    /// Move the clock forward. The clock never runs backwards.
    pub fn advance_to(&mut self, target: Duration) {
        if target > self.now {
            self.now = target;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
