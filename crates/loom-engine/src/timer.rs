use loom_story::ImageData;

/// Work deferred until an image effect has played out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimerAction {
    /// An exit animation finished; drop the image.
    RemoveImage {
        /// Instance that was exiting.
        instance_id: u64,
    },
    /// A sequential replacement may now enter its slot.
    ShowImage {
        /// Image node that requested the image.
        node_id: String,
        /// What to show.
        image: ImageData,
    },
    /// An entrance effect finished; move on to the successor.
    Transition {
        /// Node to enter.
        next_node_id: String,
    },
}

impl TimerAction {
    fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }
}

#[derive(Debug, Clone)]
struct Timer {
    due_ms: i64,
    seq: u64,
    epoch: u64,
    action: TimerAction,
}

/// Pending timers of one engine, ordered by due time then schedule order.
///
/// Every timer carries the epoch it was scheduled in. Starting, restarting,
/// loading, or entering a new chapter bumps the epoch, and timers of an older
/// epoch never fire.
#[derive(Debug, Clone, Default)]
pub(crate) struct TimerQueue {
    timers: Vec<Timer>,
    next_seq: u64,
    epoch: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to fire at `due_ms`.
    pub(crate) fn schedule(&mut self, due_ms: i64, action: TimerAction) {
        self.next_seq += 1;
        self.timers.push(Timer {
            due_ms,
            seq: self.next_seq,
            epoch: self.epoch,
            action,
        });
    }

    /// Remove and return the earliest timer due at `now_ms`.
    pub(crate) fn pop_due(&mut self, now_ms: i64) -> Option<TimerAction> {
        let epoch = self.epoch;
        self.timers.retain(|t| t.epoch == epoch);
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index).action)
    }

    /// When the earliest live timer is due.
    pub(crate) fn next_due(&self) -> Option<i64> {
        self.timers
            .iter()
            .filter(|t| t.epoch == self.epoch)
            .map(|t| t.due_ms)
            .min()
    }

    /// Whether a deferred node transition is waiting.
    pub(crate) fn has_pending_transition(&self) -> bool {
        self.timers
            .iter()
            .any(|t| t.epoch == self.epoch && t.action.is_transition())
    }

    /// Live timers in firing order.
    pub(crate) fn pending(&self) -> Vec<&TimerAction> {
        let mut live: Vec<&Timer> = self
            .timers
            .iter()
            .filter(|t| t.epoch == self.epoch)
            .collect();
        live.sort_by_key(|t| (t.due_ms, t.seq));
        live.into_iter().map(|t| &t.action).collect()
    }

    /// Drop live timers whose action matches `pred`. Returns how many went.
    pub(crate) fn cancel_where(&mut self, pred: impl Fn(&TimerAction) -> bool) -> usize {
        let epoch = self.epoch;
        let before = self.timers.len();
        self.timers.retain(|t| t.epoch != epoch || !pred(&t.action));
        before - self.timers.len()
    }

    /// Supersede every pending timer.
    pub(crate) fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.timers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.iter().filter(|t| t.epoch == self.epoch).count()
    }
}
