use std::time::Duration;

/// Upper bound on the work one owner tick spends draining queued actions.
///
/// Limits are checked between actions; a single action always runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainBudget {
	/// Wall-clock time after which no further action is started.
	pub duration: Duration,
	/// Maximum number of actions executed in one drain.
	pub max_completions: usize,
}

impl DrainBudget {
	pub const fn new(duration: Duration, max_completions: usize) -> Self {
		Self { duration, max_completions }
	}
}

impl Default for DrainBudget {
	fn default() -> Self {
		Self {
			duration: Duration::from_millis(4),
			max_completions: 16,
		}
	}
}

/// Outcome of one bounded drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
	/// Actions executed during this drain.
	pub completed: u64,
	/// Actions still queued afterwards.
	pub pending: usize,
	/// True when the drain stopped because a limit was hit rather than because the queue emptied.
	pub budget_exhausted: bool,
}
