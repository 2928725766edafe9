use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic run-id clock used to correlate log lines of one bootstrap run.
#[derive(Debug, Default, Clone)]
pub struct RunClock {
	next: Arc<AtomicU64>,
}

impl RunClock {
	/// Creates a clock whose first issued id is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues the next run id.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Run-scoped cancellation token.
#[derive(Debug, Clone)]
pub struct RunToken {
	run: u64,
	cancel: CancellationToken,
}

impl RunToken {
	pub fn new(run: u64) -> Self {
		Self {
			run,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns the run id.
	pub const fn run(&self) -> u64 {
		self.run
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cooperative cancellation of the run.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Borrow of the underlying token for use in `select!` waits.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn run_ids_start_at_one_and_increase() {
		let clock = RunClock::new();
		let shared = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(shared.next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[test]
	fn cancel_is_visible_through_clones() {
		let token = RunToken::new(7);
		let observer = token.clone();
		assert!(!observer.is_cancelled());
		token.cancel();
		assert!(observer.is_cancelled());
		assert!(observer.cancellation().is_cancelled());
		assert_eq!(observer.run(), 7);
	}
}
