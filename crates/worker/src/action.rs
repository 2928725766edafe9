//! Cross-context action queue.
//!
//! Any thread may [`ActionSender::submit`] a closure that needs the owner's
//! exclusive resources `R`. Only the owner holds the [`ActionQueue`], and only
//! it can produce the `&mut R` the closures run against, so exclusive access
//! is enforced by ownership rather than by convention.
//!
//! Actions run in submission order. There is no priority and no cancellation:
//! a submitted action always runs as long as the owner keeps draining.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::ThreadRole;
use crate::budget::{DrainBudget, DrainReport};
use crate::panic::panic_message;

type Job<R> = Box<dyn FnOnce(&mut R) + Send + 'static>;

struct Envelope<R> {
	seq: u64,
	label: String,
	job: Job<R>,
}

/// Failure of an action body on the owner.
#[derive(Debug, Error)]
pub enum ActionError {
	#[error("action `{label}` failed")]
	Failed {
		label: String,
		#[source]
		source: anyhow::Error,
	},
	#[error("action `{label}` panicked: {message}")]
	Panicked { label: String, message: String },
}

/// Why waiting on a [`Completion`] did not yield a value.
#[derive(Debug, Error)]
pub enum WaitError {
	#[error("owner did not complete `{label}` within {after:?}")]
	TimedOut { label: String, after: Duration },
	#[error("wait for `{label}` cancelled")]
	Cancelled { label: String },
	#[error("owner dropped `{label}` without running it")]
	Abandoned { label: String },
	#[error(transparent)]
	Action(#[from] ActionError),
}

/// Submitting half, held by the worker. Cheap to clone.
pub struct ActionSender<R> {
	tx: mpsc::UnboundedSender<Envelope<R>>,
	next_seq: Arc<AtomicU64>,
}

impl<R> Clone for ActionSender<R> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			next_seq: Arc::clone(&self.next_seq),
		}
	}
}

/// Draining half, held by the owner.
pub struct ActionQueue<R> {
	rx: mpsc::UnboundedReceiver<Envelope<R>>,
	executed: u64,
}

/// Token for one submitted action.
#[must_use = "a completion must be awaited to observe the action's outcome"]
pub struct Completion<T> {
	label: String,
	seq: u64,
	rx: oneshot::Receiver<Result<T, ActionError>>,
}

/// Creates a connected sender/queue pair.
pub fn action_channel<R>() -> (ActionSender<R>, ActionQueue<R>) {
	let (tx, rx) = mpsc::unbounded_channel();
	(
		ActionSender {
			tx,
			next_seq: Arc::new(AtomicU64::new(0)),
		},
		ActionQueue { rx, executed: 0 },
	)
}

impl<R> ActionSender<R> {
	/// Queues `action` for the owner and returns its completion token.
	///
	/// If the owner is already gone the action is dropped and the completion
	/// resolves to [`WaitError::Abandoned`].
	pub fn submit<T, F>(&self, label: impl Into<String>, action: F) -> Completion<T>
	where
		F: FnOnce(&mut R) -> anyhow::Result<T> + Send + 'static,
		T: Send + 'static,
	{
		let label = label.into();
		let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
		let (done_tx, done_rx) = oneshot::channel();

		let job_label = label.clone();
		let job: Job<R> = Box::new(move |resources: &mut R| {
			let outcome = match catch_unwind(AssertUnwindSafe(|| action(resources))) {
				Ok(Ok(value)) => Ok(value),
				Ok(Err(source)) => Err(ActionError::Failed { label: job_label, source }),
				Err(payload) => Err(ActionError::Panicked {
					label: job_label,
					message: panic_message(payload.as_ref()),
				}),
			};
			// Receiver may have stopped waiting (timeout or cancel).
			let _ = done_tx.send(outcome);
		});

		tracing::trace!(seq, action = %label, "action.submit");
		if self.tx.send(Envelope { seq, label: label.clone(), job }).is_err() {
			tracing::warn!(seq, action = %label, "action queue closed; owner is gone");
		}

		Completion { label, seq, rx: done_rx }
	}

	/// Returns true once the owner has dropped its queue.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

impl<R> ActionQueue<R> {
	/// Runs queued actions in FIFO order until the queue is empty or `budget` is spent.
	///
	/// A zero `max_completions` skips the tick. Otherwise the first queued
	/// action always runs, even when `duration` is zero, so the queue keeps
	/// moving as long as the owner keeps draining.
	pub fn drain(&mut self, resources: &mut R, budget: DrainBudget) -> DrainReport {
		if budget.max_completions == 0 {
			let pending = self.rx.len();
			return DrainReport {
				pending,
				budget_exhausted: pending > 0,
				..DrainReport::default()
			};
		}

		// `None` when the duration is too large to represent: no deadline.
		let deadline = Instant::now().checked_add(budget.duration);
		let mut completed = 0u64;
		let mut budget_exhausted = false;

		loop {
			let past_deadline = deadline.is_some_and(|d| Instant::now() >= d);
			if completed as usize >= budget.max_completions || (completed > 0 && past_deadline) {
				budget_exhausted = !self.rx.is_empty();
				break;
			}
			let Ok(envelope) = self.rx.try_recv() else {
				break;
			};
			tracing::trace!(role = ThreadRole::Owner.as_str(), seq = envelope.seq, action = %envelope.label, "action.run");
			(envelope.job)(resources);
			completed = completed.wrapping_add(1);
		}

		self.executed = self.executed.wrapping_add(completed);
		DrainReport {
			completed,
			pending: self.rx.len(),
			budget_exhausted,
		}
	}

	/// Number of actions waiting for the next drain.
	pub fn pending(&self) -> usize {
		self.rx.len()
	}

	/// Total actions executed over the queue's lifetime.
	pub fn executed(&self) -> u64 {
		self.executed
	}
}

impl<T> Completion<T> {
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Submission sequence number; FIFO order follows it.
	pub fn seq(&self) -> u64 {
		self.seq
	}

	/// Waits for the owner to run the action.
	pub async fn wait(self, timeout: Option<Duration>, cancel: &CancellationToken) -> Result<T, WaitError> {
		let Completion { label, rx, .. } = self;
		let bounded = async move {
			match timeout {
				Some(limit) => tokio::time::timeout(limit, rx).await.map_err(|_| limit),
				None => Ok(rx.await),
			}
		};

		let received = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(WaitError::Cancelled { label }),
			res = bounded => res,
		};

		match received {
			Ok(Ok(Ok(value))) => Ok(value),
			Ok(Ok(Err(err))) => Err(err.into()),
			Ok(Err(_)) => Err(WaitError::Abandoned { label }),
			Err(after) => Err(WaitError::TimedOut { label, after }),
		}
	}
}
