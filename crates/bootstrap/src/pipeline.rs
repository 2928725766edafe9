//! Stage sequence of one run, executed on the worker thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use delve_content::{CommitReport, ContentRegistry};
use delve_worker::{ActionSender, ReadyWait, RunToken, StatusWriter, ThreadRole, current_thread_runtime, panic_message};
use parking_lot::Mutex;

use crate::exclusive::{StageLibrary, StageView};
use crate::producer::{Branch, SessionProducer, StageCx};
use crate::session::SessionBuildState;
use crate::status::{BootstrapStatus, Progress};
use crate::{BootstrapConfig, CapturedError, ErrorKind, StageError};

/// A successfully bootstrapped session, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	pub state: SessionBuildState,
	pub branch: Branch,
	/// Wall-clock time from worker start to success.
	pub elapsed: Duration,
	/// Registry generation that made this run's definitions visible.
	pub registry_generation: u64,
}

pub(crate) type Outcome = Result<Session, CapturedError>;

/// Written once by the worker, taken once by the caller.
#[derive(Default)]
pub(crate) struct ResultSlot(Mutex<Option<Outcome>>);

impl ResultSlot {
	fn store(&self, outcome: Outcome) {
		*self.0.lock() = Some(outcome);
	}

	pub(crate) fn take(&self) -> Option<Outcome> {
		self.0.lock().take()
	}
}

pub(crate) struct Pipeline<R> {
	pub(crate) token: RunToken,
	pub(crate) producer: Box<dyn SessionProducer>,
	pub(crate) library: StageLibrary<R>,
	pub(crate) registry: ContentRegistry,
	pub(crate) actions: ActionSender<R>,
	pub(crate) ready: ReadyWait,
	pub(crate) config: BootstrapConfig,
	pub(crate) status: StatusWriter<Progress>,
	pub(crate) slot: Arc<ResultSlot>,
}

impl<R: 'static> Pipeline<R> {
	/// Runs every stage and leaves exactly one outcome in the slot.
	///
	/// The outcome is stored before the terminal status is published, so an
	/// observer that sees Success or Failure can always take the result.
	pub(crate) fn execute(mut self) {
		let run = self.token.run();
		let branch = self.producer.branch();
		let started = Instant::now();
		tracing::info!(run, %branch, "bootstrap.start");

		let outcome = match current_thread_runtime(ThreadRole::Worker) {
			Ok(rt) => match catch_unwind(AssertUnwindSafe(|| rt.block_on(self.stages(branch)))) {
				Ok(result) => result.map_err(StageError::capture),
				Err(payload) => Err(CapturedError::new(ErrorKind::UnhandledFault, "bootstrap worker panicked")
					.with_cause(CapturedError::new(ErrorKind::UnhandledFault, panic_message(payload.as_ref())))),
			},
			Err(err) => Err(StageError::fault("worker runtime", err).capture()),
		};

		match outcome {
			Ok((state, commit)) => {
				let elapsed = started.elapsed();
				tracing::info!(run, %branch, ?elapsed, inserted = commit.inserted, generation = commit.generation, "bootstrap.success");
				self.slot.store(Ok(Session {
					state,
					branch,
					elapsed,
					registry_generation: commit.generation,
				}));
				self.status.publish(Progress::new(BootstrapStatus::Success, "Complete."));
			}
			Err(err) => {
				tracing::error!(run, %branch, kind = %err.kind(), error = %err, "bootstrap.failure");
				let message = err.message().to_owned();
				self.slot.store(Err(err));
				self.status.publish(Progress::new(BootstrapStatus::Failure, message));
			}
		}
	}

	async fn stages(&mut self, branch: Branch) -> Result<(SessionBuildState, CommitReport), StageError> {
		let run = self.token.run();
		let mut scratch = self.registry.scratch();
		let mut cx = StageCx {
			status: &mut self.status,
			token: &self.token,
			scratch: &mut scratch,
		};

		cx.report("Initializing ...");
		self.ready
			.wait(self.config.environment_timeout(), self.token.cancellation())
			.await
			.map_err(StageError::from_ready)?;
		tracing::debug!(run, "bootstrap.environment.ready");

		let mut state = self.producer.produce(&mut cx)?;
		tracing::debug!(run, %branch, components = state.components.len(), factions = state.factions.len(), "bootstrap.produced");

		let view = StageView::new(run, branch, &state);
		for stage in &self.library.exclusive {
			cx.checkpoint()?;
			let name = stage.name();
			cx.report(format!("Creating {name} ..."));

			let body = Arc::clone(stage);
			let stage_view = view.clone();
			let defs = self
				.actions
				.submit(name, move |resources: &mut R| body.run(resources, &stage_view))
				.wait(self.config.action_timeout(), self.token.cancellation())
				.await
				.map_err(|err| StageError::from_wait(name, err))?;

			for def in defs {
				cx.scratch().register(def).map_err(|err| StageError::fault(name, err))?;
			}
			tracing::debug!(run, stage = name, "bootstrap.exclusive.done");
		}

		cx.checkpoint()?;
		cx.report("Finalizing ...");
		state.finalize();

		let staged = scratch.staged_len();
		let commit = self.registry.commit(scratch).map_err(|err| StageError::fault("commit registry", err))?;
		tracing::debug!(run, staged, generation = commit.generation, "bootstrap.registry.commit");
		Ok((state, commit))
	}
}
