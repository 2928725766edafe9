use std::sync::Arc;
use std::thread::JoinHandle;

use delve_content::ContentRegistry;
use delve_worker::{ActionSender, ReadyWait, RunClock, RunToken, StatusReader, ThreadRole, spawn_named_thread, status_channel};
use parking_lot::Mutex;

use crate::exclusive::StageLibrary;
use crate::generate::GenerationSettings;
use crate::persist::SessionLocator;
use crate::pipeline::{Outcome, Pipeline, ResultSlot, Session};
use crate::producer::{Branch, GenerateProducer, LoadProducer, SessionProducer};
use crate::status::{BootstrapStatus, Progress, ProgressReport};
use crate::{BootstrapConfig, BootstrapError, CapturedError, ErrorKind, VersionPolicy};

/// Input of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapContext {
	/// Load the persisted session at this locator.
	Existing(SessionLocator),
	/// Generate a fresh session.
	Fresh,
}

impl BootstrapContext {
	pub fn from_option(locator: Option<SessionLocator>) -> Self {
		locator.map_or(Self::Fresh, Self::Existing)
	}

	pub fn branch(&self) -> Branch {
		match self {
			Self::Existing(_) => Branch::Load,
			Self::Fresh => Branch::Generate,
		}
	}
}

struct ActiveRun {
	run: u64,
	status: StatusReader<Progress>,
}

/// Starts bootstrap runs and enforces one active run at a time.
///
/// The controller lives with the embedding program. Exclusive stages reach
/// the owner through `actions`; the owner must keep draining the matching
/// [`ActionQueue`](delve_worker::ActionQueue) while a run is loading.
pub struct BootstrapController<R> {
	config: BootstrapConfig,
	versions: VersionPolicy,
	library: StageLibrary<R>,
	registry: ContentRegistry,
	actions: ActionSender<R>,
	ready: ReadyWait,
	clock: RunClock,
	active: Mutex<Option<ActiveRun>>,
}

impl<R: 'static> BootstrapController<R> {
	pub fn new(config: BootstrapConfig, library: StageLibrary<R>, registry: ContentRegistry, actions: ActionSender<R>, ready: ReadyWait) -> Self {
		let versions = config.versions();
		Self {
			config,
			versions,
			library,
			registry,
			actions,
			ready,
			clock: RunClock::new(),
			active: Mutex::new(None),
		}
	}

	pub fn config(&self) -> &BootstrapConfig {
		&self.config
	}

	pub fn registry(&self) -> &ContentRegistry {
		&self.registry
	}

	/// Status of the most recent run, or `Pending` before the first one.
	pub fn status(&self) -> BootstrapStatus {
		self.active.lock().as_ref().map_or(BootstrapStatus::Pending, |a| a.status.load().value.status)
	}

	/// Starts a run on a new worker thread and returns without waiting for it.
	///
	/// Fails without side effects while a previous run is still loading. Each
	/// started run gets its own status cell and result slot, so finished runs
	/// stay terminal and a retry is simply another `start`.
	pub fn start(&self, context: BootstrapContext, settings: GenerationSettings) -> Result<BootstrapHandle, BootstrapError> {
		let mut active = self.active.lock();
		if let Some(current) = active.as_ref()
			&& !current.status.load().value.status.is_terminal()
		{
			return Err(BootstrapError::AlreadyLoading { run: current.run });
		}

		let run = self.clock.next();
		let token = RunToken::new(run);
		let (mut status, reader) = status_channel(Progress::new(BootstrapStatus::Pending, ""));
		status.publish(Progress::new(BootstrapStatus::Loading, "Starting ..."));

		let producer: Box<dyn SessionProducer> = match context {
			BootstrapContext::Existing(locator) => Box::new(LoadProducer::new(Arc::clone(&self.library.reader), locator, self.versions.clone())),
			BootstrapContext::Fresh => Box::new(GenerateProducer::new(Arc::clone(&self.library.generator), settings)),
		};

		let slot = Arc::new(ResultSlot::default());
		let pipeline = Pipeline {
			token: token.clone(),
			producer,
			library: self.library.clone(),
			registry: self.registry.clone(),
			actions: self.actions.clone(),
			ready: self.ready.clone(),
			config: self.config.clone(),
			status,
			slot: Arc::clone(&slot),
		};

		let join = spawn_named_thread(ThreadRole::Worker, format!("delve-bootstrap-{run}"), move || pipeline.execute()).map_err(BootstrapError::Spawn)?;

		*active = Some(ActiveRun { run, status: reader.clone() });
		Ok(BootstrapHandle {
			run,
			token,
			status: reader,
			slot,
			join: Some(join),
		})
	}
}

/// Caller's view of one run.
pub struct BootstrapHandle {
	run: u64,
	token: RunToken,
	status: StatusReader<Progress>,
	slot: Arc<ResultSlot>,
	join: Option<JoinHandle<()>>,
}

impl BootstrapHandle {
	pub fn run(&self) -> u64 {
		self.run
	}

	/// Latest published status and message. Never blocks the worker.
	pub fn poll(&self) -> ProgressReport {
		let snapshot = self.status.load();
		ProgressReport {
			status: snapshot.value.status,
			message: snapshot.value.message.clone(),
			sequence: snapshot.sequence,
		}
	}

	pub fn status(&self) -> BootstrapStatus {
		self.status.load().value.status
	}

	pub fn is_terminal(&self) -> bool {
		self.status().is_terminal()
	}

	/// Requests cooperative cancellation. Takes effect at the next stage
	/// boundary or blocking wait; a run that already finished is unaffected.
	pub fn cancel(&self) {
		tracing::debug!(run = self.run, "bootstrap.cancel");
		self.token.cancel();
	}

	/// Cancellation token of this run, for cancelling from another thread.
	pub fn token(&self) -> RunToken {
		self.token.clone()
	}

	/// Takes the run's outcome.
	///
	/// Returns `None` until the run is terminal, and after the outcome has
	/// been taken once. Polling before terminal is a caller error, not a
	/// failure of the run.
	pub fn take_result(&self) -> Option<Result<Session, CapturedError>> {
		if !self.is_terminal() {
			return None;
		}
		self.slot.take()
	}

	/// Blocks until the worker exits and returns the outcome.
	///
	/// Must not be called on the owner thread while exclusive stages are
	/// pending: the worker would wait for a drain that never happens.
	pub fn wait(mut self) -> Result<Session, CapturedError> {
		if let Some(join) = self.join.take()
			&& join.join().is_err()
		{
			return Err(CapturedError::new(ErrorKind::UnhandledFault, "bootstrap worker thread panicked"));
		}
		self.slot.take().unwrap_or_else(already_taken)
	}
}

fn already_taken() -> Outcome {
	Err(CapturedError::new(ErrorKind::UnhandledFault, "bootstrap result was already taken"))
}
