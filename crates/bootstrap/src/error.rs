//! Error taxonomy for bootstrap runs.
//!
//! Stages return [`StageError`]. The pipeline converts the first one it sees
//! into a single [`CapturedError`], which is what callers observe on failure.

use delve_worker::{ReadyError, WaitError};
use thiserror::Error;

use crate::session::GraphViolation;

/// Classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Persisted session version is neither current nor compatible.
	VersionIncompatible,
	/// Component graph failed validation.
	ConsistencyViolation,
	/// The owner never signalled its resource surface.
	EnvironmentNotReady,
	/// The caller cancelled the run.
	Cancelled,
	/// Anything else a stage body raised.
	UnhandledFault,
}

impl ErrorKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::VersionIncompatible => "version_incompatible",
			Self::ConsistencyViolation => "consistency_violation",
			Self::EnvironmentNotReady => "environment_not_ready",
			Self::Cancelled => "cancelled",
			Self::UnhandledFault => "unhandled_fault",
		}
	}
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Terminal error record of a failed run.
///
/// Built in one piece when the run fails; there is no way to observe it half filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
	kind: ErrorKind,
	message: String,
	cause: Option<Box<CapturedError>>,
}

impl CapturedError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			cause: None,
		}
	}

	#[must_use]
	pub fn with_cause(mut self, cause: CapturedError) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	/// Wraps every link of an `anyhow` chain, outermost first, as nested causes.
	pub fn from_chain(kind: ErrorKind, err: &anyhow::Error) -> Self {
		let links: Vec<String> = err.chain().map(ToString::to_string).collect();
		let mut nested: Option<CapturedError> = None;
		for message in links.into_iter().rev() {
			let mut link = CapturedError::new(kind, message);
			link.cause = nested.take().map(Box::new);
			nested = Some(link);
		}
		nested.unwrap_or_else(|| CapturedError::new(kind, err.to_string()))
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn cause(&self) -> Option<&CapturedError> {
		self.cause.as_deref()
	}

	/// Iterates this error and its nested causes, outermost first.
	pub fn chain(&self) -> impl Iterator<Item = &CapturedError> {
		std::iter::successors(Some(self), |e| e.cause())
	}
}

impl std::fmt::Display for CapturedError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.message)
	}
}

impl std::error::Error for CapturedError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
	}
}

/// Typed result of one stage.
#[derive(Debug, Error)]
pub enum StageError {
	#[error("session was saved by version {found}; compatible versions are {compatible}")]
	VersionIncompatible { found: String, compatible: String },

	#[error("component graph is inconsistent: {0}")]
	Consistency(#[from] GraphViolation),

	#[error("environment not ready: {0}")]
	EnvironmentNotReady(#[source] ReadyError),

	#[error("bootstrap cancelled")]
	Cancelled,

	#[error("stage `{stage}` failed")]
	Fault {
		stage: &'static str,
		#[source]
		source: anyhow::Error,
	},
}

impl StageError {
	pub fn fault(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
		Self::Fault {
			stage,
			source: source.into(),
		}
	}

	pub(crate) fn from_ready(err: ReadyError) -> Self {
		match err {
			ReadyError::Cancelled => Self::Cancelled,
			other => Self::EnvironmentNotReady(other),
		}
	}

	pub(crate) fn from_wait(stage: &'static str, err: WaitError) -> Self {
		match err {
			WaitError::Cancelled { .. } => Self::Cancelled,
			other => Self::fault(stage, other),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::VersionIncompatible { .. } => ErrorKind::VersionIncompatible,
			Self::Consistency(_) => ErrorKind::ConsistencyViolation,
			Self::EnvironmentNotReady(_) => ErrorKind::EnvironmentNotReady,
			Self::Cancelled => ErrorKind::Cancelled,
			Self::Fault { .. } => ErrorKind::UnhandledFault,
		}
	}

	/// Converts into the caller-facing record. Faults keep their source chain as nested causes.
	pub fn capture(self) -> CapturedError {
		let kind = self.kind();
		let message = self.to_string();
		match self {
			Self::Fault { source, .. } => CapturedError::new(kind, message).with_cause(CapturedError::from_chain(kind, &source)),
			_ => CapturedError::new(kind, message),
		}
	}
}

/// Synchronous errors from [`BootstrapController::start`](crate::BootstrapController::start).
#[derive(Debug, Error)]
pub enum BootstrapError {
	#[error("bootstrap run {run} is still loading")]
	AlreadyLoading { run: u64 },

	#[error("failed to spawn bootstrap worker thread")]
	Spawn(#[source] std::io::Error),
}
