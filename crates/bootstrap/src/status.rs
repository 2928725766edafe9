/// Lifecycle of one bootstrap run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BootstrapStatus {
	#[default]
	Pending,
	Loading,
	Success,
	Failure,
}

impl BootstrapStatus {
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Success | Self::Failure)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Loading => "loading",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

impl std::fmt::Display for BootstrapStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Value carried by the run's status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
	pub status: BootstrapStatus,
	pub message: String,
}

impl Progress {
	pub fn new(status: BootstrapStatus, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
		}
	}
}

/// What [`BootstrapHandle::poll`](crate::BootstrapHandle::poll) returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
	pub status: BootstrapStatus,
	pub message: String,
	/// Increases with every publication of the run.
	pub sequence: u64,
}
