/// Execution roles a thread can play during a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadRole {
	/// Holds exclusive resources and drains the action queue each tick.
	Owner,
	/// Runs the bootstrap stage sequence; free to block.
	Worker,
}

impl ThreadRole {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Owner => "owner",
			Self::Worker => "worker",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roles_log_as_distinct_labels() {
		assert_eq!(ThreadRole::Owner.as_str(), "owner");
		assert_eq!(ThreadRole::Worker.as_str(), "worker");
	}
}
