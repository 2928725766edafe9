use std::collections::BTreeSet;

use crate::StageError;

/// Which persisted session versions this program accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
	current: String,
	compatible: BTreeSet<String>,
}

impl VersionPolicy {
	pub fn new<I, S>(current: impl Into<String>, compatible: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			current: current.into(),
			compatible: compatible.into_iter().map(Into::into).collect(),
		}
	}

	pub fn current(&self) -> &str {
		&self.current
	}

	pub fn accepts(&self, version: &str) -> bool {
		version == self.current || self.compatible.contains(version)
	}

	/// Compatible versions, sorted and comma separated.
	pub fn compatible_list(&self) -> String {
		self.compatible.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
	}

	/// The version gate.
	pub fn check(&self, version: &str) -> Result<(), StageError> {
		if self.accepts(version) {
			return Ok(());
		}
		Err(StageError::VersionIncompatible {
			found: version.to_owned(),
			compatible: self.compatible_list(),
		})
	}
}
