//! Bootstrap configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use delve_worker::DrainBudget;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::VersionPolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Tunables supplied by the embedding program when it builds a controller.
///
/// Millisecond fields use `0` for "no limit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
	/// Version stamped on sessions saved by this program.
	pub current_version: String,
	/// Older or newer versions whose saves are still accepted.
	pub compatible_versions: BTreeSet<String>,
	/// How long the worker waits for the owner's resource surface.
	pub environment_timeout_ms: u64,
	/// How long the worker waits for one exclusive action to complete.
	pub action_timeout_ms: u64,
	/// Actions the owner runs per drain; `0` for no limit.
	pub drain_max_actions: usize,
	/// Wall-clock budget of one owner drain.
	pub drain_max_ms: u64,
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			current_version: env!("CARGO_PKG_VERSION").to_owned(),
			compatible_versions: BTreeSet::new(),
			environment_timeout_ms: 30_000,
			action_timeout_ms: 60_000,
			drain_max_actions: 16,
			drain_max_ms: 4,
		}
	}
}

impl BootstrapConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	pub fn versions(&self) -> VersionPolicy {
		VersionPolicy::new(self.current_version.clone(), self.compatible_versions.iter().cloned())
	}

	pub fn environment_timeout(&self) -> Option<Duration> {
		millis(self.environment_timeout_ms)
	}

	pub fn action_timeout(&self) -> Option<Duration> {
		millis(self.action_timeout_ms)
	}

	/// Budget the owner should pass to each queue drain. Zero fields are unbounded.
	pub fn drain_budget(&self) -> DrainBudget {
		let duration = millis(self.drain_max_ms).unwrap_or(Duration::MAX);
		let max_actions = if self.drain_max_actions == 0 { usize::MAX } else { self.drain_max_actions };
		DrainBudget::new(duration, max_actions)
	}
}

fn millis(ms: u64) -> Option<Duration> {
	(ms > 0).then(|| Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn partial_toml_keeps_defaults() {
		let config = BootstrapConfig::from_toml_str(
			r#"
			current_version = "3"
			compatible_versions = ["4", "3"]
			action_timeout_ms = 0
			"#,
		)
		.unwrap();

		assert_eq!(config.current_version, "3");
		assert_eq!(config.versions(), VersionPolicy::new("3", ["3", "4"]));
		assert_eq!(config.action_timeout(), None);
		assert_eq!(config.environment_timeout(), Some(Duration::from_secs(30)));
		assert_eq!(config.drain_budget(), DrainBudget::new(Duration::from_millis(4), 16));
	}

	#[test]
	fn zero_drain_limits_mean_unbounded() {
		let config = BootstrapConfig::from_toml_str("drain_max_ms = 0\ndrain_max_actions = 0\n").unwrap();
		assert_eq!(config.drain_budget(), DrainBudget::new(Duration::MAX, usize::MAX));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = BootstrapConfig::from_toml_str("retry_forever = true").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn missing_file_reports_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bootstrap.toml");
		let err = BootstrapConfig::load(&path).unwrap_err();
		assert!(err.to_string().contains("bootstrap.toml"), "{err}");
	}

	#[test]
	fn loads_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bootstrap.toml");
		std::fs::write(&path, "drain_max_actions = 2\n").unwrap();
		assert_eq!(BootstrapConfig::load(&path).unwrap().drain_max_actions, 2);
	}
}
