//! Persisted session interface and the JSON save-directory reader.
//!
//! A save directory holds two files:
//!
//! * `metadata.json`: the session version plus [`SessionMetadata`] fields,
//! * `play.json`: the [`RawSections`] (components, factions, tasks, resources, tutorial).

use std::path::{Path, PathBuf};

use anyhow::Context;
use delve_content::ContentDef;
use serde::{Deserialize, Serialize};

use crate::session::{ComponentNode, Faction, SessionMetadata, TaskRecord, TutorialState};

pub const METADATA_FILE: &str = "metadata.json";
pub const PLAY_FILE: &str = "play.json";

/// Opaque locator of a persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionLocator(String);

impl SessionLocator {
	pub fn new(locator: impl Into<String>) -> Self {
		Self(locator.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&Path> for SessionLocator {
	fn from(path: &Path) -> Self {
		Self(path.to_string_lossy().into_owned())
	}
}

impl From<PathBuf> for SessionLocator {
	fn from(path: PathBuf) -> Self {
		Self::from(path.as_path())
	}
}

impl std::fmt::Display for SessionLocator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Session body sections, still in their persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSections {
	#[serde(default)]
	pub components: Vec<ComponentNode>,
	#[serde(default)]
	pub factions: Vec<Faction>,
	#[serde(default)]
	pub tasks: Vec<TaskRecord>,
	/// Resource definitions created during play (e.g. generated trade goods).
	#[serde(default)]
	pub resources: Vec<ContentDef>,
	#[serde(default)]
	pub tutorial: Option<TutorialState>,
}

/// What a reader hands back for one locator.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
	pub version: String,
	pub metadata: SessionMetadata,
	pub sections: RawSections,
}

/// Reads persisted sessions. Implementations must be deterministic for a given locator.
pub trait SessionReader: Send + Sync + 'static {
	fn read(&self, locator: &SessionLocator) -> anyhow::Result<PersistedSession>;
}

#[derive(Serialize, Deserialize)]
struct MetadataFile {
	version: String,
	#[serde(flatten)]
	metadata: SessionMetadata,
}

/// Reads save directories laid out as described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSessionReader;

impl SessionReader for JsonSessionReader {
	fn read(&self, locator: &SessionLocator) -> anyhow::Result<PersistedSession> {
		let dir = Path::new(locator.as_str());
		anyhow::ensure!(dir.is_dir(), "save directory {} does not exist", dir.display());

		let MetadataFile { version, metadata } = read_json(&dir.join(METADATA_FILE))?;
		let sections = read_json(&dir.join(PLAY_FILE))?;
		tracing::debug!(save = %locator, %version, "session.read");
		Ok(PersistedSession { version, metadata, sections })
	}
}

/// Writes `session` as a save directory readable by [`JsonSessionReader`].
pub fn write_save_dir(dir: &Path, session: &PersistedSession) -> anyhow::Result<()> {
	std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
	let metadata = MetadataFile {
		version: session.version.clone(),
		metadata: session.metadata.clone(),
	};
	write_json(&dir.join(METADATA_FILE), &metadata)?;
	write_json(&dir.join(PLAY_FILE), &session.sections)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
	let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
	let text = serde_json::to_string_pretty(value)?;
	std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::session::{ChunkExtent, WorldClock};

	fn sample() -> PersistedSession {
		PersistedSession {
			version: "3".into(),
			metadata: SessionMetadata {
				game_id: 42,
				world_origin: [12.0, 30.0],
				world_scale: 1.0,
				chunks: ChunkExtent::new(8, 4, 8),
				overworld: Some("Mirkwood".into()),
				clock: WorldClock {
					ticks: 900,
					time_of_day: 0.25,
				},
				slice: 40,
			},
			sections: RawSections {
				components: vec![ComponentNode::root(1, "root"), ComponentNode::child(2, 1, "camp")],
				..RawSections::default()
			},
		}
	}

	#[test]
	fn save_directory_round_trips_through_reader() {
		let dir = tempfile::tempdir().unwrap();
		write_save_dir(dir.path(), &sample()).unwrap();
		let read = JsonSessionReader.read(&SessionLocator::from(dir.path())).unwrap();
		assert_eq!(read, sample());
	}

	#[test]
	fn metadata_is_flat_next_to_version() {
		let dir = tempfile::tempdir().unwrap();
		write_save_dir(dir.path(), &sample()).unwrap();
		let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap()).unwrap();
		assert_eq!(raw["version"], "3");
		assert_eq!(raw["game_id"], 42);
	}

	#[test]
	fn missing_directory_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let locator = SessionLocator::from(dir.path().join("nope"));
		let err = JsonSessionReader.read(&locator).unwrap_err();
		assert!(err.to_string().contains("does not exist"), "{err}");
	}

	#[test]
	fn malformed_play_data_names_the_file() {
		let dir = tempfile::tempdir().unwrap();
		write_save_dir(dir.path(), &sample()).unwrap();
		std::fs::write(dir.path().join(PLAY_FILE), "{ not json").unwrap();
		let err = JsonSessionReader.read(&SessionLocator::from(dir.path())).unwrap_err();
		assert!(err.to_string().contains(PLAY_FILE), "{err}");
	}
}
