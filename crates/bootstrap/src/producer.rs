//! The two branches that produce a [`SessionBuildState`].
//!
//! The pipeline picks one producer when the run starts and then treats both
//! the same way: whatever `produce` returns goes through the exclusive stages
//! and finalization unchanged.

use std::sync::Arc;

use delve_content::{ContentSource, RegistryScratch};
use delve_worker::{RunToken, StatusWriter};

use crate::generate::{GenerationSettings, SessionGenerator};
use crate::persist::{PersistedSession, SessionLocator, SessionReader};
use crate::session::{ComponentGraph, DerivedFields, FactionRoster, SessionBuildState, TaskQueue, TerrainRef, TerrainSource};
use crate::status::{BootstrapStatus, Progress};
use crate::{StageError, VersionPolicy};

/// Sea level assumed for loaded terrain.
pub const DEFAULT_SEA_LEVEL: f32 = 0.17;

/// Overworld name that marks a flat world.
const FLAT_OVERWORLD: &str = "flat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
	Load,
	Generate,
}

impl Branch {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Load => "load",
			Self::Generate => "generate",
		}
	}
}

impl std::fmt::Display for Branch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Worker-side context handed to every stage.
pub struct StageCx<'a> {
	pub(crate) status: &'a mut StatusWriter<Progress>,
	pub(crate) token: &'a RunToken,
	pub(crate) scratch: &'a mut RegistryScratch,
}

impl StageCx<'_> {
	/// Publishes a loading message.
	pub fn report(&mut self, message: impl Into<String>) {
		let message = message.into();
		let sequence = self.status.publish(Progress::new(BootstrapStatus::Loading, message.as_str()));
		tracing::debug!(run = self.token.run(), sequence, %message, "bootstrap.progress");
	}

	/// Fails with [`StageError::Cancelled`] once the caller has cancelled the run.
	pub fn checkpoint(&self) -> Result<(), StageError> {
		if self.token.is_cancelled() {
			return Err(StageError::Cancelled);
		}
		Ok(())
	}

	pub fn run(&self) -> u64 {
		self.token.run()
	}

	pub fn scratch(&mut self) -> &mut RegistryScratch {
		self.scratch
	}
}

/// Produces the session state for one branch.
pub trait SessionProducer: Send {
	fn branch(&self) -> Branch;

	fn produce(&self, cx: &mut StageCx<'_>) -> Result<SessionBuildState, StageError>;
}

/// Load branch: read, version gate, populate, consistency gate.
pub struct LoadProducer {
	reader: Arc<dyn SessionReader>,
	locator: SessionLocator,
	versions: VersionPolicy,
}

impl LoadProducer {
	pub fn new(reader: Arc<dyn SessionReader>, locator: SessionLocator, versions: VersionPolicy) -> Self {
		Self { reader, locator, versions }
	}
}

impl SessionProducer for LoadProducer {
	fn branch(&self) -> Branch {
		Branch::Load
	}

	fn produce(&self, cx: &mut StageCx<'_>) -> Result<SessionBuildState, StageError> {
		cx.report(format!("Loading {}", self.locator));
		let persisted = self.reader.read(&self.locator).map_err(|e| StageError::fault("read session", e))?;

		self.versions.check(&persisted.version)?;
		cx.checkpoint()?;

		let state = populate(persisted, cx.scratch());
		cx.checkpoint()?;

		cx.report("Validating components ...");
		state.components.validate()?;
		Ok(state)
	}
}

/// Builds the state from persisted sections. Saved resources are staged only if unknown.
fn populate(persisted: PersistedSession, scratch: &mut RegistryScratch) -> SessionBuildState {
	let PersistedSession { metadata, sections, .. } = persisted;

	let source = match metadata.overworld.as_deref() {
		Some(name) if name != FLAT_OVERWORLD => TerrainSource::Overworld { name: name.to_owned() },
		_ => TerrainSource::Flat,
	};

	let mut restored = 0usize;
	for def in sections.resources {
		if scratch.register_if_new(def.with_source(ContentSource::Save)) {
			restored += 1;
		}
	}
	if restored > 0 {
		tracing::debug!(restored, "session.resources.restore");
	}

	SessionBuildState {
		terrain: TerrainRef {
			source,
			chunks: metadata.chunks,
			sea_level: DEFAULT_SEA_LEVEL,
		},
		metadata,
		factions: FactionRoster { factions: sections.factions },
		components: ComponentGraph::from_nodes(sections.components),
		tasks: TaskQueue { tasks: sections.tasks },
		tutorial: sections.tutorial.unwrap_or_default(),
		derived: DerivedFields::default(),
	}
}

/// Generate branch: hands the caller's settings to the generator.
pub struct GenerateProducer {
	generator: Arc<dyn SessionGenerator>,
	settings: GenerationSettings,
}

impl GenerateProducer {
	pub fn new(generator: Arc<dyn SessionGenerator>, settings: GenerationSettings) -> Self {
		Self { generator, settings }
	}
}

impl SessionProducer for GenerateProducer {
	fn branch(&self) -> Branch {
		Branch::Generate
	}

	fn produce(&self, cx: &mut StageCx<'_>) -> Result<SessionBuildState, StageError> {
		cx.report("Generating world ...");
		self.generator.generate(&self.settings, cx.scratch()).map_err(|e| StageError::fault("generate session", e))
	}
}

#[cfg(test)]
mod tests {
	use delve_content::{ContentDef, ContentKind, ContentRegistry};
	use delve_worker::status_channel;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::ErrorKind;
	use crate::persist::RawSections;
	use crate::session::{ChunkExtent, ComponentNode, SessionMetadata, WorldClock};

	struct Fixed(PersistedSession);

	impl SessionReader for Fixed {
		fn read(&self, _: &SessionLocator) -> anyhow::Result<PersistedSession> {
			Ok(self.0.clone())
		}
	}

	fn persisted(version: &str, overworld: Option<&str>, components: Vec<ComponentNode>) -> PersistedSession {
		PersistedSession {
			version: version.into(),
			metadata: SessionMetadata {
				game_id: 1,
				world_origin: [0.0, 0.0],
				world_scale: 1.0,
				chunks: ChunkExtent::new(2, 2, 2),
				overworld: overworld.map(str::to_owned),
				clock: WorldClock::default(),
				slice: 0,
			},
			sections: RawSections {
				components,
				resources: vec![
					ContentDef::new(ContentKind::Resource, "Stone"),
					ContentDef::new(ContentKind::Resource, "Gem-encrusted Mug").with_value(120),
				],
				..RawSections::default()
			},
		}
	}

	fn produce(session: PersistedSession, registry: &ContentRegistry) -> (Result<SessionBuildState, StageError>, RegistryScratch) {
		let producer = LoadProducer::new(Arc::new(Fixed(session)), SessionLocator::new("fixture"), VersionPolicy::new("3", ["4"]));
		let (mut status, reader) = status_channel(Progress::new(BootstrapStatus::Loading, ""));
		let token = RunToken::new(1);
		let mut scratch = registry.scratch();
		let result = producer.produce(&mut StageCx {
			status: &mut status,
			token: &token,
			scratch: &mut scratch,
		});
		assert!(reader.load().sequence >= 1);
		(result, scratch)
	}

	#[test]
	fn saved_resources_are_staged_only_when_unknown() {
		let registry = ContentRegistry::with_builtins([ContentDef::new(ContentKind::Resource, "Stone")], Default::default()).unwrap();
		let (state, scratch) = produce(persisted("3", Some("Mirkwood"), vec![ComponentNode::root(1, "root")]), &registry);
		let state = state.unwrap();

		assert_eq!(state.terrain.source, TerrainSource::Overworld { name: "Mirkwood".into() });
		assert_eq!(scratch.staged().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["Gem-encrusted Mug"]);
		assert!(scratch.staged().all(|d| d.source == ContentSource::Save));
	}

	#[test]
	fn flat_overworld_name_means_flat_terrain() {
		let (state, _) = produce(persisted("4", Some("flat"), vec![]), &ContentRegistry::default());
		assert_eq!(state.unwrap().terrain.source, TerrainSource::Flat);
	}

	#[test]
	fn version_gate_runs_before_population() {
		let (result, scratch) = produce(persisted("2", None, vec![]), &ContentRegistry::default());
		assert_eq!(result.unwrap_err().kind(), ErrorKind::VersionIncompatible);
		assert_eq!(scratch.staged_len(), 0);
	}

	#[test]
	fn dangling_parent_fails_consistency_gate() {
		let nodes = vec![ComponentNode::root(1, "root"), ComponentNode::child(3, 99, "stray")];
		let (result, _) = produce(persisted("3", None, nodes), &ContentRegistry::default());
		assert_eq!(result.unwrap_err().kind(), ErrorKind::ConsistencyViolation);
	}
}
