//! Owner-bound stages and the stage library the controller sequences.

use std::sync::Arc;

use delve_content::ContentDef;

use crate::generate::{FlatWorldGenerator, SessionGenerator};
use crate::persist::{JsonSessionReader, SessionReader};
use crate::producer::Branch;
use crate::session::{ChunkExtent, SessionBuildState};

/// Read-only facts about the session an exclusive stage may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageView {
	pub run: u64,
	pub branch: Branch,
	pub game_id: u32,
	pub chunks: ChunkExtent,
	pub factions: Vec<String>,
	pub components: usize,
}

impl StageView {
	pub(crate) fn new(run: u64, branch: Branch, state: &SessionBuildState) -> Self {
		Self {
			run,
			branch,
			game_id: state.metadata.game_id,
			chunks: state.metadata.chunks,
			factions: state.factions.factions.iter().map(|f| f.name.clone()).collect(),
			components: state.components.len(),
		}
	}
}

/// A stage that creates resources only the owner may touch.
///
/// `run` executes on the owner thread with the owner's exclusive resources `R`.
/// Definitions it returns are staged with the rest of the run's registrations.
pub trait ExclusiveStage<R>: Send + Sync + 'static {
	fn name(&self) -> &'static str;

	fn run(&self, resources: &mut R, view: &StageView) -> anyhow::Result<Vec<ContentDef>>;
}

/// External collaborators of a bootstrap run.
pub struct StageLibrary<R> {
	pub(crate) reader: Arc<dyn SessionReader>,
	pub(crate) generator: Arc<dyn SessionGenerator>,
	pub(crate) exclusive: Vec<Arc<dyn ExclusiveStage<R>>>,
}

impl<R: 'static> Clone for StageLibrary<R> {
	fn clone(&self) -> Self {
		Self {
			reader: Arc::clone(&self.reader),
			generator: Arc::clone(&self.generator),
			exclusive: self.exclusive.clone(),
		}
	}
}

impl<R: 'static> Default for StageLibrary<R> {
	/// JSON save directories, flat world generation, no exclusive stages.
	fn default() -> Self {
		Self::new(Arc::new(JsonSessionReader), Arc::new(FlatWorldGenerator))
	}
}

impl<R: 'static> StageLibrary<R> {
	pub fn new(reader: Arc<dyn SessionReader>, generator: Arc<dyn SessionGenerator>) -> Self {
		Self {
			reader,
			generator,
			exclusive: Vec::new(),
		}
	}

	/// Appends an exclusive stage. Stages run in the order they were added.
	#[must_use]
	pub fn with_exclusive(mut self, stage: impl ExclusiveStage<R>) -> Self {
		self.exclusive.push(Arc::new(stage));
		self
	}

	pub fn exclusive_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.exclusive.iter().map(|s| s.name())
	}
}
