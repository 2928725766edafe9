//! Session build state accumulated across bootstrap stages.

mod graph;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use graph::{ComponentGraph, ComponentId, ComponentNode, GraphViolation};

/// Voxel layers per chunk along the vertical axis.
pub const CHUNK_HEIGHT: i32 = 16;

/// World size in chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkExtent {
	pub x: u32,
	pub y: u32,
	pub z: u32,
}

impl ChunkExtent {
	pub const fn new(x: u32, y: u32, z: u32) -> Self {
		Self { x, y, z }
	}
}

/// In-game time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldClock {
	/// Simulation ticks since the colony was founded.
	pub ticks: u64,
	/// Fraction of the current day, `0.0..1.0`.
	pub time_of_day: f32,
}

/// Scalar facts about a session, persisted alongside its version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
	pub game_id: u32,
	pub world_origin: [f32; 2],
	#[serde(default = "default_world_scale")]
	pub world_scale: f32,
	pub chunks: ChunkExtent,
	/// Name of the overworld the session was embarked from; `None` or `"flat"` for a flat world.
	#[serde(default)]
	pub overworld: Option<String>,
	#[serde(default)]
	pub clock: WorldClock,
	/// Saved viewing slice; zero or negative means "not set".
	#[serde(default)]
	pub slice: i32,
}

fn default_world_scale() -> f32 {
	1.0
}

/// Where the session's terrain comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainSource {
	Overworld { name: String },
	Flat,
	Generated { seed: u64 },
}

/// Handle to the session terrain. Chunk contents stay with the terrain service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainRef {
	pub source: TerrainSource,
	pub chunks: ChunkExtent,
	pub sea_level: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
	pub name: String,
	pub race: String,
	#[serde(default)]
	pub native: bool,
	#[serde(default)]
	pub intelligent: bool,
	/// Placeholder faction standing for a whole race rather than one settlement.
	#[serde(default)]
	pub race_faction: bool,
	#[serde(default)]
	pub center: [i32; 2],
}

impl Faction {
	/// Native settlements that take part in diplomacy.
	pub fn is_native_settlement(&self) -> bool {
		self.native && self.intelligent && !self.race_faction
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionRoster {
	pub factions: Vec<Faction>,
}

impl FactionRoster {
	pub fn len(&self) -> usize {
		self.factions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.factions.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&Faction> {
		self.factions.iter().find(|f| f.name == name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
	pub id: u64,
	pub name: String,
	#[serde(default)]
	pub priority: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskQueue {
	pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialState {
	pub enabled: bool,
	/// Tutorials already shown.
	#[serde(default)]
	pub seen: BTreeSet<String>,
	/// Tutorials waiting to be shown, in order.
	#[serde(default)]
	pub queued: Vec<String>,
	/// Tutorials that can be triggered later in the session.
	#[serde(default)]
	pub available: BTreeSet<String>,
}

/// Fields computed from the rest of the state at finalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
	/// Names of native settlements, in roster order.
	pub natives: Vec<String>,
	pub component_roots: usize,
	pub max_view_level: i32,
}

/// The session under construction.
///
/// Owned by the worker while a run is loading and handed to the caller only
/// once the run succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBuildState {
	pub metadata: SessionMetadata,
	pub terrain: TerrainRef,
	pub factions: FactionRoster,
	pub components: ComponentGraph,
	pub tasks: TaskQueue,
	pub tutorial: TutorialState,
	#[serde(default)]
	pub derived: DerivedFields,
}

impl SessionBuildState {
	/// Recomputes [`DerivedFields`] from the current state.
	pub fn finalize(&mut self) {
		let natives = self.factions.factions.iter().filter(|f| f.is_native_settlement()).map(|f| f.name.clone()).collect();
		let max_view_level = if self.metadata.slice > 0 {
			self.metadata.slice
		} else {
			i32::try_from(self.metadata.chunks.y).unwrap_or(i32::MAX).saturating_mul(CHUNK_HEIGHT)
		};
		self.derived = DerivedFields {
			natives,
			component_roots: self.components.roots().count(),
			max_view_level,
		};
	}
}
