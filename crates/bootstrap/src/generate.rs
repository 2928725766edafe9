//! Fresh-session generation interface and a flat-world reference generator.

use anyhow::{Context, bail};
use delve_content::{ContentDef, ContentKind, ContentSource, RegistryScratch};
use serde::{Deserialize, Serialize};

use crate::session::{
	ChunkExtent, ComponentGraph, ComponentNode, DerivedFields, Faction, FactionRoster, SessionBuildState, SessionMetadata, TaskQueue, TerrainRef, TerrainSource,
	TutorialState, WorldClock,
};

pub const PLAYER_FACTION: &str = "Player";
pub const MOTHERLAND_FACTION: &str = "The Motherland";
pub const FIRST_TUTORIAL: &str = "new game start";

/// Offset of the motherland's center from the player's spawn origin.
const MOTHERLAND_OFFSET: i32 = 50;

/// Region the player embarks in, in overworld cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRect {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl SpawnRect {
	pub fn origin(&self) -> [i32; 2] {
		[self.x, self.y]
	}
}

/// Caller-supplied settings for the generate branch. Passed through to the generator unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
	pub seed: u64,
	pub world_size: ChunkExtent,
	pub spawn: SpawnRect,
	pub sea_level: f32,
	/// Total roster size, counting the player and the motherland.
	pub faction_count: usize,
	pub tutorial: bool,
	/// Player company name, used for the root component.
	pub company: String,
}

impl Default for GenerationSettings {
	fn default() -> Self {
		Self {
			seed: 0,
			world_size: ChunkExtent::new(8, 4, 8),
			spawn: SpawnRect {
				x: 0,
				y: 0,
				width: 16,
				height: 16,
			},
			sea_level: 0.17,
			faction_count: 6,
			tutorial: true,
			company: "Delve Corp".to_owned(),
		}
	}
}

/// Builds a fresh session. Must be deterministic for identical settings.
///
/// Content definitions the generator creates go into `scratch`; they become
/// visible only if the run succeeds.
pub trait SessionGenerator: Send + Sync + 'static {
	fn generate(&self, settings: &GenerationSettings, scratch: &mut RegistryScratch) -> anyhow::Result<SessionBuildState>;
}

const NATIVE_RACES: &[(&str, bool)] = &[("Goblins", true), ("Elves", true), ("Undead", true), ("Molemen", true), ("Trolls", false)];
const NAME_HEADS: &[&str] = &["Grub", "Ael", "Mor", "Dig", "Thra", "Vel", "Skar", "Ost"];
const NAME_TAILS: &[&str] = &["nak", "wen", "grim", "hollow", "mar", "ith", "dun", "ka"];

/// Generates a flat world with a player camp, the motherland and native settlements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatWorldGenerator;

impl SessionGenerator for FlatWorldGenerator {
	fn generate(&self, settings: &GenerationSettings, scratch: &mut RegistryScratch) -> anyhow::Result<SessionBuildState> {
		if settings.faction_count < 2 {
			bail!("faction roster needs room for the player and the motherland, got {}", settings.faction_count);
		}

		let mut rng = SplitMix64::new(settings.seed);
		let origin = settings.spawn.origin();

		let mut factions = vec![
			faction(PLAYER_FACTION, "Dwarf", false, true, origin),
			faction(MOTHERLAND_FACTION, "Dwarf", false, true, shifted(origin, MOTHERLAND_OFFSET, MOTHERLAND_OFFSET)?),
		];
		while factions.len() < settings.faction_count {
			let (race, intelligent) = NATIVE_RACES[rng.below(NATIVE_RACES.len())];
			let mut name = format!("{}{}", NAME_HEADS[rng.below(NAME_HEADS.len())], NAME_TAILS[rng.below(NAME_TAILS.len())]);
			if factions.iter().any(|f| f.name == name) {
				name = format!("{name} {}", factions.len());
			}
			let center = shifted(origin, rng.offset(200), rng.offset(200))?;
			factions.push(faction(&name, race, true, intelligent, center));
		}

		// Factions from an earlier session stay as they are.
		for f in &factions {
			scratch.register_if_new(
				ContentDef::new(ContentKind::Faction, f.name.clone())
					.with_tags([f.race.as_str()])
					.with_source(ContentSource::Generated),
			);
		}

		let mut components = ComponentGraph::new();
		components.push(ComponentNode::root(1, settings.company.clone()));
		components.push(ComponentNode::child(2, 1, "Embarkment"));
		for i in 0..3 {
			components.push(ComponentNode::child(3 + i, 2, format!("Dwarf {}", i + 1)));
		}

		let available = scratch.base().with_tag(ContentKind::Craftable, "tutorial").iter().map(|d| d.name.clone()).collect();
		let tutorial = TutorialState {
			enabled: settings.tutorial,
			queued: if settings.tutorial { vec![FIRST_TUTORIAL.to_owned()] } else { Vec::new() },
			available,
			..TutorialState::default()
		};

		let game_id = u32::try_from(rng.next_u64() % 1024)?;
		tracing::debug!(seed = settings.seed, game_id, factions = factions.len(), "session.generate");

		Ok(SessionBuildState {
			metadata: SessionMetadata {
				game_id,
				world_origin: [origin[0] as f32, origin[1] as f32],
				world_scale: 1.0,
				chunks: settings.world_size,
				overworld: None,
				clock: WorldClock::default(),
				slice: 0,
			},
			terrain: TerrainRef {
				source: TerrainSource::Generated { seed: settings.seed },
				chunks: settings.world_size,
				sea_level: settings.sea_level,
			},
			factions: FactionRoster { factions },
			components,
			tasks: TaskQueue::default(),
			tutorial,
			derived: DerivedFields::default(),
		})
	}
}

fn faction(name: &str, race: &str, native: bool, intelligent: bool, center: [i32; 2]) -> Faction {
	Faction {
		name: name.to_owned(),
		race: race.to_owned(),
		native,
		intelligent,
		race_faction: false,
		center,
	}
}

fn shifted(origin: [i32; 2], dx: i32, dy: i32) -> anyhow::Result<[i32; 2]> {
	let x = origin[0].checked_add(dx);
	let y = origin[1].checked_add(dy);
	x.zip(y)
		.map(|(x, y)| [x, y])
		.with_context(|| format!("faction center ({dx}, {dy}) from spawn {origin:?} leaves the overworld"))
}

/// SplitMix64; small, seedable and stable across platforms.
struct SplitMix64(u64);

impl SplitMix64 {
	fn new(seed: u64) -> Self {
		Self(seed)
	}

	fn next_u64(&mut self) -> u64 {
		self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
		let mut z = self.0;
		z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
		z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
		z ^ (z >> 31)
	}

	fn below(&mut self, n: usize) -> usize {
		(self.next_u64() % n as u64) as usize
	}

	fn offset(&mut self, radius: i32) -> i32 {
		let span = u64::from(radius.unsigned_abs()) * 2 + 1;
		(self.next_u64() % span) as i32 - radius
	}
}

#[cfg(test)]
mod tests {
	use delve_content::{ContentRegistry, DuplicatePolicy};
	use pretty_assertions::assert_eq;

	use super::*;

	fn generate(settings: &GenerationSettings) -> (SessionBuildState, RegistryScratch) {
		let registry = ContentRegistry::default();
		let mut scratch = registry.scratch();
		let state = FlatWorldGenerator.generate(settings, &mut scratch).unwrap();
		(state, scratch)
	}

	#[test]
	fn same_seed_same_session() {
		let settings = GenerationSettings { seed: 99, ..GenerationSettings::default() };
		assert_eq!(generate(&settings).0, generate(&settings).0);
	}

	#[test]
	fn roster_has_configured_size_and_fixed_factions() {
		let settings = GenerationSettings {
			faction_count: 5,
			spawn: SpawnRect {
				x: 10,
				y: -4,
				width: 8,
				height: 8,
			},
			..GenerationSettings::default()
		};
		let (state, scratch) = generate(&settings);
		assert_eq!(state.factions.len(), 5);
		assert_eq!(state.factions.get(PLAYER_FACTION).map(|f| f.center), Some([10, -4]));
		assert_eq!(state.factions.get(MOTHERLAND_FACTION).map(|f| f.center), Some([60, 46]));
		assert_eq!(scratch.staged_len(), 5);
		assert!(scratch.staged().all(|d| d.kind == ContentKind::Faction && d.source == ContentSource::Generated));
	}

	#[test]
	fn generated_graph_is_consistent() {
		let (state, _) = generate(&GenerationSettings::default());
		assert_eq!(state.components.validate(), Ok(()));
		assert_eq!(state.components.roots().count(), 1);
	}

	#[test]
	fn tutorial_follows_settings() {
		let (on, _) = generate(&GenerationSettings::default());
		assert_eq!(on.tutorial.queued, vec![FIRST_TUTORIAL.to_owned()]);

		let (off, _) = generate(&GenerationSettings {
			tutorial: false,
			..GenerationSettings::default()
		});
		assert!(!off.tutorial.enabled);
		assert!(off.tutorial.queued.is_empty());
	}

	#[test]
	fn tutorial_craftables_become_available() {
		let registry = ContentRegistry::with_builtins(
			[
				ContentDef::new(ContentKind::Craftable, "Bed").with_tags(["tutorial"]),
				ContentDef::new(ContentKind::Craftable, "Ladder"),
			],
			Default::default(),
		)
		.unwrap();
		let mut scratch = registry.scratch();
		let state = FlatWorldGenerator.generate(&GenerationSettings::default(), &mut scratch).unwrap();
		assert_eq!(state.tutorial.available.into_iter().collect::<Vec<_>>(), vec!["Bed".to_owned()]);
	}

	#[test]
	fn roster_smaller_than_two_is_refused() {
		let registry = ContentRegistry::default();
		let mut scratch = registry.scratch();
		let settings = GenerationSettings {
			faction_count: 1,
			..GenerationSettings::default()
		};
		assert!(FlatWorldGenerator.generate(&settings, &mut scratch).is_err());
		assert_eq!(scratch.staged_len(), 0);
	}

	#[test]
	fn spawn_at_overworld_edge_is_refused() {
		let registry = ContentRegistry::default();
		let mut scratch = registry.scratch();
		let settings = GenerationSettings {
			spawn: SpawnRect {
				x: i32::MAX - 10,
				y: 0,
				width: 8,
				height: 8,
			},
			..GenerationSettings::default()
		};
		let err = FlatWorldGenerator.generate(&settings, &mut scratch).unwrap_err();
		assert!(err.to_string().contains("leaves the overworld"), "{err:#}");
		assert_eq!(scratch.staged_len(), 0);
	}

	#[test]
	fn regenerating_keeps_committed_factions_under_reject() {
		let registry = ContentRegistry::with_builtins(Vec::new(), DuplicatePolicy::Reject).unwrap();
		let settings = GenerationSettings::default();

		let mut first = registry.scratch();
		FlatWorldGenerator.generate(&settings, &mut first).unwrap();
		registry.commit(first).unwrap();
		let committed = registry.len();

		let mut second = registry.scratch();
		let state = FlatWorldGenerator.generate(&settings, &mut second).unwrap();
		assert_eq!(state.factions.len(), settings.faction_count);
		assert_eq!(second.staged_len(), 0);
		registry.commit(second).unwrap();
		assert_eq!(registry.len(), committed);
	}
}
