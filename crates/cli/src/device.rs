//! Stand-in for the rendering device the owner thread holds.

use anyhow::ensure;
use delve_bootstrap::{ExclusiveStage, StageView};
use delve_content::{ContentDef, ContentKind, ContentSource};

/// Exclusive resources built during bootstrap. Lives on the main thread only.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
	pub primitives: Vec<String>,
	pub sprite_sheets: usize,
	pub particle_emitters: usize,
}

/// Builds one voxel primitive per chunk column.
pub struct Primitives;

impl ExclusiveStage<HeadlessDevice> for Primitives {
	fn name(&self) -> &'static str {
		"primitives"
	}

	fn run(&self, device: &mut HeadlessDevice, view: &StageView) -> anyhow::Result<Vec<ContentDef>> {
		ensure!(view.chunks.x > 0 && view.chunks.z > 0, "world has no chunk columns");
		for x in 0..view.chunks.x {
			for z in 0..view.chunks.z {
				device.primitives.push(format!("chunk-{x}-{z}"));
			}
		}
		Ok(Vec::new())
	}
}

/// Uploads one sprite sheet per faction and registers its banner decal.
pub struct Sprites;

impl ExclusiveStage<HeadlessDevice> for Sprites {
	fn name(&self) -> &'static str {
		"sprites"
	}

	fn run(&self, device: &mut HeadlessDevice, view: &StageView) -> anyhow::Result<Vec<ContentDef>> {
		device.sprite_sheets += view.factions.len();
		Ok(view
			.factions
			.iter()
			.map(|faction| ContentDef::new(ContentKind::Decal, format!("{faction} banner")).with_source(ContentSource::Generated))
			.collect())
	}
}

pub struct Particles;

impl ExclusiveStage<HeadlessDevice> for Particles {
	fn name(&self) -> &'static str {
		"particles"
	}

	fn run(&self, device: &mut HeadlessDevice, _: &StageView) -> anyhow::Result<Vec<ContentDef>> {
		device.particle_emitters = 4;
		Ok(Vec::new())
	}
}
