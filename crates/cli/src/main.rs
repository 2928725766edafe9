//! Delve bootstrap driver.
//!
//! The main thread plays the owner: it holds the headless device, raises the
//! readiness signal and drains the action queue once per tick while the
//! bootstrap worker loads or generates a session.

mod device;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use delve_bootstrap::{
	BootstrapConfig, BootstrapContext, BootstrapController, GenerationSettings, PersistedSession, RawSections, Session, SessionLocator, StageLibrary, write_save_dir,
};
use delve_content::{ContentKind, ContentRegistry, ContentSource, DuplicatePolicy, load_dir};
use delve_worker::{action_channel, readiness};
use tracing::info;

use crate::device::{HeadlessDevice, Particles, Primitives, Sprites};

/// Owner tick period.
const TICK: Duration = Duration::from_millis(16);

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Load or generate a colony session headlessly")]
struct Args {
	/// Save directory to load; a fresh session is generated when absent
	#[arg(short, long, value_name = "DIR")]
	load: Option<PathBuf>,

	/// Seed for fresh sessions
	#[arg(long, default_value_t = 0)]
	seed: u64,

	/// Faction roster size for fresh sessions, counting player and motherland
	#[arg(long, default_value_t = 6)]
	factions: usize,

	/// Bootstrap configuration file (TOML)
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Directory of builtin content definitions (*.json)
	#[arg(long, value_name = "DIR")]
	content: Option<PathBuf>,

	/// Write the bootstrapped session as a save directory
	#[arg(long, value_name = "DIR")]
	save: Option<PathBuf>,

	/// Print the session state as JSON on stdout
	#[arg(long)]
	json: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let config = match &args.config {
		Some(path) => BootstrapConfig::load(path)?,
		None => BootstrapConfig::default(),
	};
	let builtins = match &args.content {
		Some(dir) => load_dir(dir)?,
		None => Vec::new(),
	};
	let registry = ContentRegistry::with_builtins(builtins, DuplicatePolicy::FirstWins)?;
	info!(definitions = registry.len(), "content registry ready");

	let library: StageLibrary<HeadlessDevice> = StageLibrary::default().with_exclusive(Primitives).with_exclusive(Sprites).with_exclusive(Particles);
	tracing::debug!(stages = ?library.exclusive_names().collect::<Vec<_>>(), "exclusive stages");
	let (actions, mut queue) = action_channel();
	let (signal, ready) = readiness();
	let budget = config.drain_budget();
	let controller = BootstrapController::new(config, library, registry, actions, ready);

	let context = BootstrapContext::from_option(args.load.clone().map(SessionLocator::from));
	let settings = GenerationSettings {
		seed: args.seed,
		faction_count: args.factions,
		..GenerationSettings::default()
	};

	let mut device = HeadlessDevice::default();
	signal.mark_ready();
	let handle = controller.start(context, settings)?;

	let mut seen = 0;
	while !handle.is_terminal() {
		let report = queue.drain(&mut device, budget);
		if report.budget_exhausted {
			tracing::debug!(pending = report.pending, "owner drain budget exhausted");
		}
		let progress = handle.poll();
		if progress.sequence != seen {
			seen = progress.sequence;
			info!(run = handle.run(), "{}", progress.message);
		}
		std::thread::sleep(TICK);
	}

	let session = match handle.take_result() {
		Some(Ok(session)) => session,
		Some(Err(err)) => {
			let kind = err.kind();
			return Err(anyhow::Error::new(err).context(format!("bootstrap failed ({kind})")));
		}
		None => bail!("bootstrap finished without an outcome"),
	};

	info!(
		branch = %session.branch,
		elapsed = ?session.elapsed,
		factions = session.state.factions.len(),
		natives = session.state.derived.natives.len(),
		components = session.state.components.len(),
		primitives = device.primitives.len(),
		sprite_sheets = device.sprite_sheets,
		particle_emitters = device.particle_emitters,
		"session ready"
	);

	if let Some(dir) = &args.save {
		save(dir, &controller, &session)?;
		info!(dir = %dir.display(), "session saved");
	}
	if args.json {
		println!("{}", serde_json::to_string_pretty(&session.state)?);
	}
	Ok(())
}

/// Writes `session` so that `--load` can read it back.
fn save(dir: &Path, controller: &BootstrapController<HeadlessDevice>, session: &Session) -> anyhow::Result<()> {
	let state = &session.state;
	let resources = controller
		.registry()
		.snapshot()
		.of_kind(ContentKind::Resource)
		.into_iter()
		.filter(|def| def.source != ContentSource::Builtin)
		.map(|def| def.as_ref().clone())
		.collect();

	let persisted = PersistedSession {
		version: controller.config().current_version.clone(),
		metadata: state.metadata.clone(),
		sections: RawSections {
			components: state.components.nodes().to_vec(),
			factions: state.factions.factions.clone(),
			tasks: state.tasks.tasks.clone(),
			resources,
			tutorial: Some(state.tutorial.clone()),
		},
	};
	write_save_dir(dir, &persisted).with_context(|| format!("saving session to {}", dir.display()))
}
