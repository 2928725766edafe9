//! Session bootstrap pipeline.
//!
//! A [`BootstrapController`] turns a [`BootstrapContext`] (load a persisted
//! session, or generate a fresh one) into a fully initialized [`Session`].
//! Each run executes on its own worker thread:
//!
//! 1. wait for the owner's resource surface ([`ReadyWait`](delve_worker::ReadyWait)),
//! 2. produce the build state through the selected branch
//!    (load: read, version gate, populate, consistency gate; generate: generator),
//! 3. run every [`ExclusiveStage`] on the owner through the action queue,
//! 4. finalize, then commit staged content definitions to the registry.
//!
//! The first failing stage ends the run with one [`CapturedError`]. Content
//! registered during a failed run is discarded with the run's scratch, so the
//! registry never shows partial side effects.

mod config;
mod controller;
mod error;
mod exclusive;
mod generate;
mod persist;
mod pipeline;
mod producer;
pub mod session;
mod status;
mod version;

pub use config::{BootstrapConfig, ConfigError};
pub use controller::{BootstrapContext, BootstrapController, BootstrapHandle};
pub use error::{BootstrapError, CapturedError, ErrorKind, StageError};
pub use exclusive::{ExclusiveStage, StageLibrary, StageView};
pub use generate::{FIRST_TUTORIAL, FlatWorldGenerator, GenerationSettings, MOTHERLAND_FACTION, PLAYER_FACTION, SessionGenerator, SpawnRect};
pub use persist::{JsonSessionReader, METADATA_FILE, PLAY_FILE, PersistedSession, RawSections, SessionLocator, SessionReader, write_save_dir};
pub use pipeline::Session;
pub use producer::{Branch, DEFAULT_SEA_LEVEL, GenerateProducer, LoadProducer, SessionProducer, StageCx};
pub use session::SessionBuildState;
pub use status::{BootstrapStatus, Progress, ProgressReport};
pub use version::VersionPolicy;
