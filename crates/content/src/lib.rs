//! Content definition registry.
//!
//! The registry is an explicit value built once at process start and handed to
//! whoever needs it; there are no process-wide tables. Readers load immutable
//! [`RegistrySnapshot`]s. Writers stage definitions in a [`RegistryScratch`] and
//! publish them in one atomic [`ContentRegistry::commit`], or drop the scratch
//! to discard everything it staged.

mod def;
mod error;
mod load;
mod registry;
mod scratch;

pub use def::{ContentDef, ContentKey, ContentKind, ContentSource};
pub use error::{InsertAction, RegistryError};
pub use load::{defs_from_json, load_dir};
pub use registry::{CommitReport, ContentRegistry, DuplicatePolicy, RegistrySnapshot};
pub use scratch::RegistryScratch;
