use std::path::PathBuf;

use thiserror::Error;

use crate::ContentKind;

/// Result of staging one definition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertAction {
	/// Key was new; definition staged.
	InsertedNew,
	/// Key existed; kept the existing definition (policy chose existing).
	KeptExisting,
	/// Key existed; the new definition will replace it on commit.
	ReplacedExisting,
}

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("duplicate {kind} definition `{name}`")]
	Duplicate { kind: ContentKind, name: String },

	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("malformed content list{}: {error}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
	Parse {
		path: Option<PathBuf>,
		#[source]
		error: serde_json::Error,
	},
}
