use std::path::Path;

use crate::{ContentDef, RegistryError};

/// Parses a JSON array of content definitions.
pub fn defs_from_json(text: &str) -> Result<Vec<ContentDef>, RegistryError> {
	serde_json::from_str(text).map_err(|error| RegistryError::Parse { path: None, error })
}

/// Reads every `*.json` file in `dir` as a list of definitions.
///
/// Files are visited in name order so the resulting sequence, and therefore
/// duplicate resolution, is deterministic.
pub fn load_dir(dir: &Path) -> Result<Vec<ContentDef>, RegistryError> {
	let io_err = |path: &Path, error: std::io::Error| RegistryError::Io {
		path: path.to_path_buf(),
		error,
	};

	let mut files = Vec::new();
	for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
		let path = entry.map_err(|e| io_err(dir, e))?.path();
		if path.extension().is_some_and(|ext| ext == "json") {
			files.push(path);
		}
	}
	files.sort();

	let mut defs = Vec::new();
	for path in files {
		let text = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
		let mut batch: Vec<ContentDef> = serde_json::from_str(&text).map_err(|error| RegistryError::Parse {
			path: Some(path.clone()),
			error,
		})?;
		tracing::debug!(path = %path.display(), count = batch.len(), "content.load_file");
		defs.append(&mut batch);
	}
	Ok(defs)
}
