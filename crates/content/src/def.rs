use serde::{Deserialize, Serialize};

/// Category a content definition belongs to. Names are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
	Resource,
	Craftable,
	Voxel,
	Faction,
	Job,
	Decal,
}

impl ContentKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Resource => "resource",
			Self::Craftable => "craftable",
			Self::Voxel => "voxel",
			Self::Faction => "faction",
			Self::Job => "job",
			Self::Decal => "decal",
		}
	}
}

impl std::fmt::Display for ContentKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where a definition came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
	/// Shipped with the program.
	#[default]
	Builtin,
	/// Produced by world generation.
	Generated,
	/// Restored from a saved session.
	Save,
}

/// Lookup key: kind plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey {
	pub kind: ContentKind,
	pub name: Box<str>,
}

impl ContentKey {
	pub fn new(kind: ContentKind, name: &str) -> Self {
		Self { kind, name: name.into() }
	}
}

/// One content definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDef {
	pub kind: ContentKind,
	pub name: String,
	#[serde(default)]
	pub tags: Vec<String>,
	/// Trade value in the smallest currency unit.
	#[serde(default)]
	pub value: u32,
	#[serde(default)]
	pub source: ContentSource,
}

impl ContentDef {
	pub fn new(kind: ContentKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
			tags: Vec::new(),
			value: 0,
			source: ContentSource::Builtin,
		}
	}

	#[must_use]
	pub fn with_tags<I, S>(mut self, tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.tags = tags.into_iter().map(Into::into).collect();
		self
	}

	#[must_use]
	pub fn with_value(mut self, value: u32) -> Self {
		self.value = value;
		self
	}

	#[must_use]
	pub fn with_source(mut self, source: ContentSource) -> Self {
		self.source = source;
		self
	}

	pub fn key(&self) -> ContentKey {
		ContentKey::new(self.kind, &self.name)
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.iter().any(|t| t == tag)
	}
}
