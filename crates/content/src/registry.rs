//! Registry container with atomic snapshot publication.
//!
//! # Invariants
//!
//! - A published snapshot is never mutated; commits build a new one and CAS it in.
//! - Concurrent commits are linearizable: a lost CAS retries against the newer snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;

use crate::{ContentDef, ContentKey, ContentKind, RegistryError, RegistryScratch};

/// How a definition whose key already exists is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
	/// Keep the definition already present.
	#[default]
	FirstWins,
	/// Overwrite with the newer definition.
	LastWins,
	/// Refuse the newer definition with [`RegistryError::Duplicate`].
	Reject,
}

/// Immutable view of every published definition.
#[derive(Debug, Default, Clone)]
pub struct RegistrySnapshot {
	entries: HashMap<ContentKey, Arc<ContentDef>>,
	generation: u64,
}

impl RegistrySnapshot {
	pub fn get(&self, kind: ContentKind, name: &str) -> Option<&Arc<ContentDef>> {
		self.entries.get(&ContentKey::new(kind, name))
	}

	pub fn contains(&self, key: &ContentKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of commits published before this snapshot.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Definitions of one kind, sorted by name.
	pub fn of_kind(&self, kind: ContentKind) -> Vec<Arc<ContentDef>> {
		let mut defs: Vec<_> = self.entries.values().filter(|d| d.kind == kind).cloned().collect();
		defs.sort_by(|a, b| a.name.cmp(&b.name));
		defs
	}

	/// Definitions of one kind carrying `tag`, sorted by name.
	pub fn with_tag(&self, kind: ContentKind, tag: &str) -> Vec<Arc<ContentDef>> {
		let mut defs = self.of_kind(kind);
		defs.retain(|d| d.has_tag(tag));
		defs
	}

	/// The median-valued definition of one kind carrying `tag`.
	pub fn median_with_tag(&self, kind: ContentKind, tag: &str) -> Option<Arc<ContentDef>> {
		let mut defs = self.with_tag(kind, tag);
		defs.sort_by_key(|d| d.value);
		let mid = defs.len() / 2;
		defs.into_iter().nth(mid)
	}
}

/// Summary of one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
	pub inserted: usize,
	pub replaced: usize,
	/// Staged definitions dropped because another commit published the key first.
	pub kept: usize,
	/// Generation of the snapshot this commit produced (unchanged for empty commits).
	pub generation: u64,
}

/// Shared handle to the process content registry. Clones share state.
#[derive(Debug, Clone)]
pub struct ContentRegistry {
	snap: Arc<ArcSwap<RegistrySnapshot>>,
	policy: DuplicatePolicy,
}

impl Default for ContentRegistry {
	fn default() -> Self {
		Self::new(DuplicatePolicy::default())
	}
}

impl ContentRegistry {
	pub fn new(policy: DuplicatePolicy) -> Self {
		Self {
			snap: Arc::new(ArcSwap::from_pointee(RegistrySnapshot::default())),
			policy,
		}
	}

	/// Creates a registry pre-populated with `defs` as generation 0.
	pub fn with_builtins(defs: impl IntoIterator<Item = ContentDef>, policy: DuplicatePolicy) -> Result<Self, RegistryError> {
		let mut entries = HashMap::default();
		for def in defs {
			let key = def.key();
			if entries.contains_key(&key) {
				match policy {
					DuplicatePolicy::FirstWins => continue,
					DuplicatePolicy::LastWins => {}
					DuplicatePolicy::Reject => {
						return Err(RegistryError::Duplicate {
							kind: def.kind,
							name: def.name,
						});
					}
				}
			}
			entries.insert(key, Arc::new(def));
		}
		Ok(Self {
			snap: Arc::new(ArcSwap::from_pointee(RegistrySnapshot { entries, generation: 0 })),
			policy,
		})
	}

	pub fn policy(&self) -> DuplicatePolicy {
		self.policy
	}

	/// Loads the current snapshot.
	pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
		self.snap.load_full()
	}

	pub fn get(&self, kind: ContentKind, name: &str) -> Option<Arc<ContentDef>> {
		self.snap.load().get(kind, name).cloned()
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snap.load().is_empty()
	}

	/// Opens a scratch area layered over the current snapshot.
	pub fn scratch(&self) -> RegistryScratch {
		RegistryScratch::new(self.snapshot(), self.policy)
	}

	/// Publishes everything staged in `scratch` as one new snapshot.
	pub fn commit(&self, scratch: RegistryScratch) -> Result<CommitReport, RegistryError> {
		let staged = scratch.into_staged();
		if staged.is_empty() {
			return Ok(CommitReport {
				generation: self.snap.load().generation,
				..CommitReport::default()
			});
		}

		loop {
			let old = self.snap.load_full();
			let mut next = RegistrySnapshot {
				entries: old.entries.clone(),
				generation: old.generation.wrapping_add(1),
			};
			let mut report = CommitReport {
				generation: next.generation,
				..CommitReport::default()
			};

			for def in &staged {
				let key = def.key();
				if next.entries.contains_key(&key) {
					match self.policy {
						DuplicatePolicy::FirstWins => {
							report.kept += 1;
							continue;
						}
						DuplicatePolicy::LastWins => report.replaced += 1,
						DuplicatePolicy::Reject => {
							return Err(RegistryError::Duplicate {
								kind: def.kind,
								name: def.name.clone(),
							});
						}
					}
				} else {
					report.inserted += 1;
				}
				next.entries.insert(key, Arc::clone(def));
			}

			let next = Arc::new(next);
			let prev = self.snap.compare_and_swap(&old, Arc::clone(&next));
			if Arc::ptr_eq(&prev, &old) {
				tracing::debug!(
					generation = report.generation,
					inserted = report.inserted,
					replaced = report.replaced,
					kept = report.kept,
					"registry.commit"
				);
				return Ok(report);
			}
			// Lost the race; rebuild on top of the newer snapshot.
		}
	}
}

#[cfg(test)]
mod tests;
