use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::{ContentDef, ContentKey, ContentKind, DuplicatePolicy, InsertAction, RegistryError, RegistrySnapshot};

/// Staging area for definitions registered during a unit of work.
///
/// Lookups see the staged definitions layered over the snapshot the scratch was
/// opened on. Nothing becomes visible to other registry users until the scratch
/// is passed to [`ContentRegistry::commit`](crate::ContentRegistry::commit);
/// dropping it discards every staged definition.
#[derive(Debug)]
pub struct RegistryScratch {
	base: Arc<RegistrySnapshot>,
	staged: Vec<Arc<ContentDef>>,
	index: HashMap<ContentKey, usize>,
	policy: DuplicatePolicy,
}

impl RegistryScratch {
	pub(crate) fn new(base: Arc<RegistrySnapshot>, policy: DuplicatePolicy) -> Self {
		Self {
			base,
			staged: Vec::new(),
			index: HashMap::default(),
			policy,
		}
	}

	/// Stages `def`, resolving an existing key with the registry's duplicate policy.
	pub fn register(&mut self, def: ContentDef) -> Result<InsertAction, RegistryError> {
		let key = def.key();

		if let Some(&slot) = self.index.get(&key) {
			return match self.policy {
				DuplicatePolicy::FirstWins => Ok(InsertAction::KeptExisting),
				DuplicatePolicy::LastWins => {
					self.staged[slot] = Arc::new(def);
					Ok(InsertAction::ReplacedExisting)
				}
				DuplicatePolicy::Reject => Err(RegistryError::Duplicate {
					kind: def.kind,
					name: def.name,
				}),
			};
		}

		let action = if self.base.contains(&key) {
			match self.policy {
				DuplicatePolicy::FirstWins => return Ok(InsertAction::KeptExisting),
				DuplicatePolicy::LastWins => InsertAction::ReplacedExisting,
				DuplicatePolicy::Reject => {
					return Err(RegistryError::Duplicate {
						kind: def.kind,
						name: def.name,
					});
				}
			}
		} else {
			InsertAction::InsertedNew
		};

		self.index.insert(key, self.staged.len());
		self.staged.push(Arc::new(def));
		Ok(action)
	}

	/// Stages `def` only when no definition with its key is visible yet.
	///
	/// The duplicate policy does not apply: a visible definition always wins
	/// and is never reported as a duplicate, even under
	/// [`DuplicatePolicy::Reject`]. Used for content that may legitimately
	/// reappear, such as definitions restored from a save.
	pub fn register_if_new(&mut self, def: ContentDef) -> bool {
		if self.contains(def.kind, &def.name) {
			return false;
		}
		let key = def.key();
		self.index.insert(key, self.staged.len());
		self.staged.push(Arc::new(def));
		true
	}

	/// Looks up a definition, preferring staged ones over the base snapshot.
	pub fn get(&self, kind: ContentKind, name: &str) -> Option<&ContentDef> {
		let key = ContentKey::new(kind, name);
		match self.index.get(&key) {
			Some(&slot) => Some(self.staged[slot].as_ref()),
			None => self.base.get(kind, name).map(|def| def.as_ref()),
		}
	}

	pub fn contains(&self, kind: ContentKind, name: &str) -> bool {
		self.get(kind, name).is_some()
	}

	/// Snapshot the scratch was opened on.
	pub fn base(&self) -> &RegistrySnapshot {
		&self.base
	}

	/// Number of staged definitions.
	pub fn staged_len(&self) -> usize {
		self.staged.len()
	}

	/// Staged definitions in registration order.
	pub fn staged(&self) -> impl Iterator<Item = &ContentDef> {
		self.staged.iter().map(|def| def.as_ref())
	}

	/// Drops every staged definition, returning how many were discarded.
	pub fn discard(self) -> usize {
		let count = self.staged.len();
		if count > 0 {
			tracing::debug!(discarded = count, "registry.scratch.discard");
		}
		count
	}

	pub(crate) fn into_staged(self) -> Vec<Arc<ContentDef>> {
		self.staged
	}
}
