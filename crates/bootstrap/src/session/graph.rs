use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one component in the session's entity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl std::fmt::Display for ComponentId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
	pub id: ComponentId,
	#[serde(default)]
	pub parent: Option<ComponentId>,
	#[serde(default)]
	pub name: String,
}

impl ComponentNode {
	pub fn root(id: u64, name: impl Into<String>) -> Self {
		Self {
			id: ComponentId(id),
			parent: None,
			name: name.into(),
		}
	}

	pub fn child(id: u64, parent: u64, name: impl Into<String>) -> Self {
		Self {
			id: ComponentId(id),
			parent: Some(ComponentId(parent)),
			name: name.into(),
		}
	}
}

/// Reason a component graph is not a valid forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphViolation {
	#[error("component {node} references unknown parent {parent}")]
	UnknownParent { node: ComponentId, parent: ComponentId },
	#[error("component id {0} appears more than once")]
	DuplicateId(ComponentId),
	#[error("component {0} is its own ancestor")]
	Cycle(ComponentId),
}

/// Parent/child structure among session entities, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentGraph {
	nodes: Vec<ComponentNode>,
}

impl ComponentGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_nodes(nodes: Vec<ComponentNode>) -> Self {
		Self { nodes }
	}

	pub fn push(&mut self, node: ComponentNode) {
		self.nodes.push(node);
	}

	pub fn nodes(&self) -> &[ComponentNode] {
		&self.nodes
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn get(&self, id: ComponentId) -> Option<&ComponentNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn roots(&self) -> impl Iterator<Item = &ComponentNode> {
		self.nodes.iter().filter(|n| n.parent.is_none())
	}

	pub fn children(&self, id: ComponentId) -> impl Iterator<Item = &ComponentNode> {
		self.nodes.iter().filter(move |n| n.parent == Some(id))
	}

	/// Checks that ids are unique, every parent resolves, and no chain loops.
	///
	/// Violations are reported in node order; the first one wins.
	pub fn validate(&self) -> Result<(), GraphViolation> {
		let mut parents: FxHashMap<ComponentId, Option<ComponentId>> = FxHashMap::default();
		for node in &self.nodes {
			if parents.insert(node.id, node.parent).is_some() {
				return Err(GraphViolation::DuplicateId(node.id));
			}
		}

		for node in &self.nodes {
			if let Some(parent) = node.parent
				&& !parents.contains_key(&parent)
			{
				return Err(GraphViolation::UnknownParent { node: node.id, parent });
			}
		}

		// Every chain ends at a root once parents resolve, unless it loops.
		let mut reaches_root: FxHashSet<ComponentId> = FxHashSet::default();
		for node in &self.nodes {
			let mut path = Vec::new();
			let mut cursor = Some(node.id);
			while let Some(id) = cursor {
				if reaches_root.contains(&id) {
					break;
				}
				if path.contains(&id) {
					return Err(GraphViolation::Cycle(id));
				}
				path.push(id);
				cursor = parents.get(&id).copied().flatten();
			}
			reaches_root.extend(path);
		}

		Ok(())
	}
}
