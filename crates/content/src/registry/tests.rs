use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::{ContentSource, InsertAction, defs_from_json, load_dir};

fn resource(name: &str, value: u32) -> ContentDef {
	ContentDef::new(ContentKind::Resource, name).with_value(value)
}

fn builtins() -> ContentRegistry {
	ContentRegistry::with_builtins([resource("Iron", 10), resource("Coal", 4)], DuplicatePolicy::FirstWins).unwrap()
}

#[test]
fn scratch_is_invisible_until_commit() {
	let registry = builtins();
	let mut scratch = registry.scratch();
	assert_eq!(scratch.register(resource("Gold", 50)).unwrap(), InsertAction::InsertedNew);

	assert!(scratch.contains(ContentKind::Resource, "Gold"));
	assert!(registry.get(ContentKind::Resource, "Gold").is_none());

	let report = registry.commit(scratch).unwrap();
	assert_eq!(report, CommitReport { inserted: 1, replaced: 0, kept: 0, generation: 1 });
	assert_eq!(registry.get(ContentKind::Resource, "Gold").map(|d| d.value), Some(50));
}

#[test]
fn discarded_scratch_leaves_registry_untouched() {
	let registry = builtins();
	let before = registry.snapshot();

	let mut scratch = registry.scratch();
	scratch.register(resource("Gold", 50)).unwrap();
	scratch.register(ContentDef::new(ContentKind::Faction, "Elves")).unwrap();
	assert_eq!(scratch.discard(), 2);

	let after = registry.snapshot();
	assert!(Arc::ptr_eq(&before, &after));
	assert_eq!(after.len(), 2);
	assert_eq!(after.generation(), 0);
}

#[test]
fn dropping_scratch_discards_too() {
	let registry = builtins();
	{
		let mut scratch = registry.scratch();
		scratch.register(resource("Gold", 50)).unwrap();
	}
	assert!(registry.get(ContentKind::Resource, "Gold").is_none());
}

#[rstest]
#[case::first_wins(DuplicatePolicy::FirstWins, Some(InsertAction::KeptExisting), 10)]
#[case::last_wins(DuplicatePolicy::LastWins, Some(InsertAction::ReplacedExisting), 99)]
#[case::reject(DuplicatePolicy::Reject, None, 10)]
fn duplicate_against_base(#[case] policy: DuplicatePolicy, #[case] expected: Option<InsertAction>, #[case] committed_value: u32) {
	let registry = ContentRegistry::with_builtins([resource("Iron", 10)], policy).unwrap();
	let mut scratch = registry.scratch();
	let outcome = scratch.register(resource("Iron", 99));
	match expected {
		Some(action) => assert_eq!(outcome.unwrap(), action),
		None => assert!(matches!(outcome, Err(RegistryError::Duplicate { kind: ContentKind::Resource, .. }))),
	}
	registry.commit(scratch).unwrap();
	assert_eq!(registry.get(ContentKind::Resource, "Iron").unwrap().value, committed_value);
}

#[test]
fn staged_duplicates_follow_policy() {
	let registry = ContentRegistry::new(DuplicatePolicy::LastWins);
	let mut scratch = registry.scratch();
	scratch.register(resource("Gold", 1)).unwrap();
	assert_eq!(scratch.register(resource("Gold", 2)).unwrap(), InsertAction::ReplacedExisting);
	assert_eq!(scratch.staged_len(), 1);
	assert_eq!(scratch.get(ContentKind::Resource, "Gold").map(|d| d.value), Some(2));
}

#[test]
fn register_if_new_skips_known_names() {
	let registry = builtins();
	let mut scratch = registry.scratch();
	assert!(!scratch.register_if_new(resource("Iron", 1)));
	assert!(scratch.register_if_new(resource("Mana", 1).with_source(ContentSource::Save)));
	assert!(!scratch.register_if_new(resource("Mana", 2)));
	let staged: Vec<_> = scratch.staged().map(|d| d.name.as_str()).collect();
	assert_eq!(staged, vec!["Mana"]);
}

#[rstest]
#[case(DuplicatePolicy::FirstWins)]
#[case(DuplicatePolicy::LastWins)]
#[case(DuplicatePolicy::Reject)]
fn register_if_new_ignores_duplicate_policy(#[case] policy: DuplicatePolicy) {
	let registry = ContentRegistry::with_builtins([resource("Iron", 10)], policy).unwrap();
	let mut scratch = registry.scratch();
	assert!(!scratch.register_if_new(resource("Iron", 1)));
	registry.commit(scratch).unwrap();
	assert_eq!(registry.get(ContentKind::Resource, "Iron").map(|d| d.value), Some(10));
}

#[test]
fn same_name_different_kind_is_distinct() {
	let registry = builtins();
	let mut scratch = registry.scratch();
	assert_eq!(scratch.register(ContentDef::new(ContentKind::Voxel, "Iron")).unwrap(), InsertAction::InsertedNew);
}

#[test]
fn concurrent_commits_are_not_lost() {
	let registry = ContentRegistry::new(DuplicatePolicy::FirstWins);
	let workers: Vec<_> = (0..8)
		.map(|t| {
			let registry = registry.clone();
			std::thread::spawn(move || {
				for i in 0..25 {
					let mut scratch = registry.scratch();
					scratch.register(resource(&format!("r-{t}-{i}"), i)).unwrap();
					registry.commit(scratch).unwrap();
				}
			})
		})
		.collect();
	for worker in workers {
		worker.join().unwrap();
	}
	let snap = registry.snapshot();
	assert_eq!(snap.len(), 200);
	assert_eq!(snap.generation(), 200);
}

#[test]
fn racing_first_wins_commit_keeps_earlier_publication() {
	let registry = ContentRegistry::new(DuplicatePolicy::FirstWins);
	let mut slow = registry.scratch();
	slow.register(resource("Gold", 1)).unwrap();

	let mut fast = registry.scratch();
	fast.register(resource("Gold", 2)).unwrap();
	registry.commit(fast).unwrap();

	let report = registry.commit(slow).unwrap();
	assert_eq!(report.kept, 1);
	assert_eq!(registry.get(ContentKind::Resource, "Gold").unwrap().value, 2);
}

#[test]
fn empty_commit_does_not_bump_generation() {
	let registry = builtins();
	let report = registry.commit(registry.scratch()).unwrap();
	assert_eq!(report, CommitReport::default());
	assert_eq!(registry.snapshot().generation(), 0);
}

#[test]
fn tag_queries() {
	let registry = ContentRegistry::with_builtins(
		[
			resource("Ruby", 100).with_tags(["Gem"]),
			resource("Emerald", 60).with_tags(["Gem"]),
			resource("Quartz", 10).with_tags(["Gem", "Stone"]),
			resource("Granite", 2).with_tags(["Stone"]),
		],
		DuplicatePolicy::Reject,
	)
	.unwrap();
	let snap = registry.snapshot();

	let gems: Vec<_> = snap.with_tag(ContentKind::Resource, "Gem").iter().map(|d| d.name.clone()).collect();
	assert_eq!(gems, vec!["Emerald", "Quartz", "Ruby"]);
	assert_eq!(snap.median_with_tag(ContentKind::Resource, "Gem").map(|d| d.name.clone()), Some("Emerald".to_owned()));
	assert!(snap.median_with_tag(ContentKind::Resource, "Wood").is_none());
}

#[test]
fn builtin_duplicates_rejected_under_reject_policy() {
	let err = ContentRegistry::with_builtins([resource("Iron", 1), resource("Iron", 2)], DuplicatePolicy::Reject).unwrap_err();
	assert_eq!(err.to_string(), "duplicate resource definition `Iron`");
}

#[test]
fn parses_json_content_lists() {
	let defs = defs_from_json(r#"[{"kind":"resource","name":"Ale","tags":["Drink"],"value":3},{"kind":"job","name":"Brew"}]"#).unwrap();
	assert_eq!(defs.len(), 2);
	assert_eq!(defs[0], resource("Ale", 3).with_tags(["Drink"]));
	assert_eq!(defs[1].source, ContentSource::Builtin);

	assert!(matches!(defs_from_json("{"), Err(RegistryError::Parse { path: None, .. })));
}

#[test]
fn loads_directory_in_name_order() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("b.json"), r#"[{"kind":"resource","name":"Iron","value":2}]"#).unwrap();
	std::fs::write(dir.path().join("a.json"), r#"[{"kind":"resource","name":"Iron","value":1}]"#).unwrap();
	std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

	let defs = load_dir(dir.path()).unwrap();
	assert_eq!(defs.iter().map(|d| d.value).collect::<Vec<_>>(), vec![1, 2]);

	let registry = ContentRegistry::with_builtins(defs, DuplicatePolicy::FirstWins).unwrap();
	assert_eq!(registry.get(ContentKind::Resource, "Iron").unwrap().value, 1);
}

#[test]
fn malformed_file_names_its_path() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
	let err = load_dir(dir.path()).unwrap_err();
	assert!(err.to_string().contains("bad.json"), "{err}");
}
