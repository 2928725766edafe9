//! Single-writer, multi-reader status cell.
//!
//! The writer publishes whole snapshots; readers load the latest one. A
//! snapshot is swapped in atomically, so readers see either the current or a
//! previous value and never block the writer.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// One published value with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
	pub value: T,
	/// Strictly increasing across publications; the initial value has sequence 0.
	pub sequence: u64,
}

/// Publishing half. Deliberately not `Clone`: there is exactly one writer per cell.
#[derive(Debug)]
pub struct StatusWriter<T> {
	cell: Arc<ArcSwap<Snapshot<T>>>,
	sequence: u64,
}

/// Reading half.
#[derive(Debug)]
pub struct StatusReader<T> {
	cell: Arc<ArcSwap<Snapshot<T>>>,
}

impl<T> Clone for StatusReader<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Arc::clone(&self.cell),
		}
	}
}

/// Creates a status cell holding `initial` at sequence 0.
pub fn status_channel<T>(initial: T) -> (StatusWriter<T>, StatusReader<T>) {
	let cell = Arc::new(ArcSwap::from_pointee(Snapshot { value: initial, sequence: 0 }));
	let reader = StatusReader { cell: Arc::clone(&cell) };
	(StatusWriter { cell, sequence: 0 }, reader)
}

impl<T> StatusWriter<T> {
	/// Publishes a new value and returns its sequence number.
	pub fn publish(&mut self, value: T) -> u64 {
		self.sequence = self.sequence.wrapping_add(1);
		self.cell.store(Arc::new(Snapshot {
			value,
			sequence: self.sequence,
		}));
		self.sequence
	}

	/// Sequence number of the last publication.
	pub fn sequence(&self) -> u64 {
		self.sequence
	}

	pub fn reader(&self) -> StatusReader<T> {
		StatusReader {
			cell: Arc::clone(&self.cell),
		}
	}
}

impl<T> StatusReader<T> {
	/// Loads the latest published snapshot.
	pub fn load(&self) -> Arc<Snapshot<T>> {
		self.cell.load_full()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn readers_observe_latest_publication() {
		let (mut writer, reader) = status_channel("init");
		assert_eq!(*reader.load(), Snapshot { value: "init", sequence: 0 });

		assert_eq!(writer.publish("one"), 1);
		assert_eq!(writer.publish("two"), 2);

		let late = writer.reader();
		assert_eq!(reader.load().value, "two");
		assert_eq!(late.load().sequence, 2);
	}

	#[test]
	fn concurrent_readers_see_monotonic_sequences() {
		let (mut writer, reader) = status_channel(0_u64);
		let observers: Vec<_> = (0..4)
			.map(|_| {
				let reader = reader.clone();
				std::thread::spawn(move || {
					let mut last = 0;
					for _ in 0..2_000 {
						let snap = reader.load();
						assert!(snap.sequence >= last, "sequence went backwards");
						assert_eq!(snap.value, snap.sequence, "torn snapshot");
						last = snap.sequence;
					}
				})
			})
			.collect();

		for i in 1..=2_000_u64 {
			writer.publish(i);
		}
		for observer in observers {
			observer.join().unwrap();
		}
		assert_eq!(reader.load().sequence, 2_000);
	}
}
