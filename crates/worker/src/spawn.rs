use crate::ThreadRole;

/// Spawns a dedicated named OS thread tagged with its execution role.
pub fn spawn_named_thread<F, R>(role: ThreadRole, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(role = role.as_str(), thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

/// Builds the single-threaded async runtime a worker thread drives its waits on.
///
/// Only the time driver is enabled; the worker never performs async I/O.
pub fn current_thread_runtime(role: ThreadRole) -> std::io::Result<tokio::runtime::Runtime> {
	tracing::trace!(role = role.as_str(), "worker.runtime.build");
	tokio::runtime::Builder::new_current_thread().enable_time().build()
}
