//! Execution-context primitives shared by the bootstrap pipeline.
//!
//! Two contexts cooperate during a bootstrap run:
//!
//! * the **worker** runs the stage sequence on a dedicated thread and may block,
//! * the **owner** holds exclusive resources and services queued actions once per tick.
//!
//! The only structures both contexts touch live here: the [`ActionQueue`]
//! (worker submits, owner drains), the status cell (worker publishes, anyone
//! reads) and the readiness signal (owner signals, worker waits).

mod action;
mod budget;
mod class;
mod panic;
mod signal;
mod spawn;
mod status;
mod token;

pub use action::{ActionError, ActionQueue, ActionSender, Completion, WaitError, action_channel};
pub use budget::{DrainBudget, DrainReport};
pub use class::ThreadRole;
pub use panic::panic_message;
pub use signal::{ReadyError, ReadySignal, ReadyWait, readiness};
pub use spawn::{current_thread_runtime, spawn_named_thread};
pub use status::{Snapshot, StatusReader, StatusWriter, status_channel};
pub use token::{RunClock, RunToken};
pub use tokio_util::sync::CancellationToken;
