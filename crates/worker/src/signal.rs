use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why a readiness wait ended without the signal being raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadyError {
	#[error("owner surface not ready after {0:?}")]
	TimedOut(Duration),
	#[error("readiness wait cancelled")]
	Cancelled,
	#[error("owner dropped the readiness signal before raising it")]
	SignalDropped,
}

/// Owner half: raised once the exclusive resource surface exists.
#[derive(Debug)]
pub struct ReadySignal {
	tx: watch::Sender<bool>,
}

/// Worker half: waits for the owner's signal.
#[derive(Debug, Clone)]
pub struct ReadyWait {
	rx: watch::Receiver<bool>,
}

/// Creates an unraised readiness signal.
pub fn readiness() -> (ReadySignal, ReadyWait) {
	let (tx, rx) = watch::channel(false);
	(ReadySignal { tx }, ReadyWait { rx })
}

impl ReadySignal {
	/// Marks the surface available and wakes every waiter.
	pub fn mark_ready(&self) {
		if !self.tx.send_replace(true) {
			tracing::debug!("owner.surface.ready");
		}
	}

	/// Marks the surface lost, e.g. after a device reset.
	pub fn mark_lost(&self) {
		if self.tx.send_replace(false) {
			tracing::debug!("owner.surface.lost");
		}
	}

	pub fn wait_handle(&self) -> ReadyWait {
		ReadyWait { rx: self.tx.subscribe() }
	}
}

impl ReadyWait {
	pub fn is_ready(&self) -> bool {
		*self.rx.borrow()
	}

	/// Waits until the signal is raised, the optional timeout elapses, or `cancel` fires.
	pub async fn wait(&mut self, timeout: Option<Duration>, cancel: &CancellationToken) -> Result<(), ReadyError> {
		let rx = &mut self.rx;
		let raised = async move {
			match rx.wait_for(|ready| *ready).await {
				Ok(_) => Ok(()),
				Err(_) => Err(ReadyError::SignalDropped),
			}
		};
		let bounded = async move {
			match timeout {
				Some(limit) => tokio::time::timeout(limit, raised).await.unwrap_or(Err(ReadyError::TimedOut(limit))),
				None => raised.await,
			}
		};

		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(ReadyError::Cancelled),
			res = bounded => res,
		}
	}
}
