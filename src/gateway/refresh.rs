//! Single-flight credential refresh coordination.
//!
//! A [`RefreshCoordinator`] holds the refresh state for one gateway (or for a group of
//! gateways sharing it): whether a refresh is in flight and which requests are waiting on it.
//! [`RefreshCoordinator::join`] decides, under one synchronous lock, whether the caller
//! becomes the refresh *leader* or a queued *waiter*, so two requests can never both start
//! a refresh regardless of the executor's threading model.
//!
//! Tickets clean up after themselves. A leader dropped before [`LeaderTicket::finish`]
//! releases every waiter with [`Error::RefreshAbandoned`], and a waiter dropped before it
//! is resolved (timeout, abort) removes itself from the queue.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

/// Result delivered to every request waiting on a refresh.
pub type RefreshOutcome = Result<(), Arc<Error>>;

/// Shared refresh state: the single-flight flag and the waiter queue.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Returns the number of requests queued behind the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Joins the current refresh burst.
	///
	/// Returns a [`LeaderTicket`] when no refresh is in flight (the caller must perform it),
	/// otherwise enqueues the caller and returns a [`WaiterTicket`].
	pub fn join(&self) -> RefreshTicket<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let id = state.next_waiter;
			let (tx, rx) = oneshot::channel();

			state.next_waiter = state.next_waiter.wrapping_add(1);
			state.waiters.push_back(Waiter { id, tx });

			RefreshTicket::Waiter(WaiterTicket { coordinator: self, id, rx, settled: false })
		} else {
			state.refreshing = true;

			RefreshTicket::Leader(LeaderTicket { coordinator: self, finished: false })
		}
	}

	fn release(&self, outcome: RefreshOutcome) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			mem::take(&mut state.waiters)
		};
		let released = waiters.len();

		for waiter in waiters {
			// The receiver may be gone if its request was cancelled after the queue was drained.
			let _ = waiter.tx.send(outcome.clone());
		}

		released
	}

	fn forget(&self, id: u64) {
		self.state.lock().waiters.retain(|waiter| waiter.id != id);
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	refreshing: bool,
	waiters: VecDeque<Waiter>,
	next_waiter: u64,
}

#[derive(Debug)]
struct Waiter {
	id: u64,
	tx: oneshot::Sender<RefreshOutcome>,
}

/// Role assigned by [`RefreshCoordinator::join`].
#[derive(Debug)]
#[must_use]
pub enum RefreshTicket<'a> {
	/// The caller owns the refresh call.
	Leader(LeaderTicket<'a>),
	/// The caller waits for another request's refresh.
	Waiter(WaiterTicket<'a>),
}

/// Ownership of the in-flight refresh.
#[derive(Debug)]
#[must_use]
pub struct LeaderTicket<'a> {
	coordinator: &'a RefreshCoordinator,
	finished: bool,
}
impl LeaderTicket<'_> {
	/// Ends the refresh and delivers `outcome` to every waiter in enqueue order.
	///
	/// Returns the number of waiters released.
	pub fn finish(mut self, outcome: RefreshOutcome) -> usize {
		self.finished = true;

		self.coordinator.release(outcome)
	}
}
impl Drop for LeaderTicket<'_> {
	fn drop(&mut self) {
		if !self.finished {
			self.coordinator.release(Err(Arc::new(Error::RefreshAbandoned)));
		}
	}
}

/// Queued position behind an in-flight refresh.
#[derive(Debug)]
#[must_use]
pub struct WaiterTicket<'a> {
	coordinator: &'a RefreshCoordinator,
	id: u64,
	rx: oneshot::Receiver<RefreshOutcome>,
	settled: bool,
}
impl WaiterTicket<'_> {
	/// Suspends until the leader finishes (or is dropped).
	pub async fn wait(mut self) -> RefreshOutcome {
		let outcome =
			(&mut self.rx).await.unwrap_or_else(|_| Err(Arc::new(Error::RefreshAbandoned)));

		self.settled = true;

		outcome
	}
}
impl Drop for WaiterTicket<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.forget(self.id);
		}
	}
}
