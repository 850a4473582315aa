//! Session invalidation contract invoked when credentials can no longer be refreshed.

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Collaborator that ends the local session (clears auth state, forces a sign-in).
///
/// The gateway calls [`SessionInvalidator::logout`] exactly once per terminal refresh
/// failure, from the request that owned the refresh. Implementations should return quickly;
/// the call happens before the refresh error reaches the caller.
pub trait SessionInvalidator
where
	Self: Send + Sync,
{
	/// Invalidates the current session.
	fn logout(&self);
}

/// Thread-safe in-process auth state.
#[derive(Debug, Default)]
pub struct SessionState {
	authenticated: AtomicBool,
	logouts: AtomicU64,
}
impl SessionState {
	/// Creates a state that starts signed in.
	pub fn signed_in() -> Self {
		let state = Self::default();

		state.sign_in();

		state
	}

	/// Marks the session as authenticated.
	pub fn sign_in(&self) {
		self.authenticated.store(true, Ordering::Release);
	}

	/// Returns `true` while the session is authenticated.
	pub fn is_authenticated(&self) -> bool {
		self.authenticated.load(Ordering::Acquire)
	}

	/// Returns how many times the session has been invalidated.
	pub fn logout_count(&self) -> u64 {
		self.logouts.load(Ordering::Relaxed)
	}
}
impl SessionInvalidator for SessionState {
	fn logout(&self) {
		self.authenticated.store(false, Ordering::Release);
		self.logouts.fetch_add(1, Ordering::Relaxed);
	}
}
