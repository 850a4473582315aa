// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_gateway_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how many queued requests a finished refresh burst released.
pub fn record_refresh_waiters(released: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("session_gateway_refresh_waiters").record(released as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = released;
	}
}
