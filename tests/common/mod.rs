//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Semaphore;
// self
use session_gateway::{
	config::GatewayConfig,
	gateway::{Gateway, RefreshCoordinator},
	http::{Method, StatusCode},
	request::{ApiRequest, ApiResponse},
	session::{SessionInvalidator, SessionState},
	transport::{HttpTransport, NetworkErrorMapper, TransportFuture},
	url::Url,
};

/// Base URL used by every scripted gateway.
pub const BASE_URL: &str = "https://shop.example.com";

/// Gateway type backed by the scripted transport.
pub type ScriptedGateway = Gateway<ScriptedTransport, NetworkErrorMapper>;

/// Request observed by the scripted transport.
#[derive(Clone, Debug)]
pub struct RecordedCall {
	pub method: Method,
	pub path: String,
	pub retried: bool,
	pub skip_refresh: bool,
}

/// Controls when the scripted refresh endpoint answers.
pub enum RefreshHold {
	/// Answer immediately.
	None,
	/// Answer once the coordinator has queued this many waiters.
	Waiters(Arc<RefreshCoordinator>, usize),
	/// Answer once a permit is added to the semaphore.
	Gate(Arc<Semaphore>),
}

/// In-process transport emulating a cookie-authenticated REST API.
///
/// Resources answer `401` until a refresh succeeds. `/server-error` always answers `500`
/// and `/unreachable` fails at the transport layer.
pub struct ScriptedTransport {
	calls: Mutex<Vec<RecordedCall>>,
	authorized: AtomicBool,
	refresh_status: StatusCode,
	reject_after_refresh: bool,
	hold: RefreshHold,
}
impl ScriptedTransport {
	pub fn new() -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			authorized: AtomicBool::new(false),
			refresh_status: StatusCode::NO_CONTENT,
			reject_after_refresh: false,
			hold: RefreshHold::None,
		}
	}

	pub fn refresh_status(mut self, status: StatusCode) -> Self {
		self.refresh_status = status;

		self
	}

	pub fn reject_after_refresh(mut self) -> Self {
		self.reject_after_refresh = true;

		self
	}

	pub fn hold(mut self, hold: RefreshHold) -> Self {
		self.hold = hold;

		self
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
		self.calls().into_iter().filter(|call| call.path == path).collect()
	}

	async fn wait_for_release(&self) {
		match &self.hold {
			RefreshHold::None => (),
			RefreshHold::Waiters(coordinator, count) => {
				while coordinator.pending_waiters() < *count {
					tokio::task::yield_now().await;
				}
			},
			RefreshHold::Gate(gate) => {
				let _permit = gate.acquire().await.expect("Refresh gate should stay open.");
			},
		}
	}
}
impl HttpTransport for ScriptedTransport {
	type TransportError = io::Error;

	fn execute<'a>(
		&'a self,
		url: Url,
		request: &'a ApiRequest,
	) -> TransportFuture<'a, Self::TransportError> {
		Box::pin(async move {
			let path = url.path().to_owned();

			self.calls.lock().push(RecordedCall {
				method: request.method.clone(),
				path: path.clone(),
				retried: request.retried,
				skip_refresh: request.skip_refresh,
			});

			match path.as_str() {
				"/auth/refresh" => {
					self.wait_for_release().await;

					if self.refresh_status.is_success() {
						self.authorized.store(true, Ordering::SeqCst);
					}

					Ok(ApiResponse::new(self.refresh_status))
				},
				"/server-error" => Ok(ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR)),
				"/unreachable" => Err(io::Error::other("connection refused")),
				_ if self.authorized.load(Ordering::SeqCst) && !self.reject_after_refresh =>
					Ok(ApiResponse::new(StatusCode::OK).with_body(format!("{{\"path\":\"{path}\"}}"))),
				_ => Ok(ApiResponse::new(StatusCode::UNAUTHORIZED)),
			}
		})
	}
}

/// Builds a gateway over `transport` with a signed-in session.
pub fn scripted_gateway(
	transport: Arc<ScriptedTransport>,
	coordinator: Arc<RefreshCoordinator>,
) -> (ScriptedGateway, Arc<SessionState>) {
	let config = GatewayConfig::new(BASE_URL).expect("Scripted config should validate.");
	let session = Arc::new(SessionState::signed_in());
	let invalidator: Arc<dyn SessionInvalidator> = session.clone();
	let gateway: ScriptedGateway = Gateway::with_transport(config, transport, NetworkErrorMapper)
		.expect("Scripted gateway should build.")
		.with_session(invalidator)
		.with_refresh_coordinator(coordinator);

	(gateway, session)
}
