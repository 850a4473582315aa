//! Demonstrates plugging a custom transport and session collaborator into the gateway.
//!
//! 1. Implement [`HttpTransport`] so requests run against an in-memory shop API that rotates its
//!    session on `POST /auth/refresh`.
//! 2. Provide a [`TransportErrorMapper`] that turns the transport's own error type into the
//!    gateway's [`TransportError`].
//! 3. Implement [`SessionInvalidator`] to react when a refresh is rejected.
//! 4. Wrap the handles in `Arc` and pass them to [`Gateway::with_transport`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use color_eyre::Result;
// self
use session_gateway::{
	config::GatewayConfig,
	error::{Error, TransportError},
	gateway::Gateway,
	http::StatusCode,
	request::{ApiRequest, ApiResponse},
	session::SessionInvalidator,
	transport::{HttpTransport, TransportErrorMapper, TransportFuture},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = GatewayConfig::new("https://shop.example.com/api")?;
	let transport = Arc::new(InMemoryShop::default());
	let gateway: Gateway<InMemoryShop, InMemoryShopErrorMapper> =
		Gateway::with_transport(config.clone(), transport.clone(), InMemoryShopErrorMapper)?
			.with_session(Arc::new(PrintingSession));
	let (orders, wishlist) = tokio::join!(gateway.get("/user/orders"), gateway.get("/wishlist/"));

	println!("Orders after the shared refresh: {}.", orders?.text());
	println!("Wishlist after the shared refresh: {}.", wishlist?.text());
	println!(
		"Refresh attempts: {}, replays: {}.",
		gateway.refresh_metrics.attempts(),
		gateway.refresh_metrics.replays()
	);

	transport.expire();
	transport.revoke();

	match gateway.get("/user/addresses").await {
		Ok(_) => println!("Revoked session unexpectedly served the request."),
		Err(e) => println!("Refresh rejection surfaced to the caller: {e}."),
	}

	let offline: Gateway<InMemoryShop, InMemoryShopErrorMapper> = Gateway::with_transport(
		config,
		InMemoryShop::offline(),
		InMemoryShopErrorMapper,
	)?;

	match offline.send(ApiRequest::get("/products/7")).await {
		Ok(_) => println!("Offline shop unexpectedly answered."),
		Err(Error::Transport(e)) => println!("Transport error mapped by the gateway: {e}."),
		Err(e) => println!("Unexpected gateway error: {e}."),
	}

	Ok(())
}

#[derive(Debug)]
enum InMemoryShopError {
	Offline,
}
impl Display for InMemoryShopError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Offline => write!(f, "in-memory shop is offline"),
		}
	}
}
impl StdError for InMemoryShopError {}

#[derive(Default)]
struct InMemoryShop {
	signed_in: AtomicBool,
	revoked: AtomicBool,
	offline: bool,
}
impl InMemoryShop {
	fn offline() -> Self {
		Self { offline: true, ..Default::default() }
	}

	fn expire(&self) {
		self.signed_in.store(false, Ordering::SeqCst);
	}

	fn revoke(&self) {
		self.revoked.store(true, Ordering::SeqCst);
	}
}
impl HttpTransport for InMemoryShop {
	type TransportError = InMemoryShopError;

	fn execute<'a>(
		&'a self,
		url: Url,
		_request: &'a ApiRequest,
	) -> TransportFuture<'a, Self::TransportError> {
		Box::pin(async move {
			if self.offline {
				return Err(InMemoryShopError::Offline);
			}

			match url.path() {
				"/api/auth/refresh" if self.revoked.load(Ordering::SeqCst) =>
					Ok(ApiResponse::new(StatusCode::UNAUTHORIZED)),
				"/api/auth/refresh" => {
					self.signed_in.store(true, Ordering::SeqCst);

					Ok(ApiResponse::new(StatusCode::NO_CONTENT))
				},
				path if self.signed_in.load(Ordering::SeqCst) =>
					Ok(ApiResponse::new(StatusCode::OK).with_body(format!("served {path}"))),
				_ => Ok(ApiResponse::new(StatusCode::UNAUTHORIZED)),
			}
		})
	}
}

#[derive(Clone, Default)]
struct InMemoryShopErrorMapper;
impl TransportErrorMapper<InMemoryShopError> for InMemoryShopErrorMapper {
	fn map_transport_error(
		&self,
		_request: &ApiRequest,
		_url: &Url,
		error: InMemoryShopError,
	) -> Error {
		TransportError::network(error).into()
	}
}

struct PrintingSession;
impl SessionInvalidator for PrintingSession {
	fn logout(&self) {
		println!("Session invalidated; the user must sign in again.");
	}
}
