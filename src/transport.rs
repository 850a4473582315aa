//! Transport primitives for gateway requests.
//!
//! The module exposes [`HttpTransport`] and [`TransportErrorMapper`] so downstream crates can
//! plug in custom HTTP stacks (or scripted fakes in tests) without touching the refresh
//! machinery. Transports return every response they receive, including error statuses; the
//! gateway decides which statuses are failures and which `401`s trigger a refresh.

// crates.io
use http::header::RETRY_AFTER;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
	request::{ApiRequest, ApiResponse},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back many
/// gateway clones, and the futures they return must be `Send` so callers can spawn
/// `send` calls onto multi-threaded executors. Implementations must not interpret status
/// codes; a `401` is a successful transport round-trip.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request` against the already resolved `url`.
	fn execute<'a>(
		&'a self,
		url: Url,
		request: &'a ApiRequest,
	) -> TransportFuture<'a, Self::TransportError>;
}

/// Maps transport failures into gateway [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts a transport error raised while executing `request` against `url`.
	fn map_transport_error(&self, request: &ApiRequest, url: &Url, error: E) -> Error;
}

/// Mapper that treats every transport failure as a network error.
#[derive(Clone, Debug, Default)]
pub struct NetworkErrorMapper;
impl<E> TransportErrorMapper<E> for NetworkErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, _request: &ApiRequest, _url: &Url, error: E) -> Error {
		TransportError::network(error).into()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Build it with [`ReqwestTransport::from_config`] to get cookie persistence (credential
/// inclusion), the configured timeout, and default headers. Refreshed credentials are
/// expected to arrive as rotated cookies, so a custom client passed to
/// [`ReqwestTransport::with_client`] should enable its cookie store.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that honors the gateway configuration.
	pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.cookie_store(config.with_credentials)
			.default_headers(config.header_map()?);

		if let Some(timeout) = config.timeout() {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn execute<'a>(
		&'a self,
		url: Url,
		request: &'a ApiRequest,
	) -> TransportFuture<'a, Self::TransportError> {
		Box::pin(async move {
			let mut builder =
				self.0.request(request.method.clone(), url).headers(request.headers.clone());

			if let Some(body) = &request.body {
				builder = builder.body(body.clone());
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, request: &ApiRequest, url: &Url, err: ReqwestError) -> Error {
		if err.is_builder() {
			return ConfigError::from(err).into();
		}
		if err.is_timeout() {
			return TransportError::Timeout { method: request.method.clone(), url: url.clone() }
				.into();
		}

		TransportError::from(err).into()
	}
}

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
