//! Gateway-level error types shared across transports, configuration, and refresh handling.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a non-success status.
	#[error(transparent)]
	Http(#[from] Box<HttpError>),

	/// Response body did not match the expected JSON shape.
	#[error("Response body could not be decoded (HTTP {status}).")]
	Decode {
		/// Structured parsing failure, including the failing JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the decoded response.
		status: u16,
	},
	/// The shared credential refresh failed; every request waiting on it receives the same reason.
	#[error("Credential refresh failed: {0}")]
	RefreshFailed(#[source] Arc<Error>),
	/// The request that owned the in-flight refresh was cancelled before it completed.
	#[error("Credential refresh was abandoned before completing.")]
	RefreshAbandoned,
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	///
	/// Refresh failures report the status of the refresh call itself.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Http(err) => Some(err.status),
			Self::RefreshFailed(inner) => inner.status(),
			_ => None,
		}
	}

	/// Returns `true` when the upstream answered `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Http(err) if err.status == StatusCode::UNAUTHORIZED)
	}
}
impl From<HttpError> for Error {
	fn from(e: HttpError) -> Self {
		Self::Http(Box::new(e))
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or request target cannot be parsed.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidUrl {
		/// Raw target that failed to parse.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https, found `{scheme}`.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Refresh path must be an absolute path on the base URL.
	#[error("Refresh path `{path}` must start with `/`.")]
	InvalidRefreshPath {
		/// Offending path.
		path: String,
	},
	/// Auth-bootstrap fragments cannot be empty.
	#[error("Auth-bootstrap path fragments cannot be empty.")]
	EmptyBootstrapPath,
	/// Default header name or value is malformed.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be encoded as JSON.")]
	JsonBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request {method} {url} timed out.")]
	Timeout {
		/// Method of the timed out request.
		method: Method,
		/// Resolved URL of the timed out request.
		url: Url,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Non-success HTTP response surfaced as an error.
#[derive(Clone, Debug, ThisError)]
#[error("Request {method} {url} failed with HTTP {status}.")]
pub struct HttpError {
	/// Method of the failing request.
	pub method: Method,
	/// Resolved URL of the failing request.
	pub url: Url,
	/// Status returned by the upstream.
	pub status: StatusCode,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
	/// Leading slice of the response body for diagnostics.
	pub body_preview: Option<String>,
}
impl HttpError {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an error for the given request/status pair.
	pub fn new(method: Method, url: Url, status: StatusCode) -> Self {
		Self { method, url, status, retry_after: None, body_preview: None }
	}

	/// Adds a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Adds a body preview, truncated on a character boundary.
	pub fn with_body_preview(mut self, body: &[u8]) -> Self {
		if body.is_empty() {
			return self;
		}

		let text = String::from_utf8_lossy(body);
		let preview = match text.char_indices().nth(Self::BODY_PREVIEW_LIMIT) {
			Some((idx, _)) => format!("{}…", &text[..idx]),
			None => text.into_owned(),
		};

		self.body_preview = Some(preview);

		self
	}
}
