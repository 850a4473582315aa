//! Transport-agnostic request and response values.
//!
//! [`ApiRequest`] carries everything the gateway needs to dispatch (and later replay) a call,
//! including the `skip_refresh` and `retried` flags that drive credential refresh handling.
//! [`ApiResponse`] is the buffered result handed back to callers.

// self
use crate::{_prelude::*, error::ConfigError, transport};

/// Outbound call descriptor.
///
/// `path` is joined onto the gateway's base URL unless it already is an absolute
/// `http(s)` URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL, or an absolute URL.
	pub path: String,
	/// Per-request headers, merged over the transport defaults.
	pub headers: HeaderMap,
	/// Query string pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
	/// Never attempt a credential refresh for this call.
	pub skip_refresh: bool,
	/// The call has already been replayed once after a refresh.
	pub retried: bool,
}
impl ApiRequest {
	/// Creates a request without headers, query, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			query: Vec::new(),
			body: None,
			skip_refresh: false,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Inserts (or replaces) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Appends a query string pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::JsonBody)?;

		self.headers
			.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Opts the call out of refresh handling.
	pub fn skip_refresh(self) -> Self {
		self.with_skip_refresh(true)
	}

	/// Overrides the `skip_refresh` flag.
	pub fn with_skip_refresh(mut self, skip_refresh: bool) -> Self {
		self.skip_refresh = skip_refresh;

		self
	}
}

/// Buffered HTTP response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// Status returned by the upstream.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates an empty response with the provided status.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Sets the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Inserts (or replaces) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status.as_u16() })
	}

	/// Parses the `Retry-After` header as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		transport::parse_retry_after(&self.headers)
	}
}
