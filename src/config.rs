//! Gateway configuration: base URL, refresh endpoint, auth-bootstrap exclusions, and
//! transport defaults.
//!
//! [`GatewayConfig`] deserializes from any serde format and can also be assembled with
//! [`GatewayConfigBuilder`]. Both paths end in [`GatewayConfig::validate`], so a config that
//! reaches the gateway always has an HTTP(S) base URL, a rooted refresh path, and
//! well-formed default headers.

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated gateway settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base URL every relative request path is appended to.
	pub base_url: Url,
	/// Credential refresh endpoint, relative to the base URL.
	#[serde(default = "GatewayConfig::default_refresh_path")]
	pub refresh_path: String,
	/// Path fragments whose `401` responses are never intercepted.
	#[serde(default = "GatewayConfig::default_bootstrap_paths")]
	pub bootstrap_paths: Vec<String>,
	/// Attach and persist cookies across calls.
	#[serde(default = "GatewayConfig::default_with_credentials")]
	pub with_credentials: bool,
	/// Per-request timeout in milliseconds.
	#[serde(default)]
	pub timeout_ms: Option<u64>,
	/// Headers attached to every request.
	#[serde(default = "GatewayConfig::default_headers")]
	pub default_headers: BTreeMap<String, String>,
}
impl GatewayConfig {
	/// Default credential refresh endpoint.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default auth-bootstrap fragments (login, register, password-reset family).
	pub const DEFAULT_BOOTSTRAP_PATHS: [&'static str; 4] =
		["/auth/login", "/auth/register", "/auth/forget-password", "/auth/change-password"];

	/// Starts a builder for the provided base URL.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Parses the base URL and returns a config with default settings.
	pub fn new(base_url: &str) -> Result<Self, ConfigError> {
		let base_url = Url::parse(base_url)
			.map_err(|source| ConfigError::InvalidUrl { target: base_url.to_owned(), source })?;

		Self::builder(base_url).build()
	}

	/// Checks the invariants the gateway relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match self.base_url.scheme() {
			"http" | "https" => (),
			scheme => return Err(ConfigError::UnsupportedScheme { scheme: scheme.to_owned() }),
		}

		if !self.refresh_path.starts_with('/') {
			return Err(ConfigError::InvalidRefreshPath { path: self.refresh_path.clone() });
		}
		if self.bootstrap_paths.iter().any(|fragment| fragment.trim().is_empty()) {
			return Err(ConfigError::EmptyBootstrapPath);
		}

		self.header_map().map(|_| ())
	}

	/// Returns `true` when `path` targets an auth-bootstrap endpoint.
	pub fn is_bootstrap_path(&self, path: &str) -> bool {
		self.bootstrap_paths.iter().any(|fragment| path.contains(fragment.as_str()))
	}

	/// Returns the configured timeout.
	pub fn timeout(&self) -> Option<std::time::Duration> {
		self.timeout_ms.map(std::time::Duration::from_millis)
	}

	/// Converts [`GatewayConfig::default_headers`] into a typed header map.
	pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
		let mut headers = HeaderMap::with_capacity(self.default_headers.len());

		for (name, value) in &self.default_headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(header_name, header_value);
		}

		Ok(headers)
	}

	/// Resolves a request target against the base URL.
	///
	/// Relative paths are appended to the base URL (`base + path`) rather than resolved
	/// with RFC 3986 semantics, so a base of `https://api.example.com/v1` and a path of
	/// `/auth/refresh` yields `https://api.example.com/v1/auth/refresh`. Absolute
	/// `http(s)` targets pass through untouched.
	pub fn resolve(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let target = if is_absolute_url(path) {
			path.to_owned()
		} else {
			let base = self.base_url.as_str().trim_end_matches('/');
			let path = path.trim_start_matches('/');

			if path.is_empty() { base.to_owned() } else { format!("{base}/{path}") }
		};
		let mut url = Url::parse(&target)
			.map_err(|source| ConfigError::InvalidUrl { target: target.clone(), source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}

	fn default_refresh_path() -> String {
		Self::DEFAULT_REFRESH_PATH.into()
	}

	fn default_bootstrap_paths() -> Vec<String> {
		Self::DEFAULT_BOOTSTRAP_PATHS.iter().map(|path| (*path).to_owned()).collect()
	}

	fn default_with_credentials() -> bool {
		true
	}

	fn default_headers() -> BTreeMap<String, String> {
		BTreeMap::from([("content-type".to_owned(), "application/json".to_owned())])
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	config: GatewayConfig,
}
impl GatewayConfigBuilder {
	/// Creates a builder seeded with defaults for the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: GatewayConfig {
				base_url,
				refresh_path: GatewayConfig::default_refresh_path(),
				bootstrap_paths: GatewayConfig::default_bootstrap_paths(),
				with_credentials: GatewayConfig::default_with_credentials(),
				timeout_ms: None,
				default_headers: GatewayConfig::default_headers(),
			},
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Adds another auth-bootstrap fragment.
	pub fn bootstrap_path(mut self, fragment: impl Into<String>) -> Self {
		self.config.bootstrap_paths.push(fragment.into());

		self
	}

	/// Replaces the auth-bootstrap fragments.
	pub fn bootstrap_paths<I, S>(mut self, fragments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.bootstrap_paths = fragments.into_iter().map(Into::into).collect();

		self
	}

	/// Toggles cookie persistence.
	pub fn with_credentials(mut self, enabled: bool) -> Self {
		self.config.with_credentials = enabled;

		self
	}

	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
		self.config.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));

		self
	}

	/// Inserts (or replaces) a default header.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.default_headers.insert(name.into().to_ascii_lowercase(), value.into());

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn is_absolute_url(target: &str) -> bool {
	let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();

	lower.starts_with("http://") || lower.starts_with("https://")
}
