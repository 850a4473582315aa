//! Authenticated request gateway.
//!
//! [`Gateway::send`] dispatches a request and hands back 2xx responses unchanged. A `401`
//! on a request that is neither opted out (`skip_refresh`), nor aimed at an auth-bootstrap
//! path, nor already replayed joins the gateway's refresh burst: the first such request
//! issues the only `POST` to the refresh endpoint while the rest queue behind it. Once the
//! refresh succeeds every participant replays its request exactly once; if it fails every
//! participant fails with the same [`Error::RefreshFailed`] reason and the session is
//! invalidated once.

pub mod refresh;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	error::HttpError,
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{ApiRequest, ApiResponse},
	session::{SessionInvalidator, SessionState},
	transport::{HttpTransport, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::transport::{ReqwestTransport, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport stack.
pub type ReqwestGateway = Gateway<ReqwestTransport, ReqwestTransportErrorMapper>;

/// Issues requests against a base URL and coordinates credential refreshes.
///
/// Clones share the transport, session, metrics, and refresh state, so a refresh started
/// through one clone also serves requests failing on the others.
pub struct Gateway<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Transport used for every outbound request, refresh calls included.
	pub transport: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Validated configuration.
	pub config: Arc<GatewayConfig>,
	/// Collaborator invoked when a refresh fails.
	pub session: Arc<dyn SessionInvalidator>,
	/// Shared counters for refresh coordination.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh: Arc<RefreshCoordinator>,
}
impl<C, M> Gateway<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway over the caller-provided transport + mapper pair.
	///
	/// The session defaults to a fresh [`SessionState`]; replace it with
	/// [`Gateway::with_session`].
	pub fn with_transport(
		config: GatewayConfig,
		transport: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			transport: transport.into(),
			transport_mapper: mapper.into(),
			config: Arc::new(config),
			session: Arc::new(SessionState::default()),
			refresh_metrics: Default::default(),
			refresh: Default::default(),
		})
	}

	/// Replaces the session-invalidation collaborator.
	pub fn with_session(mut self, session: Arc<dyn SessionInvalidator>) -> Self {
		self.session = session;

		self
	}

	/// Shares an existing refresh coordinator (e.g. across gateways for the same API).
	pub fn with_refresh_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.refresh = coordinator;

		self
	}

	/// Returns the refresh coordinator backing this gateway.
	pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.refresh
	}

	/// Sends `request`, refreshing credentials and replaying it once on an eligible `401`.
	pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "send");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result: Result<ApiResponse> = span
			.instrument(async move {
				loop {
					let err = match self.dispatch(&request).await {
						Ok(response) => return Ok(response),
						Err(err) => err,
					};

					if !self.should_refresh(&request, &err) {
						return Err(err);
					}

					request.retried = true;

					self.refresh_credentials().await?;
					self.refresh_metrics.record_replay();
					obs::record_call_outcome(KIND, CallOutcome::Replayed);
					obs::call_event(KIND, "replaying request after credential refresh");
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Sends `request` and decodes the JSON response body.
	pub async fn send_json<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.send(request).await?.json()
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body.
	pub async fn patch<T>(&self, path: impl Into<String>, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::patch(path).with_json(body)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Executes one round-trip and classifies non-2xx statuses as [`HttpError`].
	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let url = self.config.resolve(&request.path, &request.query)?;
		let response = self
			.transport
			.execute(url.clone(), request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(request, &url, err))?;

		if response.is_success() {
			return Ok(response);
		}

		let retry_after = response.retry_after();

		Err(HttpError::new(request.method.clone(), url, response.status)
			.with_retry_after(retry_after)
			.with_body_preview(&response.body)
			.into())
	}

	fn should_refresh(&self, request: &ApiRequest, err: &Error) -> bool {
		err.is_unauthorized()
			&& !request.skip_refresh
			&& !request.retried
			&& !self.config.is_bootstrap_path(&request.path)
	}

	/// Joins (or starts) the refresh burst and resolves once credentials are renewed.
	async fn refresh_credentials(&self) -> Result<()> {
		const KIND: CallKind = CallKind::Refresh;

		let leader = match self.refresh.join() {
			RefreshTicket::Leader(leader) => leader,
			RefreshTicket::Waiter(waiter) => {
				self.refresh_metrics.record_queued();
				obs::record_call_outcome(CallKind::Request, CallOutcome::Queued);
				obs::call_event(KIND, "waiting for in-flight credential refresh");

				return waiter.wait().await.map_err(Error::RefreshFailed);
			},
		};
		let span = CallSpan::new(KIND, "refresh_credentials");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let request = ApiRequest::post(self.config.refresh_path.as_str()).skip_refresh();
		let outcome = span.instrument(self.dispatch(&request)).await.map(|_| ()).map_err(Arc::new);

		match &outcome {
			Ok(()) => {
				self.refresh_metrics.record_success();
				obs::record_call_outcome(KIND, CallOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_call_outcome(KIND, CallOutcome::Failure);
			},
		}

		obs::record_refresh_waiters(leader.finish(outcome.clone()));

		outcome.map_err(|err| {
			obs::call_event(KIND, "credential refresh failed; invalidating session");
			self.session.logout();

			Error::RefreshFailed(err)
		})
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport, ReqwestTransportErrorMapper> {
	/// Creates a gateway that provisions its own reqwest transport from `config`.
	pub fn new(config: GatewayConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Self::with_transport(config, transport, ReqwestTransportErrorMapper)
	}
}
impl<C, M> Clone for Gateway<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			transport_mapper: self.transport_mapper.clone(),
			config: self.config.clone(),
			session: self.session.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<C, M> Debug for Gateway<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_path", &self.config.refresh_path)
			.field("refreshing", &self.refresh.is_refreshing())
			.finish()
	}
}
