#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
// self
use session_gateway::{
	config::GatewayConfig,
	error::Error,
	gateway::{Gateway, ReqwestGateway},
	request::ApiRequest,
	session::{SessionInvalidator, SessionState},
	url::Url,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Product {
	id: u32,
	name: String,
}

fn build_gateway(server: &MockServer) -> (ReqwestGateway, Arc<SessionState>) {
	let config =
		GatewayConfig::new(&server.base_url()).expect("Mock server base URL should validate.");

	build_gateway_with(config)
}

fn build_gateway_with(config: GatewayConfig) -> (ReqwestGateway, Arc<SessionState>) {
	let session = Arc::new(SessionState::signed_in());
	let invalidator: Arc<dyn SessionInvalidator> = session.clone();
	let gateway = Gateway::new(config)
		.expect("Reqwest gateway should build from the mock config.")
		.with_session(invalidator);

	(gateway, session)
}

#[tokio::test]
async fn successful_responses_pass_through() {
	let server = MockServer::start_async().await;
	let (gateway, _session) = build_gateway(&server);
	let products = server
		.mock_async(|when, then| {
			when.method(GET).path("/products/7");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":7,"name":"Canvas tote"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(204);
		})
		.await;
	let product: Product = gateway
		.send_json(ApiRequest::get("/products/7"))
		.await
		.expect("Product lookup should succeed.");

	assert_eq!(product, Product { id: 7, name: "Canvas tote".into() });

	products.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn login_failure_is_not_intercepted() {
	let server = MockServer::start_async().await;
	let (gateway, session) = build_gateway(&server);
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).body("invalid credentials");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(204);
		})
		.await;
	let err = gateway
		.post("/auth/login", &serde_json::json!({ "email": "a@example.com", "password": "x" }))
		.await
		.expect_err("Login 401s should propagate immediately.");

	match &err {
		Error::Http(http) => {
			assert_eq!(http.status.as_u16(), 401);
			assert_eq!(http.body_preview.as_deref(), Some("invalid credentials"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(session.logout_count(), 0);
}

#[tokio::test]
async fn second_unauthorized_after_refresh_propagates() {
	let server = MockServer::start_async().await;
	let (gateway, session) = build_gateway(&server);
	let orders = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/orders");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("set-cookie", "session=rotated; Path=/");
		})
		.await;
	let err = gateway.get("/user/orders").await.expect_err("The replayed 401 should surface.");

	assert!(err.is_unauthorized());

	orders.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(session.logout_count(), 0);
	assert_eq!(gateway.refresh_metrics.replays(), 1);
}

#[tokio::test]
async fn refresh_rejection_logs_out() {
	let server = MockServer::start_async().await;
	let (gateway, session) = build_gateway(&server);
	let wishlist = server
		.mock_async(|when, then| {
			when.method(GET).path("/wishlist/");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401);
		})
		.await;
	let err = gateway.get("/wishlist/").await.expect_err("Refresh rejection should surface.");

	assert!(matches!(err, Error::RefreshFailed(_)));
	assert_eq!(err.status().map(|status| status.as_u16()), Some(401));

	wishlist.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(session.logout_count(), 1);
	assert!(!session.is_authenticated());
}

#[tokio::test]
async fn skip_refresh_bypasses_interception() {
	let server = MockServer::start_async().await;
	let (gateway, _session) = build_gateway(&server);
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/profile").query_param("view", "full");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(204);
		})
		.await;
	let err = gateway
		.send(ApiRequest::get("/user/profile").with_query("view", "full").skip_refresh())
		.await
		.expect_err("Opted-out requests should surface the 401.");

	assert!(err.is_unauthorized());

	profile.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

async fn mock_cookie_rotation(
	server: &MockServer,
) -> (httpmock::Mock<'_>, httpmock::Mock<'_>, httpmock::Mock<'_>) {
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/orders").header_missing("cookie");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/orders").header("cookie", "session=rotated");
			then.status(200).body("ok");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(204).header("set-cookie", "session=rotated; Path=/");
		})
		.await;

	(rejected, accepted, refresh)
}

#[tokio::test]
async fn replay_carries_rotated_cookie() {
	let server = MockServer::start_async().await;
	let (rejected, accepted, refresh) = mock_cookie_rotation(&server).await;
	let (gateway, session) = build_gateway(&server);
	let response =
		gateway.get("/user/orders").await.expect("Replay should carry the rotated cookie.");

	assert_eq!(response.text(), "ok");

	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(session.logout_count(), 0);
}

#[tokio::test]
async fn replay_without_credentials_surfaces_second_unauthorized() {
	let server = MockServer::start_async().await;
	let (rejected, accepted, refresh) = mock_cookie_rotation(&server).await;
	let base_url = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");
	let config = GatewayConfig::builder(base_url)
		.with_credentials(false)
		.build()
		.expect("Config without credentials should validate.");
	let (gateway, session) = build_gateway_with(config);
	let err = gateway
		.get("/user/orders")
		.await
		.expect_err("Without a cookie store the replay should be rejected again.");

	assert!(err.is_unauthorized());

	rejected.assert_calls_async(2).await;
	accepted.assert_calls_async(0).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(session.logout_count(), 0);
}
