mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use common::{Harness, harness};
use credential_relay::{
	http::{ApiRequest, Replayed, RequestTarget, StatusCode},
	session::Redirect,
	store::SessionStorage,
};

const RENEWAL_BODY: &str = r#"{"refreshToken":"refresh-1"}"#;

fn assert_signed_out(harness: &Harness) {
	assert!(harness.storage.get("accessToken").is_none());
	assert!(harness.storage.get("refreshToken").is_none());
	assert!(!harness.client.is_authenticated());
	assert_eq!(harness.visits(), ["/"]);
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_renewal() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings").header("authorization", "Bearer fresh");
			then.status(200).header("content-type", "application/json").body(r#"{"theme":"dark"}"#);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").body(RENEWAL_BODY);
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(300))
				.body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let (a, b) = tokio::join!(
		harness.client.send(ApiRequest::get("/settings")),
		harness.client.send(ApiRequest::get("/settings")),
	);

	for response in [a, b] {
		let response = response.expect("Replayed request should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.body().as_slice(), br#"{"theme":"dark"}"#);
		assert!(response.extensions().get::<Replayed>().is_some());
	}

	rejected.assert_calls_async(2).await;
	accepted.assert_calls_async(2).await;
	renewal.assert_calls_async(1).await;

	assert_eq!(harness.storage.get("accessToken").as_deref(), Some("fresh"));
	assert_eq!(harness.storage.get("refreshToken").as_deref(), Some("refresh-1"));
	assert!(harness.visits().is_empty());

	let metrics = harness.client.renewal_metrics();

	assert_eq!(metrics.exchanges(), 1);
	assert_eq!(metrics.joins(), 1);
	assert_eq!(metrics.successes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn renewal_is_shared_across_spawned_tasks() -> color_eyre::Result<()> {
	const TASKS: usize = 8;

	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer fresh");
			then.status(200);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").body(RENEWAL_BODY);
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(500))
				.body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let tasks = (0..TASKS)
		.map(|_| {
			let client = harness.client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/items")).await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let response = task.await??;

		assert!(response.extensions().get::<Replayed>().is_some());
	}

	rejected.assert_calls_async(TASKS).await;
	accepted.assert_calls_async(TASKS).await;
	renewal.assert_calls_async(1).await;

	assert_eq!(harness.client.renewal_metrics().exchanges(), 1);
	assert!(!harness.client.coordinator().is_renewing());
	assert!(harness.visits().is_empty());

	Ok(())
}

#[tokio::test]
async fn replayed_request_is_not_retried_again() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let settings = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings");
			then.status(401);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let err = harness
		.client
		.send(ApiRequest::get("/settings"))
		.await
		.expect_err("Second 401 should surface to the caller.");

	assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

	settings.assert_calls_async(2).await;
	renewal.assert_calls_async(1).await;

	// A 401 on the replay is handed back as is; the renewed session stays in place.
	assert_eq!(harness.storage.get("accessToken").as_deref(), Some("fresh"));
	assert!(harness.visits().is_empty());
}

#[tokio::test]
async fn forbidden_terminates_without_renewal() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let admin = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin");
			then.status(403);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("access-1", "refresh-1");
	harness.storage.set("__oauth_state", "pending".into());

	let err = harness
		.client
		.send(ApiRequest::get("/admin"))
		.await
		.expect_err("403 should surface to the caller.");

	assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

	admin.assert_calls_async(1).await;
	renewal.assert_calls_async(0).await;

	assert_signed_out(&harness);
	assert!(harness.storage.get("__oauth_state").is_none());
}

#[tokio::test]
async fn transport_failures_propagate_untouched() {
	let harness = harness("http://127.0.0.1:9");

	harness.client.login("access-1", "refresh-1");

	let err = harness
		.client
		.send(ApiRequest::get("/settings"))
		.await
		.expect_err("Unreachable hosts should fail.");

	assert!(err.is_transport());
	assert!(err.status().is_none());
	assert_eq!(harness.storage.get("accessToken").as_deref(), Some("access-1"));
	assert_eq!(harness.storage.get("refreshToken").as_deref(), Some("refresh-1"));
	assert!(harness.visits().is_empty());
	assert_eq!(harness.client.renewal_metrics().exchanges(), 0);
}

#[tokio::test]
async fn missing_refresh_credential_terminates_without_renewal() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let settings = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings");
			then.status(401);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "");

	let err = harness
		.client
		.send(ApiRequest::get("/settings"))
		.await
		.expect_err("401 without a refresh credential should surface.");

	assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

	settings.assert_calls_async(1).await;
	renewal.assert_calls_async(0).await;

	assert_signed_out(&harness);
}

#[tokio::test]
async fn rejected_renewal_terminates_and_skips_replay() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let settings = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings");
			then.status(401);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").body(RENEWAL_BODY);
			then.status(401);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let err = harness
		.client
		.send(ApiRequest::get("/settings"))
		.await
		.expect_err("Original 401 should surface after a rejected renewal.");

	// The caller sees the original failure, not the renewal's.
	assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
	assert_eq!(err.response().map(|r| r.extensions().get::<Replayed>().is_some()), Some(false));

	settings.assert_calls_async(1).await;
	renewal.assert_calls_async(1).await;

	assert_signed_out(&harness);
	assert_eq!(harness.client.renewal_metrics().failures(), 1);
}

#[tokio::test]
async fn unusable_renewal_response_terminates() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let settings = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings");
			then.status(401);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let err = harness
		.client
		.send(ApiRequest::get("/settings"))
		.await
		.expect_err("Missing accessToken should fail the request.");

	assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

	settings.assert_calls_async(1).await;
	renewal.assert_calls_async(1).await;

	assert_signed_out(&harness);

	let metrics = harness.client.renewal_metrics();

	assert_eq!(metrics.exchanges(), 1);
	assert_eq!(metrics.failures(), 1);
	assert_eq!(metrics.successes(), 0);
}

#[tokio::test]
async fn forbidden_during_renewal_keeps_the_session_ended() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let settings = server
		.mock_async(|when, then| {
			when.method(GET).path("/settings");
			then.status(401);
		})
		.await;
	let admin = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin");
			then.status(403);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(500))
				.body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let (a, b) = tokio::join!(harness.client.send(ApiRequest::get("/settings")), async {
		tokio::time::sleep(Duration::from_millis(100)).await;

		harness.client.send(ApiRequest::get("/admin")).await
	});

	assert_eq!(a.expect_err("A should keep its 401.").status(), Some(StatusCode::UNAUTHORIZED));
	assert_eq!(b.expect_err("B should keep its 403.").status(), Some(StatusCode::FORBIDDEN));

	settings.assert_calls_async(1).await;
	admin.assert_calls_async(1).await;
	renewal.assert_calls_async(1).await;

	// The renewal settled after teardown and must not have repopulated the access slot.
	assert_signed_out(&harness);
}

#[tokio::test]
async fn dropping_the_initiator_does_not_end_the_session() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/a");
			then.status(401);
		})
		.await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/b").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/b").header("authorization", "Bearer fresh");
			then.status(200);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").body(RENEWAL_BODY);
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(500))
				.body(r#"{"accessToken":"fresh"}"#);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let (a, b) = tokio::join!(
		tokio::time::timeout(
			Duration::from_millis(200),
			harness.client.send(ApiRequest::get("/a")),
		),
		async {
			tokio::time::sleep(Duration::from_millis(50)).await;

			harness.client.send(ApiRequest::get("/b")).await
		},
	);

	assert!(a.is_err(), "A should have timed out while the renewal was in flight.");

	let response = b.expect("B should be replayed with the renewed credential.");

	assert!(response.extensions().get::<Replayed>().is_some());

	first.assert_calls_async(1).await;
	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
	renewal.assert_calls_async(1).await;

	assert_eq!(harness.storage.get("accessToken").as_deref(), Some("fresh"));
	assert_eq!(harness.storage.get("refreshToken").as_deref(), Some("refresh-1"));
	assert!(harness.visits().is_empty());
}

#[tokio::test]
async fn renewal_tagged_request_failure_terminates() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").body(RENEWAL_BODY);
			then.status(401);
		})
		.await;

	harness.client.login("stale", "refresh-1");

	let request = ApiRequest::post("/auth/refresh")
		.targeting(RequestTarget::RenewalAuthority)
		.body(RENEWAL_BODY.as_bytes().to_vec());
	let err = harness
		.client
		.send(request)
		.await
		.expect_err("A rejected renewal call should surface.");

	assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

	renewal.assert_calls_async(1).await;

	assert_signed_out(&harness);
	assert_eq!(harness.client.renewal_metrics().exchanges(), 0);
}

#[tokio::test]
async fn other_failures_pass_through() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/missing");
			then.status(404);
		})
		.await;

	harness.client.login("access-1", "refresh-1");

	let err = harness
		.client
		.send(ApiRequest::get("/missing"))
		.await
		.expect_err("404 should surface to the caller.");

	assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

	missing.assert_calls_async(1).await;

	assert!(harness.client.is_authenticated());
	assert!(harness.visits().is_empty());
}

#[tokio::test]
async fn anonymous_requests_carry_no_credential() {
	let server = MockServer::start_async().await;
	let harness = harness(&server.base_url());
	let public = server
		.mock_async(|when, then| {
			when.method(GET).path("/public").header_missing("authorization");
			then.status(200);
		})
		.await;

	harness.client.send(ApiRequest::get("/public")).await.expect("Anonymous GET should succeed.");

	public.assert_calls_async(1).await;
}

#[tokio::test]
async fn logout_honors_redirect_overrides() {
	let harness = harness("https://api.example.com");

	harness.client.login("access-1", "refresh-1");

	assert!(harness.client.logout(Redirect::To("/goodbye".into())));
	assert!(!harness.client.logout(Redirect::Default));
	assert!(!harness.client.is_authenticated());
	assert_eq!(harness.visits(), ["/goodbye"]);
}
