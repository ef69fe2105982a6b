use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

use gm_api::{
	routes::{self, HEADER_ORG_ID},
	state::AppState,
};
use gm_config::{Config, Matching, Postgres, Security, Service, Storage, Worker};
use gm_testkit::TestDatabase;

fn test_config(dsn: &str, api_auth_token: Option<&str>) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage { postgres: Postgres { dsn: dsn.to_string(), pool_max_conns: 2 } },
		matching: Matching::default(),
		worker: Worker::default(),
		security: Security {
			bind_localhost_only: true,
			api_auth_token: api_auth_token.map(str::to_string),
			admin_auth_token: None,
		},
	}
}

async fn test_env() -> Option<TestDatabase> {
	let Some(base_dsn) = gm_testkit::env_dsn() else {
		eprintln!("Skipping HTTP tests; set GM_PG_DSN to run this test.");

		return None;
	};

	Some(TestDatabase::new(&base_dsn).await.expect("Failed to create test database."))
}

async fn send(
	app: &Router,
	method: &str,
	uri: &str,
	org_id: Option<Uuid>,
	body: Option<Value>,
) -> (StatusCode, Value) {
	let mut builder = Request::builder().method(method).uri(uri);

	if let Some(org_id) = org_id {
		builder = builder.header(HEADER_ORG_ID, org_id.to_string());
	}

	let request = match body {
		Some(body) => builder
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.expect("Failed to build request."),
		None => builder.body(Body::empty()).expect("Failed to build request."),
	};
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let value = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Failed to parse response body.")
	};

	(status, value)
}

async fn register(app: &Router, role: &str, name: &str) -> Uuid {
	let (status, body) = send(
		app,
		"POST",
		"/v1/organizations",
		None,
		Some(json!({ "role": role, "organization_name": name })),
	)
	.await;

	assert_eq!(status, StatusCode::CREATED);

	body["org_id"].as_str().and_then(|raw| Uuid::parse_str(raw).ok()).expect("Missing org_id.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn health_ok() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let state = AppState::new(test_config(test_db.dsn(), None))
		.await
		.expect("Failed to initialize app state.");
	let app = routes::router(state.clone());
	let _ = routes::admin_router(state);
	let (status, _) = send(&app, "GET", "/health", None, None).await;

	assert_eq!(status, StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn requests_without_subject_or_token_are_rejected() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let state = AppState::new(test_config(test_db.dsn(), Some("secret")))
		.await
		.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let (status, body) = send(&app, "GET", "/v1/potential-matches", None, None).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error_code"], "UNAUTHORIZED");

	let request = Request::builder()
		.uri("/v1/potential-matches")
		.header("authorization", "Bearer secret")
		.body(Body::empty())
		.expect("Failed to build request.");
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let request = Request::builder()
		.uri("/v1/potential-matches")
		.header("authorization", "Bearer secret")
		.header(HEADER_ORG_ID, "not-a-uuid")
		.body(Body::empty())
		.expect("Failed to build request.");
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn potential_matches_flow_over_http() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let state = AppState::new(test_config(test_db.dsn(), None))
		.await
		.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let provider = register(&app, "provider", "Lighthouse Fund").await;
	let recipient = register(&app, "recipient", "Eugene Youth Learning").await;
	let (status, body) = send(
		&app,
		"PUT",
		"/v1/me/profile",
		Some(provider),
		Some(json!({
			"sectors": ["Education"],
			"target_groups": ["Youth"],
			"provider": {
				"funding_type": "seed",
				"amount_offered": 50000.0,
				"deadline": "2099-01-01T00:00:00Z"
			}
		})),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "active");

	let (status, body) = send(
		&app,
		"PUT",
		"/v1/me/profile",
		Some(recipient),
		Some(json!({
			"sectors": ["Education"],
			"target_groups": ["Youth"],
			"state": "OR",
			"city": "Eugene",
			"zip_code": "97401",
			"recipient": { "budget_requested": 40000.0, "timeline": "short_term" }
		})),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "active");

	let (status, body) = send(&app, "GET", "/v1/potential-matches", Some(recipient), None).await;

	assert_eq!(status, StatusCode::OK);

	let candidates = body["candidates"].as_array().expect("Missing candidates.");

	assert_eq!(candidates.len(), 1);
	assert_eq!(candidates[0]["candidate_id"], provider.to_string());

	let (status, _) = send(
		&app,
		"DELETE",
		&format!("/v1/matches/dismiss/{provider}"),
		Some(recipient),
		None,
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let (_, body) = send(&app, "GET", "/v1/potential-matches", Some(recipient), None).await;

	assert!(body["candidates"].as_array().expect("Missing candidates.").is_empty());

	let (status, body) = send(
		&app,
		"DELETE",
		&format!("/v1/matches/dismiss/{}", Uuid::new_v4()),
		Some(recipient),
		None,
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error_code"], "NOT_FOUND");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn connections_round_trip_over_http() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let state = AppState::new(test_config(test_db.dsn(), None))
		.await
		.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let provider = register(&app, "provider", "Lighthouse Fund").await;
	let recipient = register(&app, "recipient", "Eugene Youth Learning").await;
	let (status, _) = send(
		&app,
		"POST",
		"/v1/connections",
		Some(recipient),
		Some(json!({ "target_id": provider })),
	)
	.await;

	assert_eq!(status, StatusCode::CREATED);

	let (status, body) = send(
		&app,
		"POST",
		"/v1/connections",
		Some(provider),
		Some(json!({ "target_id": recipient })),
	)
	.await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["error_code"], "CONFLICT");

	let (_, body) = send(&app, "GET", "/v1/connections", Some(provider), None).await;
	let connections = body["connections"].as_array().expect("Missing connections.");

	assert_eq!(connections.len(), 1);
	assert_eq!(connections[0]["direction"], "received");

	let (status, _) =
		send(&app, "DELETE", &format!("/v1/connections/{recipient}"), Some(provider), None)
			.await;

	assert_eq!(status, StatusCode::OK);

	let (status, _) =
		send(&app, "DELETE", &format!("/v1/connections/{recipient}"), Some(provider), None)
			.await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
