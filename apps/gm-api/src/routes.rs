use axum::{
	Json, Router,
	extract::{Path, Request, State},
	http::{HeaderMap, HeaderValue, StatusCode, header},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use gm_service::{
	BatchReport, ConnectRequest, ConnectionItem, ConnectionResponse, DisconnectResponse,
	DismissResponse, Error as ServiceError, PotentialMatchesResponse, ProfileResponse,
	ProfileUpdate, RecomputeReport, RegisterRequest, RegisterResponse, StatusRefreshReport,
	StatusResponse,
};

/// Identifies the calling organization. Authentication upstream of this service is expected to
/// set it.
pub const HEADER_ORG_ID: &str = "x-gm-org-id";
const HEADER_AUTHORIZATION: &str = "authorization";
const RETRY_AFTER_SECONDS: &str = "1";

#[derive(Clone, Copy)]
enum TokenScope {
	Api,
	Admin,
}

#[derive(Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ConnectionsResponse {
	connections: Vec<ConnectionItem>,
}

pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
	retryable: bool,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self {
			status,
			error_code: error_code.into(),
			message: message.into(),
			fields,
			retryable: false,
		}
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let retryable = err.is_retryable();
		let mapped = match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage failure while serving request.");

				json_error(
					StatusCode::SERVICE_UNAVAILABLE,
					"STORAGE_UNAVAILABLE",
					"Storage is temporarily unavailable. Retry the request.",
					None,
				)
			},
		};

		ApiError { retryable, ..mapped }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let retryable = self.retryable;
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };
		let mut response = (self.status, Json(body)).into_response();

		if retryable {
			response
				.headers_mut()
				.insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
		}

		response
	}
}

pub fn router(state: AppState) -> Router {
	let v1 = Router::new()
		.route("/v1/organizations", post(register_organization))
		.route("/v1/me/profile", get(get_profile).put(put_profile))
		.route("/v1/me/status", get(get_status))
		.route("/v1/potential-matches", get(potential_matches))
		.route("/v1/potential-matches/recalculate", post(recalculate))
		.route("/v1/matches/dismiss/{candidate_id}", delete(dismiss))
		.route("/v1/connections", get(list_connections).post(connect))
		.route("/v1/connections/{org_id}", delete(disconnect))
		.route_layer(middleware::from_fn_with_state(state.clone(), api_auth_middleware));

	Router::new().route("/health", get(health)).merge(v1).with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/recompute-all", post(recompute_all))
		.route("/v1/admin/refresh-statuses", post(refresh_statuses))
		.route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn api_auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
	check_token(&state, TokenScope::Api, req, next).await
}

async fn admin_auth_middleware(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Response {
	check_token(&state, TokenScope::Admin, req, next).await
}

async fn check_token(state: &AppState, scope: TokenScope, req: Request, next: Next) -> Response {
	let security = &state.service.cfg.security;
	let expected = match scope {
		TokenScope::Api => security.api_auth_token.as_deref(),
		TokenScope::Admin => security.admin_auth_token.as_deref(),
	};

	if is_authorized(req.headers(), expected) {
		return next.run(req).await;
	}

	json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "A valid Bearer token is required.", None)
		.into_response()
}

async fn register_organization(
	State(state): State<AppState>,
	Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
	let response = state.service.register_organization(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn get_profile(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
	let org_id = require_subject(&headers)?;
	let response = state.service.get_profile(org_id).await?;

	Ok(Json(response))
}

async fn put_profile(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
	let org_id = require_subject(&headers)?;
	let response = state.service.put_profile(org_id, payload).await?;

	Ok(Json(response))
}

async fn get_status(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
	let org_id = require_subject(&headers)?;
	let response = state.service.status(org_id).await?;

	Ok(Json(response))
}

async fn potential_matches(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<PotentialMatchesResponse>, ApiError> {
	let subject_id = require_subject(&headers)?;
	let response = state.service.potential_matches(subject_id).await?;

	Ok(Json(response))
}

async fn recalculate(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<RecomputeReport>, ApiError> {
	let subject_id = require_subject(&headers)?;
	let response = state.service.recompute(subject_id).await?;

	Ok(Json(response))
}

async fn dismiss(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(candidate_id): Path<Uuid>,
) -> Result<Json<DismissResponse>, ApiError> {
	let subject_id = require_subject(&headers)?;
	let response = state.service.dismiss(subject_id, candidate_id).await?;

	Ok(Json(response))
}

async fn list_connections(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ConnectionsResponse>, ApiError> {
	let subject_id = require_subject(&headers)?;
	let connections = state.service.list_connections(subject_id).await?;

	Ok(Json(ConnectionsResponse { connections }))
}

async fn connect(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ConnectRequest>,
) -> Result<(StatusCode, Json<ConnectionResponse>), ApiError> {
	let subject_id = require_subject(&headers)?;
	let response = state.service.connect(subject_id, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn disconnect(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(org_id): Path<Uuid>,
) -> Result<Json<DisconnectResponse>, ApiError> {
	let subject_id = require_subject(&headers)?;
	let response = state.service.disconnect(subject_id, org_id).await?;

	Ok(Json(response))
}

async fn recompute_all(State(state): State<AppState>) -> Result<Json<BatchReport>, ApiError> {
	let response = state.service.recompute_all().await?;

	Ok(Json(response))
}

async fn refresh_statuses(
	State(state): State<AppState>,
) -> Result<Json<StatusRefreshReport>, ApiError> {
	let response = state.service.refresh_statuses().await?;

	Ok(Json(response))
}

fn require_subject(headers: &HeaderMap) -> Result<Uuid, ApiError> {
	let Some(raw) = headers.get(HEADER_ORG_ID) else {
		return Err(json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			format!("{HEADER_ORG_ID} header is required."),
			None,
		));
	};
	let parsed = raw.to_str().ok().and_then(|value| Uuid::parse_str(value.trim()).ok());

	parsed.ok_or_else(|| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("{HEADER_ORG_ID} must be a UUID."),
			Some(vec![HEADER_ORG_ID.to_string()]),
		)
	})
}

fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
	match expected {
		None => true,
		Some(expected) => read_bearer_token(headers).is_some_and(|token| token == expected),
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(HEADER_AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}
