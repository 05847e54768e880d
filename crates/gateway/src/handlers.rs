// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use actix_web::{
	HttpResponse, ResponseError,
	http::StatusCode,
	web,
};
use thiserror::Error;
use tracing::{error, warn};
use tracker_engine::{AdmissionError, QueueDepths};
use tracker_sdk::types::{
	ClearQueuesResponse, HealthResponse, ServiceInfo, TrackMatchRequest, TrackMatchResponse,
	TrackingStatus,
};

use crate::{config::SERVICE_NAME, server::GatewayState};

/// Error types for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
	#[error("Invalid request body: {0}")]
	BadRequest(String),
	#[error(transparent)]
	Admission(#[from] AdmissionError),
}

impl ResponseError for GatewayError {
	fn status_code(&self) -> StatusCode {
		match self {
			GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
			GatewayError::Admission(AdmissionError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
			GatewayError::Admission(AdmissionError::AlreadyTracked(_)) => StatusCode::CONFLICT,
			GatewayError::Admission(AdmissionError::NotConfigured(_)) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
			GatewayError::Admission(AdmissionError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
		}
	}

	/// Body carries the message as both `error` and `detail`
	fn error_response(&self) -> HttpResponse {
		let message = self.to_string();
		HttpResponse::build(self.status_code()).json(serde_json::json!({
			"error": message,
			"detail": message,
		}))
	}
}

/// Service banner
pub async fn root() -> HttpResponse {
	HttpResponse::Ok().json(ServiceInfo {
		service: SERVICE_NAME.to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		status: "running".to_string(),
	})
}

/// Health check endpoint
///
/// Always answers 200; an unreachable store is reported in the body with
/// zero queue counts.
pub async fn health(state: web::Data<GatewayState>) -> HttpResponse {
	let depths = match state.admission.ping().await {
		Ok(()) => state.admission.queue_depths().await.map_err(|e| {
			warn!(target: "server", "Failed to read queue depths: {}", e);
		}),
		Err(e) => {
			warn!(target: "server", "Store ping failed: {}", e);
			Err(())
		}
	};

	let store_connected = depths.is_ok();
	let status = if store_connected { "healthy" } else { "unhealthy" };
	let QueueDepths { unstarted, ongoing } = depths.unwrap_or_default();

	HttpResponse::Ok().json(HealthResponse {
		status: status.to_string(),
		store_connected,
		redis_connected: store_connected,
		unstarted_count: unstarted,
		ongoing_count: ongoing,
	})
}

/// Start tracking a lobby
pub async fn track_match(
	state: web::Data<GatewayState>,
	request: web::Json<TrackMatchRequest>,
) -> Result<HttpResponse, GatewayError> {
	let TrackMatchRequest {
		lobby_id,
		puuids,
		webhooks,
	} = request.into_inner();

	state
		.admission
		.admit_tracking(
			lobby_id,
			puuids,
			webhooks.match_started,
			webhooks.match_completed,
		)
		.await
		.inspect_err(|e| {
			if let AdmissionError::Store(_) | AdmissionError::NotConfigured(_) = e {
				error!(target: "server", lobby_id, "Admission failed: {}", e);
			}
		})?;

	Ok(HttpResponse::Ok().json(TrackMatchResponse {
		status: "queued".to_string(),
		message: format!("Match tracking queued for lobby {}", lobby_id),
	}))
}

/// Report whether a lobby is currently tracked
pub async fn tracking_status(
	state: web::Data<GatewayState>,
	path: web::Path<i64>,
) -> Result<HttpResponse, GatewayError> {
	let lobby_id = path.into_inner();
	let tracked = state.admission.is_tracked(lobby_id).await?;

	Ok(HttpResponse::Ok().json(TrackingStatus { lobby_id, tracked }))
}

/// Drop every queued entity and tracked lobby
pub async fn clear_queues(state: web::Data<GatewayState>) -> Result<HttpResponse, GatewayError> {
	let counts = state.admission.clear_all().await?;

	Ok(HttpResponse::Ok().json(ClearQueuesResponse {
		message: "Queues cleared".to_string(),
		unstarted_cleared: counts.unstarted,
		ongoing_cleared: counts.ongoing,
		tracked_cleared: counts.tracked,
	}))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use actix_web::{App, test};
	use serde_json::{Value, json};
	use tracker_engine::{Admission, MemoryQueueStore};

	use super::*;
	use crate::{routes::configure_routes, server::json_config};

	fn state(api_key_configured: bool) -> web::Data<GatewayState> {
		let store = Arc::new(MemoryQueueStore::new());
		web::Data::new(GatewayState {
			admission: Admission::new(store, api_key_configured),
		})
	}

	fn track_body(lobby_id: i64) -> Value {
		json!({
			"lobbyId": lobby_id,
			"puuids": ["puuid-a", "puuid-b"],
			"webhooks": {
				"matchStarted": "http://backend/started",
				"matchCompleted": "http://backend/completed"
			}
		})
	}

	macro_rules! app {
		($state:expr) => {
			test::init_service(
				App::new()
					.app_data($state.clone())
					.app_data(json_config(64 * 1024))
					.configure(configure_routes),
			)
			.await
		};
	}

	#[actix_web::test]
	async fn test_root_banner() {
		let state = state(true);
		let app = app!(state);

		let req = test::TestRequest::get().uri("/").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["service"], "match-tracker");
		assert_eq!(body["status"], "running");
	}

	#[actix_web::test]
	async fn test_track_then_status_then_conflict() {
		let state = state(true);
		let app = app!(state);

		let req = test::TestRequest::post()
			.uri("/track_match")
			.set_json(track_body(42))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::OK);
		let body: Value = test::read_body_json(resp).await;
		assert_eq!(body["status"], "queued");

		let req = test::TestRequest::get().uri("/track_match/42").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body, json!({"lobbyId": 42, "tracked": true}));

		let req = test::TestRequest::post()
			.uri("/track_match")
			.set_json(track_body(42))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);
		let body: Value = test::read_body_json(resp).await;
		assert!(body["error"].as_str().unwrap().contains("42"));
		assert_eq!(body["detail"], body["error"]);

		let req = test::TestRequest::get().uri("/health").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(
			body,
			json!({
				"status": "healthy",
				"store_connected": true,
				"redis_connected": true,
				"unstarted_count": 1,
				"ongoing_count": 0
			})
		);
	}

	#[actix_web::test]
	async fn test_rejects_missing_fields() {
		let state = state(true);
		let app = app!(state);

		let bodies = [
			json!({"lobbyId": 1, "webhooks": {"matchStarted": "http://s", "matchCompleted": "http://c"}}),
			json!({"lobbyId": 1, "puuids": [], "webhooks": {"matchStarted": "http://s", "matchCompleted": "http://c"}}),
			json!({"lobbyId": 1, "puuids": ["a"]}),
			json!({"lobbyId": 1, "puuids": ["a"], "webhooks": {"matchStarted": "http://s"}}),
			json!({"puuids": ["a"], "webhooks": {"matchStarted": "http://s", "matchCompleted": "http://c"}}),
		];
		for body in bodies {
			let req = test::TestRequest::post()
				.uri("/track_match")
				.set_json(&body)
				.to_request();
			let resp = test::call_service(&app, req).await;
			assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
			let err: Value = test::read_body_json(resp).await;
			assert!(err["error"].is_string());
			assert!(err["detail"].is_string());
		}

		let req = test::TestRequest::get().uri("/track_match/1").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["tracked"], false);
	}

	#[actix_web::test]
	async fn test_missing_api_key_is_server_error() {
		let state = state(false);
		let app = app!(state);

		let req = test::TestRequest::post()
			.uri("/track_match")
			.set_json(track_body(9))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
		let err: Value = test::read_body_json(resp).await;
		assert!(err["detail"].as_str().unwrap().contains("API key is not set"));
	}

	#[actix_web::test]
	async fn test_clear_queues() {
		let state = state(true);
		let app = app!(state);

		for lobby_id in [1, 2] {
			let req = test::TestRequest::post()
				.uri("/track_match")
				.set_json(track_body(lobby_id))
				.to_request();
			test::call_service(&app, req).await;
		}

		let req = test::TestRequest::delete().uri("/clear_queues").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(
			body,
			json!({
				"message": "Queues cleared",
				"unstarted_cleared": 2,
				"ongoing_cleared": 0,
				"tracked_cleared": 2
			})
		);

		let req = test::TestRequest::get().uri("/track_match/1").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["tracked"], false);
	}
}
