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

use serde::{Deserialize, Serialize};

/// Webhook destinations supplied with a tracking request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookUrls {
	/// Called once when the match is first detected as started
	#[serde(default)]
	pub match_started: Option<String>,
	/// Called when the match has ended (retried until delivered)
	#[serde(default)]
	pub match_completed: Option<String>,
}

/// Request to start tracking a lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMatchRequest {
	/// Caller-assigned lobby identifier
	pub lobby_id: i64,
	/// Participant identifiers (Riot PUUIDs), probed in order
	#[serde(default)]
	pub puuids: Vec<String>,
	/// Lifecycle webhook destinations
	#[serde(default)]
	pub webhooks: WebhookUrls,
}

/// Response to an accepted tracking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMatchResponse {
	pub status: String,
	pub message: String,
}

/// Membership answer for a single lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatus {
	pub lobby_id: i64,
	pub tracked: bool,
}

/// Health report including queue depths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub store_connected: bool,
	/// Same as `store_connected`; kept for consumers of the redis-only service
	#[serde(default)]
	pub redis_connected: bool,
	pub unstarted_count: usize,
	pub ongoing_count: usize,
}

/// Service banner served at the root path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
	pub service: String,
	pub version: String,
	pub status: String,
}

/// Result of the administrative queue wipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearQueuesResponse {
	pub message: String,
	pub unstarted_cleared: usize,
	pub ongoing_cleared: usize,
	pub tracked_cleared: usize,
}

/// Body POSTed to both lifecycle webhooks
///
/// The field names are a wire contract with the webhook consumers and
/// must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchWebhook {
	pub lobby_id: i64,
	pub riot_match_id: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_webhook_wire_shape() {
		let payload = MatchWebhook {
			lobby_id: 42,
			riot_match_id: "EUN1_123".to_string(),
		};
		let value = serde_json::to_value(&payload).unwrap();
		assert_eq!(
			value,
			serde_json::json!({ "lobbyId": 42, "riotMatchId": "EUN1_123" })
		);
	}

	#[test]
	fn test_track_request_accepts_missing_webhook() {
		let body = r#"{"lobbyId": 7, "puuids": ["a"], "webhooks": {"matchStarted": "http://x/s"}}"#;
		let request: TrackMatchRequest = serde_json::from_str(body).unwrap();
		assert_eq!(request.lobby_id, 7);
		assert_eq!(request.webhooks.match_started.as_deref(), Some("http://x/s"));
		assert!(request.webhooks.match_completed.is_none());
	}
}
