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

use std::time::Duration;

use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
	ClearQueuesResponse, HealthResponse, TrackMatchRequest, TrackMatchResponse, TrackingStatus,
};

/// Default request timeout for the tracker API
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Request rejected ({status}): {message}")]
	Rejected { status: u16, message: String },
}

impl ClientError {
	/// True when the tracker refused the lobby because it is already tracked
	pub fn is_already_tracked(&self) -> bool {
		matches!(self, ClientError::Rejected { status, .. } if *status == StatusCode::CONFLICT.as_u16())
	}
}

/// Client for the match tracker HTTP API
pub struct Client {
	base_url: String,
	client: ReqwestClient,
}

impl Client {
	/// Create a new client with the default timeout
	pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
		Self::with_timeout(base_url, DEFAULT_TIMEOUT)
	}

	/// Create a new client with a custom timeout
	pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
		})
	}

	/// Ask the tracker to follow a lobby until its match completes
	pub async fn track_match(
		&self,
		request: &TrackMatchRequest,
	) -> Result<TrackMatchResponse, ClientError> {
		let url = format!("{}/track_match", self.base_url);

		let response = self
			.client
			.post(&url)
			.json(request)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		Self::decode(response).await
	}

	/// Check whether a lobby is currently tracked
	pub async fn tracking_status(&self, lobby_id: i64) -> Result<TrackingStatus, ClientError> {
		let url = format!("{}/track_match/{}", self.base_url, lobby_id);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		Self::decode(response).await
	}

	/// Fetch the health report
	///
	/// An unhealthy tracker still answers 200 with `status = "unhealthy"`.
	pub async fn health(&self) -> Result<HealthResponse, ClientError> {
		let url = format!("{}/health", self.base_url);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		Self::decode(response).await
	}

	/// Drop every queued and tracked lobby
	pub async fn clear_queues(&self) -> Result<ClearQueuesResponse, ClientError> {
		let url = format!("{}/clear_queues", self.base_url);

		let response = self
			.client
			.delete(&url)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		Self::decode(response).await
	}

	async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ClientError::Rejected {
				status: status.as_u16(),
				message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
			});
		}

		response
			.json()
			.await
			.map_err(|e| ClientError::Serialization(format!("Failed to parse response: {}", e)))
	}
}

/// Pull the `error` (or `detail`) field out of a gateway error body, falling back to the raw text
fn error_message(body: &str) -> Option<String> {
	if body.is_empty() {
		return None;
	}
	match serde_json::from_str::<serde_json::Value>(body) {
		Ok(value) => value
			.get("error")
			.or_else(|| value.get("detail"))
			.and_then(|e| e.as_str())
			.map(str::to_string)
			.or_else(|| Some(body.to_string())),
		Err(_) => Some(body.to_string()),
	}
}
