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

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{EndProbe, MatchSource, StartProbe};
use crate::types::{MatchDetails, MatchRef};

const RIOT_TOKEN_HEADER: &str = "X-Riot-Token";
const MATCHES_PATH: [&str; 4] = ["lol", "match", "v5", "matches"];

#[derive(Debug, Error)]
pub enum RiotSourceError {
	#[error("Failed to build HTTP client: {0}")]
	Client(#[from] reqwest::Error),
	#[error("Invalid base URL {url}: {reason}")]
	InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct RiotSourceConfig {
	pub api_key: String,
	pub base_url: String,
	pub timeout: Duration,
}

/// Match source backed by the Riot match-v5 API
///
/// Start detection reads the newest match id for a PUUID; end detection
/// fetches the match record, which only exists once the game is over.
pub struct RiotMatchSource {
	client: Client,
	api_key: String,
	base_url: Url,
}

#[derive(Debug, Deserialize)]
struct MatchRecord {
	info: MatchInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchInfo {
	game_duration: Option<u64>,
	game_mode: Option<String>,
}

impl RiotMatchSource {
	pub fn new(config: RiotSourceConfig) -> Result<Self, RiotSourceError> {
		let invalid = |reason: String| RiotSourceError::InvalidBaseUrl {
			url: config.base_url.clone(),
			reason,
		};
		let mut base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
		if base_url.cannot_be_a_base() {
			return Err(invalid("not a hierarchical URL".to_string()));
		}
		base_url.set_query(None);
		base_url.set_fragment(None);

		let client = Client::builder().timeout(config.timeout).build()?;
		Ok(Self {
			client,
			api_key: config.api_key,
			base_url,
		})
	}

	/// Base URL extended with the match-v5 path; each segment is percent-encoded
	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(MATCHES_PATH).extend(segments);
		}
		url
	}

	fn ids_url(&self, puuid: &str) -> Url {
		let mut url = self.endpoint(&["by-puuid", puuid, "ids"]);
		url.query_pairs_mut()
			.append_pair("start", "0")
			.append_pair("count", "1");
		url
	}

	fn match_url(&self, match_id: &str) -> Url {
		self.endpoint(&[match_id])
	}
}

/// Map a by-puuid ids response to a start outcome
///
/// `ids` is `None` when a 200 body could not be decoded.
fn classify_start(status: StatusCode, ids: Option<Vec<String>>) -> StartProbe {
	match status {
		StatusCode::OK => match ids.map(|ids| ids.into_iter().next()) {
			Some(Some(id)) => StartProbe::Found(MatchRef::Canonical(id)),
			Some(None) => StartProbe::NotFound,
			None => StartProbe::TransientError("unreadable match id list".to_string()),
		},
		StatusCode::TOO_MANY_REQUESTS => StartProbe::TransientError("rate limited".to_string()),
		other => StartProbe::TransientError(format!("unexpected status {}", other)),
	}
}

/// Map a match record response to an end outcome
fn classify_end(status: StatusCode, record: Option<MatchRecord>) -> EndProbe {
	match status {
		StatusCode::OK => match record {
			Some(record) => EndProbe::Ended(MatchDetails {
				game_duration: record.info.game_duration,
				game_mode: record.info.game_mode,
			}),
			None => EndProbe::TransientError("unreadable match record".to_string()),
		},
		StatusCode::NOT_FOUND => EndProbe::StillOngoing,
		StatusCode::TOO_MANY_REQUESTS => EndProbe::TransientError("rate limited".to_string()),
		other => EndProbe::TransientError(format!("unexpected status {}", other)),
	}
}

#[async_trait]
impl MatchSource for RiotMatchSource {
	async fn probe_start(&self, participant_id: &str) -> StartProbe {
		let response = match self
			.client
			.get(self.ids_url(participant_id))
			.header(RIOT_TOKEN_HEADER, &self.api_key)
			.send()
			.await
		{
			Ok(response) => response,
			Err(e) => {
				warn!(target: "source", participant_id, "Start probe failed: {}", e);
				return StartProbe::TransientError(e.to_string());
			}
		};

		let status = response.status();
		let ids = if status == StatusCode::OK {
			response.json::<Vec<String>>().await.ok()
		} else {
			None
		};

		let outcome = classify_start(status, ids);
		debug!(target: "source", participant_id, ?outcome, "Start probe");
		outcome
	}

	async fn probe_end(&self, match_ref: &MatchRef) -> EndProbe {
		let response = match self
			.client
			.get(self.match_url(match_ref.id()))
			.header(RIOT_TOKEN_HEADER, &self.api_key)
			.send()
			.await
		{
			Ok(response) => response,
			Err(e) => {
				warn!(target: "source", match_ref = %match_ref, "End probe failed: {}", e);
				return EndProbe::TransientError(e.to_string());
			}
		};

		let status = response.status();
		let record = if status == StatusCode::OK {
			response.json::<MatchRecord>().await.ok()
		} else {
			None
		};

		let outcome = classify_end(status, record);
		debug!(target: "source", match_ref = %match_ref, ?outcome, "End probe");
		outcome
	}
}
