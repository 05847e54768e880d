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

//! Admission of new lobbies into the tracker
//!
//! The front end's only way in. Requests are validated here, then the
//! tracking-set insert and the enqueue onto the unstarted queue happen as
//! one atomic store operation, so a lobby can never be queued twice.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
	store::{ClearCounts, QueueStore, StoreError},
	types::{LobbyId, ONGOING_QUEUE, TRACKED_SET, TrackedMatch, UNSTARTED_QUEUE},
};

#[derive(Debug, Error)]
pub enum AdmissionError {
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Lobby {0} is already being tracked")]
	AlreadyTracked(LobbyId),
	#[error("Not configured: {0}")]
	NotConfigured(String),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Current queue sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDepths {
	pub unstarted: usize,
	pub ongoing: usize,
}

/// Front-end facing operations on the tracker's queues
#[derive(Clone)]
pub struct Admission {
	store: Arc<dyn QueueStore>,
	api_key_configured: bool,
}

impl Admission {
	pub fn new(store: Arc<dyn QueueStore>, api_key_configured: bool) -> Self {
		Self {
			store,
			api_key_configured,
		}
	}

	/// Start tracking a lobby
	///
	/// Rejected when the lobby is already tracked; the existing entity is
	/// left untouched.
	pub async fn admit_tracking(
		&self,
		lobby_id: LobbyId,
		participant_ids: Vec<String>,
		webhook_started: Option<String>,
		webhook_completed: Option<String>,
	) -> Result<TrackedMatch, AdmissionError> {
		let participant_ids: Vec<String> = participant_ids
			.into_iter()
			.map(|p| p.trim().to_string())
			.filter(|p| !p.is_empty())
			.collect();
		if participant_ids.is_empty() {
			return Err(AdmissionError::InvalidRequest(
				"puuids must contain at least one participant".to_string(),
			));
		}
		let webhook_started = required_url(webhook_started, "matchStarted")?;
		let webhook_completed = required_url(webhook_completed, "matchCompleted")?;

		if !self.api_key_configured {
			return Err(AdmissionError::NotConfigured(
				"upstream API key is not set".to_string(),
			));
		}

		let entity = TrackedMatch::new(lobby_id, participant_ids, webhook_started, webhook_completed);
		let admitted = self
			.store
			.admit(UNSTARTED_QUEUE, TRACKED_SET, &lobby_id.to_string(), &entity)
			.await?;
		if !admitted {
			return Err(AdmissionError::AlreadyTracked(lobby_id));
		}

		info!(
			target: "engine",
			lobby_id,
			participants = entity.participant_ids.len(),
			"Lobby admitted"
		);
		Ok(entity)
	}

	pub async fn queue_depths(&self) -> Result<QueueDepths, AdmissionError> {
		Ok(QueueDepths {
			unstarted: self.store.length(UNSTARTED_QUEUE).await?,
			ongoing: self.store.length(ONGOING_QUEUE).await?,
		})
	}

	pub async fn is_tracked(&self, lobby_id: LobbyId) -> Result<bool, AdmissionError> {
		Ok(self
			.store
			.set_contains(TRACKED_SET, &lobby_id.to_string())
			.await?)
	}

	/// Drop every queued entity and forget every tracked lobby
	pub async fn clear_all(&self) -> Result<ClearCounts, AdmissionError> {
		let counts = self.store.clear_all().await?;
		info!(
			target: "engine",
			unstarted = counts.unstarted,
			ongoing = counts.ongoing,
			tracked = counts.tracked,
			"Queues cleared"
		);
		Ok(counts)
	}

	pub async fn ping(&self) -> Result<(), AdmissionError> {
		Ok(self.store.ping().await?)
	}
}

fn required_url(url: Option<String>, name: &str) -> Result<String, AdmissionError> {
	match url.map(|u| u.trim().to_string()) {
		Some(u) if !u.is_empty() => Ok(u),
		_ => Err(AdmissionError::InvalidRequest(format!(
			"webhooks.{} is required",
			name
		))),
	}
}
