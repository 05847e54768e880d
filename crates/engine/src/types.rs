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

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_sdk::types::MatchWebhook;

/// Caller-assigned lobby identifier, unique while tracked
pub type LobbyId = i64;

/// Reference to an upstream match
///
/// A provisional reference comes from a live-observation source and may be
/// superseded by the canonical post-game identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MatchRef {
	Provisional(String),
	Canonical(String),
}

impl MatchRef {
	pub fn id(&self) -> &str {
		match self {
			MatchRef::Provisional(id) | MatchRef::Canonical(id) => id,
		}
	}

	pub fn is_canonical(&self) -> bool {
		matches!(self, MatchRef::Canonical(_))
	}
}

impl fmt::Display for MatchRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id())
	}
}

/// Lifecycle phase, implied by the queue that holds the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	Unstarted,
	Ongoing,
}

impl Phase {
	/// Queue key holding entities in this phase
	pub fn queue(&self) -> &'static str {
		match self {
			Phase::Unstarted => UNSTARTED_QUEUE,
			Phase::Ongoing => ONGOING_QUEUE,
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Phase::Unstarted => f.write_str("unstarted"),
			Phase::Ongoing => f.write_str("ongoing"),
		}
	}
}

pub const UNSTARTED_QUEUE: &str = "queue:unstarted";
pub const ONGOING_QUEUE: &str = "queue:ongoing";
pub const TRACKED_SET: &str = "set:tracked_lobbies";
/// Payloads that could not be decoded after leaving a queue
pub const DEAD_LETTER_QUEUE: &str = "queue:dead_letter";

/// Errors raised when an entity is asked to make an illegal move
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
	#[error("Lobby {0} has already started")]
	AlreadyStarted(LobbyId),
	#[error("Lobby {0} has no match reference")]
	MissingRef(LobbyId),
}

/// Details reported by the upstream record once a match has ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetails {
	pub game_duration: Option<u64>,
	pub game_mode: Option<String>,
}

/// A lobby being followed from admission until its completion webhook lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMatch {
	pub lobby_id: LobbyId,
	pub participant_ids: Vec<String>,
	pub webhook_started: String,
	pub webhook_completed: String,
	#[serde(default)]
	pub match_ref: Option<MatchRef>,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub started_at: Option<DateTime<Utc>>,
}

impl TrackedMatch {
	pub fn new(
		lobby_id: LobbyId,
		participant_ids: Vec<String>,
		webhook_started: String,
		webhook_completed: String,
	) -> Self {
		Self {
			lobby_id,
			participant_ids,
			webhook_started,
			webhook_completed,
			match_ref: None,
			created_at: Utc::now(),
			started_at: None,
		}
	}

	pub fn phase(&self) -> Phase {
		if self.match_ref.is_some() {
			Phase::Ongoing
		} else {
			Phase::Unstarted
		}
	}

	/// Record the detected match. Only legal once, from `Unstarted`.
	pub fn mark_started(&mut self, match_ref: MatchRef, at: DateTime<Utc>) -> Result<(), TransitionError> {
		if self.match_ref.is_some() {
			return Err(TransitionError::AlreadyStarted(self.lobby_id));
		}
		self.match_ref = Some(match_ref);
		self.started_at = Some(at);
		Ok(())
	}

	/// Replace a provisional reference with the canonical one
	pub fn upgrade_ref(&mut self, canonical: String) -> Result<(), TransitionError> {
		match self.match_ref {
			Some(_) => {
				self.match_ref = Some(MatchRef::Canonical(canonical));
				Ok(())
			}
			None => Err(TransitionError::MissingRef(self.lobby_id)),
		}
	}

	/// Payload for either lifecycle webhook
	pub fn webhook_payload(&self) -> Result<MatchWebhook, TransitionError> {
		let match_ref = self
			.match_ref
			.as_ref()
			.ok_or(TransitionError::MissingRef(self.lobby_id))?;
		Ok(MatchWebhook {
			lobby_id: self.lobby_id,
			riot_match_id: match_ref.id().to_string(),
		})
	}

	pub fn is_expired(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
		now - self.created_at > max_age
	}
}
