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

use crate::types::{LobbyId, MatchDetails, MatchRef};

/// What happened to the entity taken from the unstarted queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnstartedOutcome {
	/// A participant's match was found; the entity moved to the ongoing queue
	Started {
		lobby_id: LobbyId,
		match_ref: MatchRef,
		notified: bool,
	},
	/// Nobody has started yet; requeued unchanged
	Waiting { lobby_id: LobbyId },
	/// Already carried a match reference; moved to the ongoing queue without a probe
	Relocated { lobby_id: LobbyId },
	Expired { lobby_id: LobbyId },
}

/// What happened to the entity taken from the ongoing queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OngoingOutcome {
	/// Completion webhook delivered; the lobby is no longer tracked
	Completed {
		lobby_id: LobbyId,
		match_ref: MatchRef,
		details: MatchDetails,
	},
	/// Match ended but the completion webhook failed; requeued for another try
	DeliveryFailed { lobby_id: LobbyId },
	StillOngoing { lobby_id: LobbyId },
	/// Upstream could not answer this cycle; requeued
	ProbeFailed { lobby_id: LobbyId, reason: String },
	/// Provisional reference looked up; requeued without an end probe
	Resolved { lobby_id: LobbyId, upgraded: bool },
	/// No match reference at all; requeued without polling
	MissingRef { lobby_id: LobbyId },
	Expired { lobby_id: LobbyId },
}

/// Result of one engine iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
	pub unstarted: Option<UnstartedOutcome>,
	pub ongoing: Option<OngoingOutcome>,
}

impl IterationReport {
	/// Neither queue yielded an entity
	pub fn is_idle(&self) -> bool {
		self.unstarted.is_none() && self.ongoing.is_none()
	}
}
