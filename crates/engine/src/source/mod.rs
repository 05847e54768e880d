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

mod riot;

use async_trait::async_trait;

use crate::types::{MatchDetails, MatchRef};
pub use riot::{RiotMatchSource, RiotSourceConfig, RiotSourceError};

/// Outcome of asking whether a participant's match has started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartProbe {
	Found(MatchRef),
	NotFound,
	TransientError(String),
}

/// Outcome of asking whether a known match has ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndProbe {
	Ended(MatchDetails),
	StillOngoing,
	TransientError(String),
}

/// Capability interface over the upstream match provider
///
/// Every call is a read-only probe returning one of three outcomes.
/// Implementations never fail: transport errors, upstream throttling and
/// unexpected responses are all folded into `TransientError`, which the
/// engine treats as "try again next cycle".
///
/// Callers are responsible for pacing; implementations do no rate limiting.
#[async_trait]
pub trait MatchSource: Send + Sync {
	/// Has this participant's current match started?
	async fn probe_start(&self, participant_id: &str) -> StartProbe;

	/// Has this match ended?
	async fn probe_end(&self, match_ref: &MatchRef) -> EndProbe;

	/// Upgrade a provisional reference to a canonical one
	///
	/// Sources that only ever report canonical references keep the default.
	async fn resolve(&self, _provisional: &MatchRef) -> StartProbe {
		StartProbe::NotFound
	}
}
