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

//! Match Tracking Engine
//!
//! Follows externally hosted matches that can only be polled, and notifies
//! downstream consumers by webhook when a tracked lobby's match starts and
//! when it completes.
//!
//! Architecture:
//! - Queue store shared between admission and the engine (in-memory, or
//!   Redis with the `redis` feature)
//! - Single sequential tracking loop on a dedicated thread
//! - One rate limiter pacing every outbound probe
//! - Tracking set as the idempotency anchor: one entity per lobby

pub mod admission;
pub mod config;
pub mod engine;
pub mod notifier;
pub mod rate_limit;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use admission::{Admission, AdmissionError, QueueDepths};
pub use config::{StoreBackend, TrackerConfig};
pub use engine::{
	EngineConfig, EngineError, IterationReport, MatchTracker, OngoingOutcome, TrackerHandle,
	UnstartedOutcome,
};
pub use notifier::{DeliveryError, HttpWebhookNotifier, WebhookNotifier};
pub use rate_limit::{RateLimitError, RateLimiter};
pub use source::{
	EndProbe, MatchSource, RiotMatchSource, RiotSourceConfig, RiotSourceError, StartProbe,
};
#[cfg(feature = "redis")]
pub use store::RedisQueueStore;
pub use store::{ClearCounts, MemoryQueueStore, QueueStore, StoreError};
pub use types::*;
