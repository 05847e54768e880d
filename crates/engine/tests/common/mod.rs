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

//! Scripted collaborators for driving the engine in tests

#![allow(dead_code)]

use std::{
	collections::{HashMap, VecDeque},
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

use async_trait::async_trait;
use tracker_engine::{
	DeliveryError, EndProbe, EngineConfig, MatchRef, MatchSource, MatchTracker, MemoryQueueStore,
	RateLimiter, StartProbe, TrackedMatch, WebhookNotifier,
};
use tracker_sdk::types::MatchWebhook;

pub const STARTED_URL: &str = "http://backend.test/started";
pub const COMPLETED_URL: &str = "http://backend.test/completed";

/// Match source answering from per-key scripts
///
/// Each key pops its next scripted answer; an exhausted script falls back to
/// `NotFound` for start/resolve probes and `StillOngoing` for end probes.
#[derive(Default)]
pub struct ScriptedSource {
	starts: Mutex<HashMap<String, VecDeque<StartProbe>>>,
	ends: Mutex<HashMap<String, VecDeque<EndProbe>>>,
	resolves: Mutex<HashMap<String, VecDeque<StartProbe>>>,
	calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_start(&self, participant: &str, answers: Vec<StartProbe>) {
		self.starts
			.lock()
			.unwrap()
			.entry(participant.to_string())
			.or_default()
			.extend(answers);
	}

	pub fn on_end(&self, match_id: &str, answers: Vec<EndProbe>) {
		self.ends
			.lock()
			.unwrap()
			.entry(match_id.to_string())
			.or_default()
			.extend(answers);
	}

	pub fn on_resolve(&self, match_id: &str, answers: Vec<StartProbe>) {
		self.resolves
			.lock()
			.unwrap()
			.entry(match_id.to_string())
			.or_default()
			.extend(answers);
	}

	/// Every probe made so far, as `start:<id>`, `end:<id>` or `resolve:<id>`
	pub fn calls(&self) -> Vec<String> {
		self.calls
			.lock()
			.unwrap()
			.iter()
			.map(|(c, _)| c.clone())
			.collect()
	}

	pub fn call_times(&self) -> Vec<Instant> {
		self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push((call, Instant::now()));
	}
}

#[async_trait]
impl MatchSource for ScriptedSource {
	async fn probe_start(&self, participant_id: &str) -> StartProbe {
		self.record(format!("start:{}", participant_id));
		self.starts
			.lock()
			.unwrap()
			.get_mut(participant_id)
			.and_then(VecDeque::pop_front)
			.unwrap_or(StartProbe::NotFound)
	}

	async fn probe_end(&self, match_ref: &MatchRef) -> EndProbe {
		self.record(format!("end:{}", match_ref.id()));
		self.ends
			.lock()
			.unwrap()
			.get_mut(match_ref.id())
			.and_then(VecDeque::pop_front)
			.unwrap_or(EndProbe::StillOngoing)
	}

	async fn resolve(&self, provisional: &MatchRef) -> StartProbe {
		self.record(format!("resolve:{}", provisional.id()));
		self.resolves
			.lock()
			.unwrap()
			.get_mut(provisional.id())
			.and_then(VecDeque::pop_front)
			.unwrap_or(StartProbe::NotFound)
	}
}

/// Notifier that records every attempt and fails the scripted ones
#[derive(Default)]
pub struct RecordingNotifier {
	failures: Mutex<HashMap<String, usize>>,
	attempts: Mutex<Vec<(String, serde_json::Value, bool)>>,
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fail the next `times` deliveries to `url`
	pub fn fail_next(&self, url: &str, times: usize) {
		*self.failures.lock().unwrap().entry(url.to_string()).or_default() += times;
	}

	/// All attempts as `(url, json body, succeeded)`
	pub fn attempts(&self) -> Vec<(String, serde_json::Value, bool)> {
		self.attempts.lock().unwrap().clone()
	}

	pub fn attempts_to(&self, url: &str) -> usize {
		self.attempts
			.lock()
			.unwrap()
			.iter()
			.filter(|(u, _, _)| u == url)
			.count()
	}

	pub fn delivered_to(&self, url: &str) -> usize {
		self.attempts
			.lock()
			.unwrap()
			.iter()
			.filter(|(u, _, ok)| u == url && *ok)
			.count()
	}
}

#[async_trait]
impl WebhookNotifier for RecordingNotifier {
	async fn deliver(&self, url: &str, payload: &MatchWebhook) -> Result<(), DeliveryError> {
		let fail = {
			let mut failures = self.failures.lock().unwrap();
			match failures.get_mut(url) {
				Some(remaining) if *remaining > 0 => {
					*remaining -= 1;
					true
				}
				_ => false,
			}
		};

		let body = serde_json::to_value(payload).unwrap();
		self.attempts
			.lock()
			.unwrap()
			.push((url.to_string(), body, !fail));

		if fail {
			Err(DeliveryError::Status(503))
		} else {
			Ok(())
		}
	}
}

pub fn fast_config() -> EngineConfig {
	EngineConfig {
		idle_sleep: Duration::from_millis(5),
		busy_sleep: Duration::from_millis(1),
		error_cooldown: Duration::from_millis(5),
		expire_after: None,
	}
}

pub struct Harness {
	pub store: Arc<MemoryQueueStore>,
	pub source: Arc<ScriptedSource>,
	pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
	pub fn new() -> Self {
		Self {
			store: Arc::new(MemoryQueueStore::new()),
			source: Arc::new(ScriptedSource::new()),
			notifier: Arc::new(RecordingNotifier::new()),
		}
	}

	pub fn tracker(&self, rate: f64, config: EngineConfig) -> MatchTracker {
		MatchTracker::new(
			self.store.clone(),
			self.source.clone(),
			self.notifier.clone(),
			RateLimiter::new(rate).unwrap(),
			config,
		)
	}

	/// Tracker with a rate high enough not to slow tests down
	pub fn fast_tracker(&self) -> MatchTracker {
		self.tracker(1000.0, fast_config())
	}
}

pub fn lobby(lobby_id: i64, participants: &[&str]) -> TrackedMatch {
	TrackedMatch::new(
		lobby_id,
		participants.iter().map(|p| p.to_string()).collect(),
		STARTED_URL.to_string(),
		COMPLETED_URL.to_string(),
	)
}
