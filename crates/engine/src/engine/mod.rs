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

mod report;

pub use report::{IterationReport, OngoingOutcome, UnstartedOutcome};

use std::{
	collections::VecDeque,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
	thread::{self, JoinHandle},
	time::Duration,
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
	notifier::WebhookNotifier,
	rate_limit::RateLimiter,
	source::{EndProbe, MatchSource, StartProbe},
	store::{QueueStore, StoreError},
	types::{
		LobbyId, MatchRef, ONGOING_QUEUE, Phase, TRACKED_SET, TrackedMatch, TransitionError,
		UNSTARTED_QUEUE,
	},
};

/// Error types for the tracking engine
///
/// Any of these aborts the current iteration only.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Transition(#[from] TransitionError),
	#[error("Failed to start engine: {0}")]
	Spawn(String),
}

/// Pacing for the tracking loop
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Sleep after an iteration where both queues were empty
	pub idle_sleep: Duration,
	/// Sleep after an iteration that processed something
	pub busy_sleep: Duration,
	/// Sleep after an iteration aborted by a store failure
	pub error_cooldown: Duration,
	/// Drop entities admitted longer ago than this
	pub expire_after: Option<Duration>,
}

impl EngineConfig {
	/// Sleep to take after an iteration with the given result
	pub fn pause_after(&self, result: &Result<IterationReport, EngineError>) -> Duration {
		match result {
			Ok(report) if report.is_idle() => self.idle_sleep,
			Ok(_) => self.busy_sleep,
			Err(_) => self.error_cooldown,
		}
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			idle_sleep: Duration::from_secs(2),
			busy_sleep: Duration::from_millis(500),
			error_cooldown: Duration::from_secs(5),
			expire_after: None,
		}
	}
}

/// The match tracking engine
///
/// Advances every tracked lobby through `unstarted -> ongoing -> removed`.
/// Each iteration takes at most one entity from the unstarted queue and one
/// from the ongoing queue, probes the match source (paced by the shared rate
/// limiter), moves the entity and fires the matching webhook.
///
/// Requeueing to the tail is the only retry mechanism:
/// - a failed start webhook is logged and never retried
/// - a failed completion webhook keeps the entity in the ongoing queue
///   until delivery succeeds
///
/// A lobby leaves the tracking set only once its completion webhook has
/// been delivered (or it expired).
///
/// A dequeued entity is only held in memory until it is written back. When
/// that write fails it is parked, and the next iteration retries every
/// parked write before taking new work from either queue.
pub struct MatchTracker {
	store: Arc<dyn QueueStore>,
	source: Arc<dyn MatchSource>,
	notifier: Arc<dyn WebhookNotifier>,
	limiter: RateLimiter,
	config: EngineConfig,
	parked: Mutex<VecDeque<ParkedWrite>>,
}

/// A store write that failed after its entity was dequeued
#[derive(Debug, Clone)]
enum ParkedWrite {
	Enqueue {
		queue: &'static str,
		entity: TrackedMatch,
	},
	Untrack(LobbyId),
}

impl MatchTracker {
	pub fn new(
		store: Arc<dyn QueueStore>,
		source: Arc<dyn MatchSource>,
		notifier: Arc<dyn WebhookNotifier>,
		limiter: RateLimiter,
		config: EngineConfig,
	) -> Self {
		Self {
			store,
			source,
			notifier,
			limiter,
			config,
			parked: Mutex::new(VecDeque::new()),
		}
	}

	/// Number of writes waiting to be retried
	pub fn parked_writes(&self) -> usize {
		self.parked().len()
	}

	/// Run one iteration: the unstarted queue first, then the ongoing queue
	///
	/// Parked writes from an earlier failed iteration are flushed first; if
	/// any still fails, nothing new is dequeued.
	pub async fn tick(&self) -> Result<IterationReport, EngineError> {
		self.flush_parked().await?;
		let unstarted = self.process_unstarted().await?;
		let ongoing = self.process_ongoing().await?;
		Ok(IterationReport { unstarted, ongoing })
	}

	async fn process_unstarted(&self) -> Result<Option<UnstartedOutcome>, EngineError> {
		let Some(mut entity) = self.store.dequeue(UNSTARTED_QUEUE).await? else {
			return Ok(None);
		};
		let lobby_id = entity.lobby_id;

		if self.is_expired(&entity) {
			self.expire(&entity, Phase::Unstarted).await?;
			return Ok(Some(UnstartedOutcome::Expired { lobby_id }));
		}

		if entity.phase() == Phase::Ongoing {
			warn!(target: "engine", lobby_id, queue = UNSTARTED_QUEUE, "Entity already started, moving to ongoing");
			self.put_back(ONGOING_QUEUE, entity).await?;
			return Ok(Some(UnstartedOutcome::Relocated { lobby_id }));
		}

		let Some(match_ref) = self.detect_start(&entity).await else {
			self.put_back(UNSTARTED_QUEUE, entity).await?;
			return Ok(Some(UnstartedOutcome::Waiting { lobby_id }));
		};

		entity.mark_started(match_ref.clone(), Utc::now())?;
		let payload = entity.webhook_payload()?;
		let webhook_started = entity.webhook_started.clone();
		// The transition is decided even if the write is parked; notify either way.
		let moved = self.put_back(ONGOING_QUEUE, entity).await;
		info!(target: "engine", lobby_id, match_ref = %match_ref, "Match started");

		let notified = match self.notifier.deliver(&webhook_started, &payload).await {
			Ok(()) => true,
			Err(e) => {
				warn!(target: "notifier", lobby_id, url = %webhook_started, "Start webhook failed: {}", e);
				false
			}
		};
		moved?;

		Ok(Some(UnstartedOutcome::Started {
			lobby_id,
			match_ref,
			notified,
		}))
	}

	/// Probe participants in order, stopping at the first one in a match
	async fn detect_start(&self, entity: &TrackedMatch) -> Option<MatchRef> {
		for participant_id in &entity.participant_ids {
			self.limiter.acquire().await;
			match self.source.probe_start(participant_id).await {
				StartProbe::Found(match_ref) => return Some(match_ref),
				StartProbe::NotFound => {}
				StartProbe::TransientError(reason) => {
					debug!(target: "engine", lobby_id = entity.lobby_id, %participant_id, "Start probe error: {}", reason);
				}
			}
		}
		None
	}

	async fn process_ongoing(&self) -> Result<Option<OngoingOutcome>, EngineError> {
		let Some(mut entity) = self.store.dequeue(ONGOING_QUEUE).await? else {
			return Ok(None);
		};
		let lobby_id = entity.lobby_id;

		if self.is_expired(&entity) {
			self.expire(&entity, Phase::Ongoing).await?;
			return Ok(Some(OngoingOutcome::Expired { lobby_id }));
		}

		let match_ref = match entity.match_ref.clone() {
			None => {
				warn!(target: "engine", lobby_id, queue = ONGOING_QUEUE, "Ongoing entity has no match reference");
				self.put_back(ONGOING_QUEUE, entity).await?;
				return Ok(Some(OngoingOutcome::MissingRef { lobby_id }));
			}
			Some(provisional @ MatchRef::Provisional(_)) => {
				self.limiter.acquire().await;
				let upgraded = match self.source.resolve(&provisional).await {
					StartProbe::Found(MatchRef::Canonical(id)) => {
						entity.upgrade_ref(id)?;
						info!(target: "engine", lobby_id, from = %provisional, to = ?entity.match_ref, "Match reference resolved");
						true
					}
					_ => false,
				};
				self.put_back(ONGOING_QUEUE, entity).await?;
				return Ok(Some(OngoingOutcome::Resolved { lobby_id, upgraded }));
			}
			Some(canonical) => canonical,
		};

		self.limiter.acquire().await;
		match self.source.probe_end(&match_ref).await {
			EndProbe::StillOngoing => {
				self.put_back(ONGOING_QUEUE, entity).await?;
				Ok(Some(OngoingOutcome::StillOngoing { lobby_id }))
			}
			EndProbe::TransientError(reason) => {
				debug!(target: "engine", lobby_id, match_ref = %match_ref, "End probe error: {}", reason);
				self.put_back(ONGOING_QUEUE, entity).await?;
				Ok(Some(OngoingOutcome::ProbeFailed { lobby_id, reason }))
			}
			EndProbe::Ended(details) => {
				let payload = entity.webhook_payload()?;
				match self.notifier.deliver(&entity.webhook_completed, &payload).await {
					Ok(()) => {
						self.untrack(lobby_id).await?;
						info!(
							target: "engine",
							lobby_id,
							match_ref = %match_ref,
							game_duration = ?details.game_duration,
							game_mode = ?details.game_mode,
							"Match completed"
						);
						Ok(Some(OngoingOutcome::Completed {
							lobby_id,
							match_ref,
							details,
						}))
					}
					Err(e) => {
						warn!(target: "notifier", lobby_id, url = %entity.webhook_completed, "Completion webhook failed, will retry: {}", e);
						self.put_back(ONGOING_QUEUE, entity).await?;
						Ok(Some(OngoingOutcome::DeliveryFailed { lobby_id }))
					}
				}
			}
		}
	}

	fn is_expired(&self, entity: &TrackedMatch) -> bool {
		let Some(max_age) = self.config.expire_after else {
			return false;
		};
		match chrono::Duration::from_std(max_age) {
			Ok(max_age) => entity.is_expired(Utc::now(), max_age),
			Err(_) => false,
		}
	}

	async fn expire(&self, entity: &TrackedMatch, phase: Phase) -> Result<(), EngineError> {
		self.untrack(entity.lobby_id).await?;
		warn!(
			target: "engine",
			lobby_id = entity.lobby_id,
			%phase,
			created_at = %entity.created_at,
			"Tracking expired, lobby dropped"
		);
		Ok(())
	}

	fn parked(&self) -> MutexGuard<'_, VecDeque<ParkedWrite>> {
		self.parked.lock().unwrap_or_else(PoisonError::into_inner)
	}

	async fn apply(&self, write: &ParkedWrite) -> Result<(), StoreError> {
		match write {
			ParkedWrite::Enqueue { queue, entity } => self.store.enqueue(queue, entity).await,
			ParkedWrite::Untrack(lobby_id) => self
				.store
				.set_remove(TRACKED_SET, &lobby_id.to_string())
				.await
				.map(|_| ()),
		}
	}

	/// Apply a write, parking it for the next iteration if the store refuses it
	async fn write_or_park(&self, write: ParkedWrite) -> Result<(), EngineError> {
		match self.apply(&write).await {
			Ok(()) => Ok(()),
			Err(e) => {
				warn!(target: "store", ?write, "Store write failed, parked for retry: {}", e);
				self.parked().push_back(write);
				Err(e.into())
			}
		}
	}

	async fn put_back(&self, queue: &'static str, entity: TrackedMatch) -> Result<(), EngineError> {
		self.write_or_park(ParkedWrite::Enqueue { queue, entity }).await
	}

	async fn untrack(&self, lobby_id: LobbyId) -> Result<(), EngineError> {
		self.write_or_park(ParkedWrite::Untrack(lobby_id)).await
	}

	async fn flush_parked(&self) -> Result<(), EngineError> {
		loop {
			let Some(write) = self.parked().pop_front() else {
				return Ok(());
			};
			if let Err(e) = self.apply(&write).await {
				self.parked().push_front(write);
				return Err(e.into());
			}
			debug!(target: "store", ?write, "Parked write applied");
		}
	}

	/// Loop until `shutdown` flips to true
	///
	/// A failed iteration is logged and followed by the error cooldown; the
	/// loop itself never ends on an error. Shutdown interrupts sleeps but
	/// never an iteration in flight.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		info!(target: "engine", "Match tracker started");
		loop {
			if *shutdown.borrow() {
				break;
			}

			let result = self.tick().await;
			match &result {
				Ok(report) if !report.is_idle() => debug!(target: "engine", ?report, "Iteration"),
				Ok(_) => {}
				Err(e) => error!(target: "engine", "Iteration failed: {}", e),
			}
			let pause = self.config.pause_after(&result);

			tokio::select! {
				_ = tokio::time::sleep(pause) => {}
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				}
			}
		}
		info!(target: "engine", "Match tracker stopped");
	}

	/// Run the engine on a dedicated `match-tracker` thread
	///
	/// The thread owns a current-thread runtime; the returned handle stops
	/// it on `shutdown` or drop.
	pub fn start(self) -> Result<TrackerHandle, EngineError> {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let thread_handle = thread::Builder::new()
			.name("match-tracker".to_string())
			.spawn(move || {
				let runtime = match tokio::runtime::Builder::new_current_thread()
					.enable_all()
					.build()
				{
					Ok(runtime) => runtime,
					Err(e) => {
						error!(target: "engine", "Failed to build engine runtime: {}", e);
						return;
					}
				};
				runtime.block_on(self.run(shutdown_rx));
			})
			.map_err(|e| EngineError::Spawn(e.to_string()))?;

		Ok(TrackerHandle {
			thread_handle: Some(thread_handle),
			shutdown: shutdown_tx,
		})
	}
}

/// Owner of the running engine thread
pub struct TrackerHandle {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: watch::Sender<bool>,
}

impl TrackerHandle {
	pub fn is_running(&self) -> bool {
		self.thread_handle
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}

	/// Signal shutdown and wait for the current iteration to finish
	pub fn shutdown(mut self) {
		info!(target: "engine", "Shutting down match tracker");
		self.stop();
	}

	fn stop(&mut self) {
		let _ = self.shutdown.send(true);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "engine", "Match tracker thread panicked: {:?}", e);
		}
	}
}

impl Drop for TrackerHandle {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;
	use crate::types::MatchDetails;

	fn config() -> EngineConfig {
		EngineConfig {
			idle_sleep: Duration::from_millis(2000),
			busy_sleep: Duration::from_millis(500),
			error_cooldown: Duration::from_millis(5000),
			expire_after: None,
		}
	}

	#[rstest]
	#[case(Ok(IterationReport::default()), 2000)]
	#[case(
		Ok(IterationReport {
			unstarted: Some(UnstartedOutcome::Waiting { lobby_id: 1 }),
			ongoing: None,
		}),
		500
	)]
	#[case(
		Ok(IterationReport {
			unstarted: None,
			ongoing: Some(OngoingOutcome::Completed {
				lobby_id: 1,
				match_ref: MatchRef::Canonical("EUN1_1".to_string()),
				details: MatchDetails::default(),
			}),
		}),
		500
	)]
	#[case(Err(EngineError::Store(StoreError::Unavailable("down".to_string()))), 5000)]
	fn test_pause_after_iteration(
		#[case] result: Result<IterationReport, EngineError>,
		#[case] millis: u64,
	) {
		assert_eq!(config().pause_after(&result), Duration::from_millis(millis));
	}
}
