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

use std::{
	collections::{HashMap, HashSet, VecDeque},
	sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{ClearCounts, QueueStore, StoreError};
use crate::types::{ONGOING_QUEUE, TRACKED_SET, TrackedMatch, UNSTARTED_QUEUE};

#[derive(Default)]
struct Inner {
	queues: HashMap<String, VecDeque<TrackedMatch>>,
	sets: HashMap<String, HashSet<String>>,
}

/// In-process queue store
///
/// A single mutex guards every queue and set, so each operation (including
/// `admit`) is atomic. Suitable for single-process deployments and tests;
/// nothing survives a restart.
#[derive(Default)]
pub struct MemoryQueueStore {
	inner: Mutex<Inner>,
}

impl MemoryQueueStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot a queue's contents without consuming them
	pub fn peek_all(&self, queue: &str) -> Vec<TrackedMatch> {
		match self.lock() {
			Ok(inner) => inner
				.queues
				.get(queue)
				.map(|q| q.iter().cloned().collect())
				.unwrap_or_default(),
			Err(_) => Vec::new(),
		}
	}

	fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
		self.inner
			.lock()
			.map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
	}
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
	async fn enqueue(&self, queue: &str, entity: &TrackedMatch) -> Result<(), StoreError> {
		let mut inner = self.lock()?;
		inner
			.queues
			.entry(queue.to_string())
			.or_default()
			.push_back(entity.clone());
		Ok(())
	}

	async fn dequeue(&self, queue: &str) -> Result<Option<TrackedMatch>, StoreError> {
		let mut inner = self.lock()?;
		Ok(inner.queues.get_mut(queue).and_then(VecDeque::pop_front))
	}

	async fn length(&self, queue: &str) -> Result<usize, StoreError> {
		let inner = self.lock()?;
		Ok(inner.queues.get(queue).map_or(0, VecDeque::len))
	}

	async fn set_add(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let mut inner = self.lock()?;
		Ok(inner
			.sets
			.entry(set.to_string())
			.or_default()
			.insert(key.to_string()))
	}

	async fn set_remove(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let mut inner = self.lock()?;
		Ok(inner.sets.get_mut(set).is_some_and(|s| s.remove(key)))
	}

	async fn set_contains(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let inner = self.lock()?;
		Ok(inner.sets.get(set).is_some_and(|s| s.contains(key)))
	}

	async fn admit(
		&self,
		queue: &str,
		set: &str,
		key: &str,
		entity: &TrackedMatch,
	) -> Result<bool, StoreError> {
		let mut inner = self.lock()?;
		if !inner
			.sets
			.entry(set.to_string())
			.or_default()
			.insert(key.to_string())
		{
			return Ok(false);
		}
		inner
			.queues
			.entry(queue.to_string())
			.or_default()
			.push_back(entity.clone());
		Ok(true)
	}

	async fn clear_all(&self) -> Result<ClearCounts, StoreError> {
		let mut inner = self.lock()?;
		let unstarted = inner.queues.remove(UNSTARTED_QUEUE).map_or(0, |q| q.len());
		let ongoing = inner.queues.remove(ONGOING_QUEUE).map_or(0, |q| q.len());
		let tracked = inner.sets.remove(TRACKED_SET).map_or(0, |s| s.len());
		Ok(ClearCounts {
			unstarted,
			ongoing,
			tracked,
		})
	}

	async fn ping(&self) -> Result<(), StoreError> {
		self.lock().map(|_| ())
	}
}
