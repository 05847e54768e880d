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

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::TrackedMatch;
pub use memory::MemoryQueueStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisQueueStore;

/// Error types for queue store operations
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Store unavailable: {0}")]
	Unavailable(String),
	#[error("Failed to encode entity: {0}")]
	Encode(String),
	#[error("Failed to decode entity: {0}")]
	Decode(String),
}

/// Number of entries removed by [`QueueStore::clear_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearCounts {
	pub unstarted: usize,
	pub ongoing: usize,
	pub tracked: usize,
}

/// Queue store - the shared state between admission and the tracking engine
///
/// Holds FIFO queues of tracked matches and the tracking set that enforces
/// one entity per lobby. The admission path and the engine only ever talk
/// to each other through this store.
///
/// Every operation is atomic with respect to concurrent callers.
/// `dequeue` never blocks: an empty queue yields `None`.
#[async_trait]
pub trait QueueStore: Send + Sync {
	/// Append an entity to the tail of a queue
	async fn enqueue(&self, queue: &str, entity: &TrackedMatch) -> Result<(), StoreError>;

	/// Remove and return the head of a queue
	async fn dequeue(&self, queue: &str) -> Result<Option<TrackedMatch>, StoreError>;

	async fn length(&self, queue: &str) -> Result<usize, StoreError>;

	/// Add a key to a set, returning true if it was not already present
	async fn set_add(&self, set: &str, key: &str) -> Result<bool, StoreError>;

	/// Remove a key from a set, returning true if it was present
	async fn set_remove(&self, set: &str, key: &str) -> Result<bool, StoreError>;

	async fn set_contains(&self, set: &str, key: &str) -> Result<bool, StoreError>;

	/// Add `key` to `set` and, only if it was newly added, enqueue the entity
	///
	/// Both steps happen as one atomic operation. Returns false when the key
	/// was already present, in which case nothing is enqueued.
	async fn admit(
		&self,
		queue: &str,
		set: &str,
		key: &str,
		entity: &TrackedMatch,
	) -> Result<bool, StoreError>;

	/// Wipe both queues and the tracking set
	async fn clear_all(&self) -> Result<ClearCounts, StoreError>;

	/// Check that the backing store is reachable
	async fn ping(&self) -> Result<(), StoreError>;
}
