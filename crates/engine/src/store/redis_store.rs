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

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, Script, aio::ConnectionManager};
use tracing::{error, info};

use super::{ClearCounts, QueueStore, StoreError};
use crate::types::{DEAD_LETTER_QUEUE, ONGOING_QUEUE, TRACKED_SET, TrackedMatch, UNSTARTED_QUEUE};

/// SADD then RPUSH only when the member was new, as one server-side step
const ADMIT_SCRIPT: &str = r#"
if redis.call('SADD', KEYS[1], ARGV[1]) == 1 then
	redis.call('RPUSH', KEYS[2], ARGV[2])
	return 1
end
return 0
"#;

impl From<RedisError> for StoreError {
	fn from(e: RedisError) -> Self {
		StoreError::Unavailable(e.to_string())
	}
}

/// Redis-backed queue store
///
/// Queues are Redis lists of JSON-encoded entities, the tracking set is a
/// Redis set of lobby ids. The connection manager reconnects on its own
/// after a dropped connection; a failed call surfaces as
/// [`StoreError::Unavailable`].
#[derive(Clone)]
pub struct RedisQueueStore {
	conn: ConnectionManager,
	admit_script: Script,
}

impl RedisQueueStore {
	/// Connect to the Redis instance at `url`
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = redis::Client::open(url)?;
		let conn = ConnectionManager::new(client).await?;
		info!(target: "store", "Connected to redis");

		Ok(Self {
			conn,
			admit_script: Script::new(ADMIT_SCRIPT),
		})
	}

	fn encode(entity: &TrackedMatch) -> Result<String, StoreError> {
		serde_json::to_string(entity).map_err(|e| StoreError::Encode(e.to_string()))
	}

	/// Park an undecodable payload on the dead-letter list
	async fn dead_letter(&self, queue: &str, raw: String, reason: &str) {
		error!(
			target: "store",
			queue,
			lobby_id = ?lobby_id_hint(&raw),
			payload = %raw,
			"Dropping undecodable entity: {}", reason
		);
		let mut conn = self.conn.clone();
		let pushed: Result<usize, RedisError> = conn.rpush(DEAD_LETTER_QUEUE, &raw).await;
		if let Err(e) = pushed {
			error!(target: "store", queue, payload = %raw, "Failed to dead-letter entity: {}", e);
		}
	}
}

fn decode_entity(raw: &str) -> Result<TrackedMatch, StoreError> {
	serde_json::from_str(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Best-effort lobby id from a payload that failed to decode
fn lobby_id_hint(raw: &str) -> Option<i64> {
	serde_json::from_str::<serde_json::Value>(raw)
		.ok()?
		.get("lobby_id")?
		.as_i64()
}

#[async_trait]
impl QueueStore for RedisQueueStore {
	async fn enqueue(&self, queue: &str, entity: &TrackedMatch) -> Result<(), StoreError> {
		let payload = Self::encode(entity)?;
		let mut conn = self.conn.clone();
		let _: usize = conn.rpush(queue, payload).await?;
		Ok(())
	}

	async fn dequeue(&self, queue: &str) -> Result<Option<TrackedMatch>, StoreError> {
		let mut conn = self.conn.clone();
		let raw: Option<String> = conn.lpop(queue, None).await?;
		let Some(raw) = raw else {
			return Ok(None);
		};

		match decode_entity(&raw) {
			Ok(entity) => Ok(Some(entity)),
			Err(e) => {
				self.dead_letter(queue, raw, &e.to_string()).await;
				Err(e)
			}
		}
	}

	async fn length(&self, queue: &str) -> Result<usize, StoreError> {
		let mut conn = self.conn.clone();
		Ok(conn.llen(queue).await?)
	}

	async fn set_add(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let mut conn = self.conn.clone();
		let added: usize = conn.sadd(set, key).await?;
		Ok(added == 1)
	}

	async fn set_remove(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let mut conn = self.conn.clone();
		let removed: usize = conn.srem(set, key).await?;
		Ok(removed == 1)
	}

	async fn set_contains(&self, set: &str, key: &str) -> Result<bool, StoreError> {
		let mut conn = self.conn.clone();
		Ok(conn.sismember(set, key).await?)
	}

	async fn admit(
		&self,
		queue: &str,
		set: &str,
		key: &str,
		entity: &TrackedMatch,
	) -> Result<bool, StoreError> {
		let payload = Self::encode(entity)?;
		let mut conn = self.conn.clone();
		let admitted: i64 = self
			.admit_script
			.key(set)
			.key(queue)
			.arg(key)
			.arg(payload)
			.invoke_async(&mut conn)
			.await?;
		Ok(admitted == 1)
	}

	async fn clear_all(&self) -> Result<ClearCounts, StoreError> {
		let mut conn = self.conn.clone();
		let (unstarted, ongoing, tracked): (usize, usize, usize) = redis::pipe()
			.atomic()
			.llen(UNSTARTED_QUEUE)
			.llen(ONGOING_QUEUE)
			.scard(TRACKED_SET)
			.del(&[UNSTARTED_QUEUE, ONGOING_QUEUE, TRACKED_SET])
			.ignore()
			.query_async(&mut conn)
			.await?;

		Ok(ClearCounts {
			unstarted,
			ongoing,
			tracked,
		})
	}

	async fn ping(&self) -> Result<(), StoreError> {
		let mut conn = self.conn.clone();
		let _: String = redis::cmd("PING").query_async(&mut conn).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decode_entity() {
		let entity = TrackedMatch::new(
			7,
			vec!["puuid-a".to_string()],
			"http://backend/started".to_string(),
			"http://backend/completed".to_string(),
		);
		let raw = RedisQueueStore::encode(&entity).unwrap();
		assert_eq!(decode_entity(&raw).unwrap(), entity);
	}

	#[test]
	fn test_corrupt_payload_keeps_lobby_hint() {
		let raw = r#"{"lobby_id":42,"participant_ids":"not-a-list"}"#;
		assert!(matches!(decode_entity(raw), Err(StoreError::Decode(_))));
		assert_eq!(lobby_id_hint(raw), Some(42));
		assert_eq!(lobby_id_hint("garbage"), None);
	}
}
