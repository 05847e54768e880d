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

use std::sync::Arc;

use actix_web::{App, HttpServer, error::JsonPayloadError, web};
use anyhow::{Context, Result};
use tracing::info;
use tracker_engine::{
	Admission, HttpWebhookNotifier, MatchTracker, MemoryQueueStore, QueueStore, RateLimiter,
	RiotMatchSource, StoreBackend, TrackerConfig, TrackerHandle,
};

use crate::{
	config::GatewayRuntimeConfig, handlers::GatewayError, middleware::LoggingMiddleware,
	routes::configure_routes,
};

/// Shared state handed to every HTTP worker
pub struct GatewayState {
	pub admission: Admission,
}

/// JSON extractor limits; malformed bodies answer 400 with an `error` field
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
	web::JsonConfig::default()
		.limit(max_body_bytes)
		.error_handler(|err: JsonPayloadError, _req| {
			GatewayError::BadRequest(err.to_string()).into()
		})
}

async fn build_store(config: &TrackerConfig) -> Result<Arc<dyn QueueStore>> {
	match config.store.backend {
		StoreBackend::Memory => {
			info!(target: "server", "Using in-memory queue store");
			Ok(Arc::new(MemoryQueueStore::new()))
		}
		#[cfg(feature = "redis")]
		StoreBackend::Redis => {
			let store = tracker_engine::RedisQueueStore::connect(&config.store.redis_url)
				.await
				.context("Failed to connect to redis")?;
			info!(target: "server", "Using redis queue store");
			Ok(Arc::new(store))
		}
		#[cfg(not(feature = "redis"))]
		StoreBackend::Redis => {
			anyhow::bail!("store.backend = redis requires building with the `redis` feature")
		}
	}
}

/// The tracker process: HTTP front end plus the tracking engine worker
pub struct GatewayServer {
	config: GatewayRuntimeConfig,
	store: Arc<dyn QueueStore>,
}

impl GatewayServer {
	pub async fn new(config: GatewayRuntimeConfig) -> Result<Self> {
		let store = build_store(&config.tracker).await?;
		Ok(Self { config, store })
	}

	/// Start the engine worker thread
	pub fn start_engine(&self) -> Result<TrackerHandle> {
		let tracker = &self.config.tracker;
		let source = RiotMatchSource::new(tracker.riot_source())
			.context("Failed to create match source client")?;
		let notifier = HttpWebhookNotifier::new(tracker.webhook_timeout())
			.context("Failed to create webhook client")?;
		let limiter = RateLimiter::new(tracker.rate_limit)?;

		let engine = MatchTracker::new(
			self.store.clone(),
			Arc::new(source),
			Arc::new(notifier),
			limiter,
			tracker.engine_config(),
		);
		let handle = engine.start()?;
		info!(
			target: "server",
			rate_limit = tracker.rate_limit,
			"Match tracker engine started"
		);
		Ok(handle)
	}

	/// Serve HTTP until the server is stopped (ctrl-c)
	pub async fn serve(&self) -> Result<()> {
		let addr = self.config.tracker.bind_addr;
		let max_body_bytes = self.config.max_body_bytes;
		if !self.config.tracker.has_api_key() {
			tracing::warn!(target: "server", "Riot API key not configured; tracking requests will be rejected");
		}

		let state = web::Data::new(GatewayState {
			admission: Admission::new(self.store.clone(), self.config.tracker.has_api_key()),
		});

		info!(target: "server", workers = self.config.workers, "Listening on {}", addr);
		HttpServer::new(move || {
			App::new()
				.app_data(state.clone())
				.app_data(json_config(max_body_bytes))
				.wrap(LoggingMiddleware)
				.configure(configure_routes)
		})
		.workers(self.config.workers)
		.bind(addr)
		.with_context(|| format!("Failed to bind {}", addr))?
		.run()
		.await
		.context("HTTP server error")
	}
}

/// Stop the engine worker without blocking the calling runtime
///
/// The join runs on the blocking pool so tasks the engine still depends on
/// (such as the redis connection driver) keep making progress.
pub async fn stop_engine(handle: TrackerHandle) -> Result<()> {
	actix_rt::task::spawn_blocking(move || handle.shutdown())
		.await
		.context("Engine shutdown task failed")
}
