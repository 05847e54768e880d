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

use std::env;

use anyhow::{Context, Result};
use tracker_engine::TrackerConfig;

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "tracker";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

// Server configuration constants
/// Default maximum HTTP request body size in bytes (can be overridden by TRACKER_MAX_BODY_BYTES)
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Service name reported at `/`
pub const SERVICE_NAME: &str = "match-tracker";

/// Everything the gateway process needs at startup
#[derive(Debug, Clone)]
pub struct GatewayRuntimeConfig {
	pub tracker: TrackerConfig,
	pub workers: usize,
	pub max_body_bytes: usize,
}

impl GatewayRuntimeConfig {
	pub fn from_env() -> Result<Self> {
		dotenv::dotenv().ok();

		let tracker = match env::var("TRACKER_CONFIG_FILE") {
			Ok(path) => TrackerConfig::from_file(&path)
				.with_context(|| format!("Failed to load tracker config from {}", path))?,
			Err(_) => TrackerConfig::from_env().context("Failed to load tracker config")?,
		};

		let workers = env::var("TRACKER_WORKERS")
			.ok()
			.and_then(|w| w.parse().ok())
			.filter(|w: &usize| *w > 0)
			.unwrap_or_else(num_cpus::get);

		let max_body_bytes = env::var("TRACKER_MAX_BODY_BYTES")
			.ok()
			.and_then(|v| v.parse().ok())
			.unwrap_or(DEFAULT_MAX_BODY_BYTES);

		Ok(Self {
			tracker,
			workers,
			max_body_bytes,
		})
	}
}
