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

use std::{net::SocketAddr, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{engine::EngineConfig, rate_limit::RateLimiter, source::RiotSourceConfig};

pub const ENV_PREFIX: &str = "TRACKER";
pub const ENV_SEPARATOR: &str = "__";

/// Match tracker configuration
///
/// Layered: compiled defaults, then an optional file, then `TRACKER__*`
/// environment variables (`TRACKER__RIOT__API_KEY`, `TRACKER__RATE_LIMIT`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
	/// HTTP bind address
	pub bind_addr: SocketAddr,
	/// Outbound probe calls per second
	pub rate_limit: f64,
	pub riot: RiotSettings,
	pub webhook: WebhookSettings,
	pub store: StoreSettings,
	pub engine: EngineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiotSettings {
	/// Empty until configured; admission is refused while empty
	pub api_key: String,
	pub base_url: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
	Memory,
	Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
	pub backend: StoreBackend,
	pub redis_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
	pub idle_sleep_ms: u64,
	pub busy_sleep_ms: u64,
	pub error_cooldown_ms: u64,
	/// Drop entities older than this; unset keeps them forever
	pub expire_after_secs: Option<u64>,
}

impl Default for TrackerConfig {
	fn default() -> Self {
		Self {
			bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
			rate_limit: 10.0,
			riot: RiotSettings::default(),
			webhook: WebhookSettings::default(),
			store: StoreSettings::default(),
			engine: EngineSettings::default(),
		}
	}
}

impl Default for RiotSettings {
	fn default() -> Self {
		Self {
			api_key: String::new(),
			base_url: "https://americas.api.riotgames.com".to_string(),
			timeout_ms: 10_000,
		}
	}
}

impl Default for WebhookSettings {
	fn default() -> Self {
		Self { timeout_ms: 10_000 }
	}
}

impl Default for StoreSettings {
	fn default() -> Self {
		Self {
			backend: StoreBackend::Memory,
			redis_url: "redis://127.0.0.1:6379/0".to_string(),
		}
	}
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			idle_sleep_ms: 2_000,
			busy_sleep_ms: 500,
			error_cooldown_ms: 5_000,
			expire_after_secs: None,
		}
	}
}

impl TrackerConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::build(None)
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		Self::build(Some(path))
	}

	fn build(path: Option<&str>) -> Result<Self, ConfigError> {
		let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
		if let Some(path) = path {
			builder = builder.add_source(File::with_name(path));
		}
		let cfg = builder
			.add_source(
				Environment::with_prefix(ENV_PREFIX)
					.separator(ENV_SEPARATOR)
					.try_parsing(true),
			)
			.build()?;

		let config: Self = cfg.try_deserialize()?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		RateLimiter::new(self.rate_limit)
			.map_err(|e| ConfigError::Message(format!("rate_limit: {}", e)))?;
		if self.engine.expire_after_secs == Some(0) {
			return Err(ConfigError::Message(
				"engine.expire_after_secs must be > 0 when set".to_string(),
			));
		}
		Ok(())
	}

	pub fn has_api_key(&self) -> bool {
		!self.riot.api_key.trim().is_empty()
	}

	pub fn riot_source(&self) -> RiotSourceConfig {
		RiotSourceConfig {
			api_key: self.riot.api_key.clone(),
			base_url: self.riot.base_url.clone(),
			timeout: Duration::from_millis(self.riot.timeout_ms),
		}
	}

	pub fn webhook_timeout(&self) -> Duration {
		Duration::from_millis(self.webhook.timeout_ms)
	}

	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			idle_sleep: Duration::from_millis(self.engine.idle_sleep_ms),
			busy_sleep: Duration::from_millis(self.engine.busy_sleep_ms),
			error_cooldown: Duration::from_millis(self.engine.error_cooldown_ms),
			expire_after: self.engine.expire_after_secs.map(Duration::from_secs),
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[test]
	fn test_defaults() {
		let config = TrackerConfig::default();
		assert_eq!(config.bind_addr.port(), 8000);
		assert_eq!(config.rate_limit, 10.0);
		assert_eq!(config.store.backend, StoreBackend::Memory);
		assert!(!config.has_api_key());
		assert!(config.validate().is_ok());

		let engine = config.engine_config();
		assert_eq!(engine.idle_sleep, Duration::from_secs(2));
		assert_eq!(engine.busy_sleep, Duration::from_millis(500));
		assert_eq!(engine.error_cooldown, Duration::from_secs(5));
		assert!(engine.expire_after.is_none());
	}

	#[rstest]
	#[case(0.0)]
	#[case(-2.5)]
	#[case(1e-20)]
	#[case(1e300)]
	fn test_rejects_unusable_rate(#[case] rate_limit: f64) {
		let config = TrackerConfig {
			rate_limit,
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_rejects_zero_expiry() {
		let mut config = TrackerConfig::default();
		config.engine.expire_after_secs = Some(0);
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_defaults_survive_config_round_trip() {
		let cfg = Config::builder()
			.add_source(Config::try_from(&TrackerConfig::default()).unwrap())
			.build()
			.unwrap();
		let config: TrackerConfig = cfg.try_deserialize().unwrap();
		assert_eq!(config.riot.base_url, "https://americas.api.riotgames.com");
		assert_eq!(config.engine.busy_sleep_ms, 500);
		assert_eq!(config.engine.expire_after_secs, None);
	}
}
