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

mod http;

use async_trait::async_trait;
use thiserror::Error;
use tracker_sdk::types::MatchWebhook;

pub use http::HttpWebhookNotifier;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
	#[error("Webhook request failed: {0}")]
	Transport(String),
	#[error("Webhook endpoint answered {0}")]
	Status(u16),
}

/// Delivers lifecycle notifications to caller-supplied URLs
///
/// A single attempt per call. Retrying is the engine's decision.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
	async fn deliver(&self, url: &str, payload: &MatchWebhook) -> Result<(), DeliveryError>;
}
