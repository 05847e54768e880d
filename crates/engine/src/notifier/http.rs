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

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use tracker_sdk::types::MatchWebhook;

use super::{DeliveryError, WebhookNotifier};

/// Webhook notifier that POSTs the payload as JSON
pub struct HttpWebhookNotifier {
	client: Client,
}

impl HttpWebhookNotifier {
	pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
		let client = Client::builder().timeout(timeout).build()?;
		Ok(Self { client })
	}
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
	async fn deliver(&self, url: &str, payload: &MatchWebhook) -> Result<(), DeliveryError> {
		let response = self
			.client
			.post(url)
			.json(payload)
			.send()
			.await
			.map_err(|e| DeliveryError::Transport(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(DeliveryError::Status(status.as_u16()));
		}

		debug!(target: "notifier", url, lobby_id = payload.lobby_id, "Webhook delivered");
		Ok(())
	}
}
