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

//! Match Tracker Service
//!
//! Accepts lobbies to track over HTTP and runs the tracking engine, which
//! polls the Riot match API and notifies the caller's webhooks when each
//! lobby's match starts and completes.

mod config;
mod handlers;
mod logging;
mod middleware;
mod routes;
mod server;

use anyhow::{Context, Result};
use tracing::info;

use crate::{config::GatewayRuntimeConfig, logging::init_logging};
use server::{GatewayServer, stop_engine};

#[actix_rt::main]
async fn main() -> Result<()> {
	// Initialize logging first
	init_logging()?;

	let config = GatewayRuntimeConfig::from_env()?;
	info!(target: "server", "Starting match tracker on {}", config.tracker.bind_addr);

	let server = GatewayServer::new(config)
		.await
		.context("Failed to create tracker server")?;
	let engine = server.start_engine()?;

	let result = server.serve().await;

	// The HTTP server returns on ctrl-c; stop the engine after its current iteration.
	stop_engine(engine).await?;
	info!(target: "server", "Match tracker stopped");
	result
}
