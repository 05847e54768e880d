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

//! Logging initialization for the tracker service
//!
//! # Configuration
//!
//! - `RUST_LOG`: log filter (default: `info`), e.g. `RUST_LOG=engine=debug,info`.
//!   The engine logs under the `engine`, `store`, `source` and `notifier`
//!   targets; the HTTP layer under `server`.
//! - `LOG_DIR`: root directory for log files (default: `{workspace}/logs`).
//!   Files land in `{LOG_DIR}/tracker/`.
//! - `LOG_TO_CONSOLE`: `true`, `1` or `yes` to also log to stderr (with ANSI colors).
//!
//! # Log File Format
//!
//! One file per day (UTC), named `tracker.YYYY-MM-DD.log`. Each line carries
//! an RFC 3339 UTC timestamp, thread id, level, target and message.

use std::{
	env,
	path::{Path, PathBuf},
	sync::OnceLock,
};

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::{
	non_blocking,
	rolling::{self, Rotation},
};
use tracing_subscriber::{
	EnvFilter, Layer, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

use crate::config::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_TO_CONSOLE, LOG_COMPONENT_NAME};

// Keeps the non-blocking writer flushing until process exit
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

/// Walk up from `start` to the first directory whose Cargo.toml declares a workspace
fn find_workspace_root(start: &Path) -> Option<PathBuf> {
	start.ancestors().find_map(|dir| {
		let manifest = dir.join("Cargo.toml");
		match std::fs::read_to_string(&manifest) {
			Ok(content) if content.contains("[workspace]") => Some(dir.to_path_buf()),
			_ => None,
		}
	})
}

fn log_root() -> PathBuf {
	if let Ok(dir) = env::var("LOG_DIR") {
		return PathBuf::from(dir);
	}

	let start = env::var("CARGO_MANIFEST_DIR")
		.map(PathBuf::from)
		.or_else(|_| env::current_dir())
		.unwrap_or_else(|_| PathBuf::from("."));

	find_workspace_root(&start)
		.unwrap_or(start)
		.join("logs")
}

fn console_enabled() -> bool {
	env::var("LOG_TO_CONSOLE")
		.map(|v| matches!(v.as_str(), "true" | "1" | "yes"))
		.unwrap_or(DEFAULT_LOG_TO_CONSOLE)
}

/// Daily-rolling `{component}.{date}.log` writer in `log_dir`
fn file_writer(log_dir: &Path) -> Result<non_blocking::NonBlocking> {
	let appender = rolling::RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(LOG_COMPONENT_NAME)
		.filename_suffix("log")
		.build(log_dir)
		.with_context(|| {
			format!(
				"Failed to create rolling file appender in {}",
				log_dir.display()
			)
		})?;

	let (writer, guard) = non_blocking(appender);
	LOG_GUARD.set(guard).ok();
	Ok(writer)
}

fn fmt_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
	S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
	W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
	fmt::layer()
		.with_writer(writer)
		.with_timer(fmt::time::UtcTime::rfc_3339())
		.with_thread_ids(true)
		.with_target(true)
		.with_thread_names(false)
		.with_ansi(ansi)
}

/// Initialize logging with file output and optional console output
///
/// Fails if the log directory or file cannot be created.
pub fn init_logging() -> Result<()> {
	dotenv::dotenv().ok();

	let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
	let log_dir = log_root().join(LOG_COMPONENT_NAME);
	std::fs::create_dir_all(&log_dir)
		.with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

	let writer = file_writer(&log_dir)?;
	let log_to_console = console_enabled();
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

	let console = log_to_console.then(|| fmt_layer(std::io::stderr, true));
	Registry::default()
		.with(filter)
		.with(fmt_layer(writer, false))
		.with(console)
		.try_init()
		.context("Failed to install tracing subscriber")?;

	info!(target: "server", "Log level: {}", log_level);
	info!(target: "server", "Log directory: {}", log_dir.display());
	info!(
		target: "server",
		"Log file base name: {}.YYYY-MM-DD.log (daily rolling)",
		LOG_COMPONENT_NAME
	);
	if log_to_console {
		info!(target: "server", "Console output: enabled");
	}

	Ok(())
}
