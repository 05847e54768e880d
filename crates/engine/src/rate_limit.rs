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

//! Outbound call pacing for the match source
//!
//! One limiter is shared by every probe the engine makes (start detection,
//! reference resolution and end detection alike). It enforces a pure minimum
//! interval of `1 / rate` between calls: the GCRA quota has a burst of one
//! cell, so no more than `rate * T + 1` calls pass in any `T`-second window.
//! The interval must lie between one nanosecond and [`MAX_INTERVAL`].

use std::time::Duration;

use governor::{
	Quota, RateLimiter as GovernorLimiter,
	clock::DefaultClock,
	state::{InMemoryState, NotKeyed},
};
use thiserror::Error;

/// Slowest pacing accepted: one call per day
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error, PartialEq)]
pub enum RateLimitError {
	#[error("Rate limit must be a positive number of calls per second, got {0}")]
	InvalidRate(f64),
}

/// Minimum-interval limiter for outbound probes
pub struct RateLimiter {
	inner: GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>,
	interval: Duration,
}

impl RateLimiter {
	/// Create a limiter allowing `calls_per_second` probes per second
	pub fn new(calls_per_second: f64) -> Result<Self, RateLimitError> {
		if !calls_per_second.is_finite() || calls_per_second <= 0.0 {
			return Err(RateLimitError::InvalidRate(calls_per_second));
		}

		let interval = Duration::try_from_secs_f64(1.0 / calls_per_second)
			.ok()
			.filter(|interval| !interval.is_zero() && *interval <= MAX_INTERVAL)
			.ok_or(RateLimitError::InvalidRate(calls_per_second))?;
		let quota =
			Quota::with_period(interval).ok_or(RateLimitError::InvalidRate(calls_per_second))?;

		Ok(Self {
			inner: GovernorLimiter::direct(quota),
			interval,
		})
	}

	/// Wait until the next call is permitted
	pub async fn acquire(&self) {
		self.inner.until_ready().await;
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}
}
