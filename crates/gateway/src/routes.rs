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

use actix_web::web;

use crate::handlers;

/// Configure HTTP routes for the tracker
///
/// - `/` - Service banner
/// - `/health` - Store connectivity and queue depths
/// - `/track_match` - Admission and per-lobby status
/// - `/clear_queues` - Administrative wipe
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
	cfg.route("/", web::get().to(handlers::root))
		.route("/health", web::get().to(handlers::health))
		.route("/track_match", web::post().to(handlers::track_match))
		.route(
			"/track_match/{lobby_id}",
			web::get().to(handlers::tracking_status),
		)
		.route("/clear_queues", web::delete().to(handlers::clear_queues));
}
