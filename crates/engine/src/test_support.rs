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

//! Scripted loopback HTTP endpoint for exercising the outbound clients

use std::sync::{Arc, Mutex};

use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
	task::JoinHandle,
};

/// Answers one connection per scripted `(status, body)` pair, in order,
/// and records each raw request
pub struct ScriptedEndpoint {
	pub url: String,
	requests: Arc<Mutex<Vec<String>>>,
	task: JoinHandle<()>,
}

impl ScriptedEndpoint {
	pub async fn serve(responses: Vec<(u16, &'static str)>) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let url = format!("http://{}", listener.local_addr().unwrap());
		let requests = Arc::new(Mutex::new(Vec::new()));

		let seen = requests.clone();
		let task = tokio::spawn(async move {
			for (status, body) in responses {
				let Ok((mut socket, _)) = listener.accept().await else {
					return;
				};
				let request = read_request(&mut socket).await;
				seen.lock().unwrap().push(request);

				let response = format!(
					"HTTP/1.1 {} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
					status,
					body.len(),
					body
				);
				let _ = socket.write_all(response.as_bytes()).await;
				let _ = socket.shutdown().await;
			}
		});

		Self {
			url,
			requests,
			task,
		}
	}

	/// Raw requests received so far; the request line and headers are lowercased
	pub fn requests(&self) -> Vec<String> {
		self.requests.lock().unwrap().clone()
	}
}

impl Drop for ScriptedEndpoint {
	fn drop(&mut self) {
		self.task.abort();
	}
}

async fn read_request(socket: &mut TcpStream) -> String {
	let mut buf = Vec::new();
	let mut chunk = [0u8; 1024];
	loop {
		let n = socket.read(&mut chunk).await.unwrap_or(0);
		if n == 0 {
			break;
		}
		buf.extend_from_slice(&chunk[..n]);

		let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
			continue;
		};
		let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
		let body_len = head
			.lines()
			.find_map(|line| line.strip_prefix("content-length:"))
			.and_then(|value| value.trim().parse::<usize>().ok())
			.unwrap_or(0);
		if buf.len() >= head_end + 4 + body_len {
			let body = String::from_utf8_lossy(&buf[head_end + 4..]);
			return format!("{}\r\n\r\n{}", head, body);
		}
	}
	String::from_utf8_lossy(&buf).to_lowercase()
}
