//! Scripted in-memory transport for exercising the session layer.
//!
//! Each request pops the next [`Scripted`] outcome. When the script is empty
//! the optional responder decides, and without one every request receives
//! `204 No Content`.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new().build();
//! controller.push(Scripted::Reply(HttpResponse::json(r#"{"key":"k"}"#)));
//!
//! let runtime = Runtime::new(transport, RuntimeConfig::default())?;
//! let value = runtime.seal("https://h/obj").invoke(Invocation::post("run")).await;
//!
//! let sent = controller.take_sent();
//! assert_eq!(sent[0].request.param("q"), Some("create"));
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use websend_protocol::{HttpRequest, HttpResponse};

use crate::error::Error;
use crate::transport::{Heartbeat, SendFuture, Transport};

type Responder = Box<dyn Fn(&HttpRequest) -> Scripted + Send + Sync>;

/// Outcome of one scripted exchange.
#[derive(Debug, Clone)]
pub enum Scripted {
	/// Respond immediately.
	Reply(HttpResponse),
	/// Respond after `after` without any intermediate activity.
	Delay { after: Duration, response: HttpResponse },
	/// Never respond and never beat.
	Stall,
	/// Fail with a transport error.
	Fail(String),
	/// Beat `beats` times, `interval` apart, then respond.
	Trickle {
		beats: u32,
		interval: Duration,
		response: HttpResponse,
	},
}

/// A request observed by the fake transport.
#[derive(Debug, Clone)]
pub struct SentRequest {
	pub request: HttpRequest,
	pub at: Instant,
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
	responder: Option<Responder>,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Decides outcomes once the script runs dry.
	pub fn responder<F>(mut self, responder: F) -> Self
	where
		F: Fn(&HttpRequest) -> Scripted + Send + Sync + 'static,
	{
		self.responder = Some(Box::new(responder));
		self
	}

	/// Returns the transport and a controller sharing its script and log.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let shared = Arc::new(Shared {
			script: Mutex::new(VecDeque::new()),
			sent: Mutex::new(Vec::new()),
			aborted: AtomicUsize::new(0),
			responder: self.responder,
		});
		(FakeTransport { shared: Arc::clone(&shared) }, FakeTransportController { shared })
	}
}

struct Shared {
	script: Mutex<VecDeque<Scripted>>,
	sent: Mutex<Vec<SentRequest>>,
	aborted: AtomicUsize,
	responder: Option<Responder>,
}

impl Shared {
	fn next_outcome(&self, request: &HttpRequest) -> Scripted {
		if let Some(outcome) = self.script.lock().pop_front() {
			return outcome;
		}
		match &self.responder {
			Some(responder) => responder(request),
			None => Scripted::Reply(HttpResponse::new(204).with_phrase("No Content")),
		}
	}
}

/// In-memory [`Transport`] driven by a script.
pub struct FakeTransport {
	shared: Arc<Shared>,
}

impl Transport for FakeTransport {
	fn send(&self, request: HttpRequest, heartbeat: Heartbeat) -> SendFuture {
		let outcome = self.shared.next_outcome(&request);
		self.shared.sent.lock().push(SentRequest {
			request,
			at: Instant::now(),
		});
		let shared = Arc::clone(&self.shared);

		Box::pin(async move {
			match outcome {
				Scripted::Reply(response) => {
					heartbeat.beat();
					Ok(response)
				}
				Scripted::Delay { after, response } => {
					tokio::time::sleep(after).await;
					heartbeat.beat();
					Ok(response)
				}
				Scripted::Fail(reason) => Err(Error::TransportError(reason)),
				Scripted::Trickle { beats, interval, response } => {
					for _ in 0..beats {
						tokio::time::sleep(interval).await;
						heartbeat.beat();
					}
					Ok(response)
				}
				Scripted::Stall => {
					let _guard = AbortGuard(shared);
					std::future::pending::<()>().await;
					Err(Error::ChannelClosed)
				}
			}
		})
	}
}

/// Counts stalled exchanges that were dropped before completing.
struct AbortGuard(Arc<Shared>);

impl Drop for AbortGuard {
	fn drop(&mut self) {
		self.0.aborted.fetch_add(1, Ordering::SeqCst);
	}
}

/// Controller for scripting outcomes and inspecting sent requests.
#[derive(Clone)]
pub struct FakeTransportController {
	shared: Arc<Shared>,
}

impl FakeTransportController {
	/// Appends an outcome to the script.
	pub fn push(&self, outcome: Scripted) {
		self.shared.script.lock().push_back(outcome);
	}

	/// Appends an immediate reply to the script.
	pub fn reply(&self, response: HttpResponse) {
		self.push(Scripted::Reply(response));
	}

	/// Take all sent requests, clearing the log.
	pub fn take_sent(&self) -> Vec<SentRequest> {
		std::mem::take(&mut *self.shared.sent.lock())
	}

	pub fn sent_count(&self) -> usize {
		self.shared.sent.lock().len()
	}

	/// Number of stalled exchanges that were aborted.
	pub fn aborted(&self) -> usize {
		self.shared.aborted.load(Ordering::SeqCst)
	}
}
