//! One in-flight attempt at a time, guarded by a heartbeat watchdog.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use websend_protocol::{HttpRequest, HttpResponse};

use crate::config::RuntimeConfig;
use crate::error::Error;
use crate::transport::{Heartbeat, Transport};

/// Result of issuing a request once.
pub(crate) enum Attempt {
	Completed(HttpResponse),
	Failed(Error),
	/// No activity within the budget; the transport task was aborted.
	Stalled,
}

/// Aborts the attempt task if the awaiting side goes away.
struct AbortOnDrop(JoinHandle<crate::error::Result<HttpResponse>>);

impl Drop for AbortOnDrop {
	fn drop(&mut self) {
		self.0.abort();
	}
}

pub(crate) struct Connection {
	transport: Arc<dyn Transport>,
	heartbeat: Heartbeat,
	budget: Duration,
}

impl Connection {
	pub fn open(transport: Arc<dyn Transport>, budget: Duration) -> Self {
		Self {
			transport,
			heartbeat: Heartbeat::new(),
			budget,
		}
	}

	/// A fresh connection with a doubled budget.
	pub fn successor(&self, config: &RuntimeConfig) -> Self {
		Self::open(Arc::clone(&self.transport), config.next_stall_timeout(self.budget))
	}

	pub fn budget(&self) -> Duration {
		self.budget
	}

	fn deadline(&self) -> Instant {
		self.heartbeat.last() + self.budget
	}

	/// Issues `request` and waits for it to finish.
	///
	/// Without `replaceable` the watchdog is disarmed and the attempt is
	/// awaited however long it takes.
	pub async fn issue(&self, request: HttpRequest, replaceable: bool) -> Attempt {
		self.heartbeat.beat();
		let mut attempt = AbortOnDrop(tokio::spawn(self.transport.send(request, self.heartbeat.clone())));
		loop {
			tokio::select! {
				joined = &mut attempt.0 => {
					return match joined {
						Ok(Ok(response)) => Attempt::Completed(response),
						Ok(Err(err)) => Attempt::Failed(err),
						Err(join) => Attempt::Failed(Error::TransportError(join.to_string())),
					};
				}
				() = tokio::time::sleep_until(self.deadline()), if replaceable => {
					if self.deadline() <= Instant::now() {
						attempt.0.abort();
						return Attempt::Stalled;
					}
				}
			}
		}
	}

	/// Sleeps until the watchdog would have expired.
	pub async fn wait_out(&self) {
		tokio::time::sleep_until(self.deadline()).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake_transport::{FakeTransportBuilder, Scripted};
	use websend_protocol::Verb;

	fn request() -> HttpRequest {
		HttpRequest::new(Verb::Get, "https://h/a")
	}

	#[tokio::test(start_paused = true)]
	async fn silent_attempt_stalls_after_budget() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push(Scripted::Stall);
		let connection = Connection::open(Arc::new(transport), Duration::from_secs(30));

		let started = Instant::now();
		assert!(matches!(connection.issue(request(), true).await, Attempt::Stalled));
		assert_eq!(started.elapsed(), Duration::from_secs(30));
		tokio::time::sleep(Duration::from_millis(1)).await;
		assert_eq!(controller.aborted(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn heartbeats_extend_the_deadline() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push(Scripted::Trickle {
			beats: 4,
			interval: Duration::from_secs(20),
			response: HttpResponse::new(204),
		});
		let connection = Connection::open(Arc::new(transport), Duration::from_secs(30));

		let outcome = connection.issue(request(), true).await;
		assert!(matches!(outcome, Attempt::Completed(ref r) if r.status == 204));
		assert_eq!(controller.aborted(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn unreplaceable_attempt_is_awaited() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push(Scripted::Delay {
			after: Duration::from_secs(600),
			response: HttpResponse::new(200),
		});
		let connection = Connection::open(Arc::new(transport), Duration::from_secs(30));

		let started = Instant::now();
		assert!(matches!(connection.issue(request(), false).await, Attempt::Completed(_)));
		assert_eq!(started.elapsed(), Duration::from_secs(600));
	}

	#[tokio::test(start_paused = true)]
	async fn successor_doubles_budget_up_to_cap() {
		let (transport, _controller) = FakeTransportBuilder::new().build();
		let config = RuntimeConfig::default()
			.with_stall_timeout(Duration::from_secs(30))
			.with_max_stall_timeout(Duration::from_secs(100));
		let first = Connection::open(Arc::new(transport), config.stall_timeout);
		let second = first.successor(&config);
		let third = second.successor(&config);
		assert_eq!(second.budget(), Duration::from_secs(60));
		assert_eq!(third.budget(), Duration::from_secs(100));
	}

	#[tokio::test(start_paused = true)]
	async fn transport_failure_is_reported() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push(Scripted::Fail("reset".into()));
		let connection = Connection::open(Arc::new(transport), Duration::from_secs(30));
		assert!(matches!(connection.issue(request(), true).await, Attempt::Failed(Error::TransportError(_))));

		let started = Instant::now();
		connection.wait_out().await;
		assert_eq!(started.elapsed(), Duration::from_secs(30));
	}
}
