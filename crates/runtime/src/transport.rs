//! Transport abstraction for issuing wire requests.
//!
//! A transport performs exactly one HTTP exchange per call and reports
//! progress through a [`Heartbeat`]. It never retries, follows redirects or
//! interprets statuses; the session layer owns all of that.
//!
//! Cancellation is structural: the session drives each exchange on its own
//! task and aborts that task when the exchange stalls, so implementations only
//! need to be drop-safe.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use websend_protocol::{HttpRequest, HttpResponse};

use crate::error::Result;

/// Future returned by [`Transport::send`].
pub type SendFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'static>>;

/// Carries wire requests to a server.
pub trait Transport: Send + Sync {
	/// Issues `request`, calling [`Heartbeat::beat`] whenever bytes move.
	fn send(&self, request: HttpRequest, heartbeat: Heartbeat) -> SendFuture;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
	fn send(&self, request: HttpRequest, heartbeat: Heartbeat) -> SendFuture {
		(**self).send(request, heartbeat)
	}
}

/// Timestamp of the most recent transport activity of a connection.
#[derive(Debug, Clone)]
pub struct Heartbeat {
	last: Arc<Mutex<Instant>>,
}

impl Heartbeat {
	pub fn new() -> Self {
		Self {
			last: Arc::new(Mutex::new(Instant::now())),
		}
	}

	/// Records activity now.
	pub fn beat(&self) {
		*self.last.lock() = Instant::now();
	}

	pub fn last(&self) -> Instant {
		*self.last.lock()
	}
}

impl Default for Heartbeat {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test(start_paused = true)]
	async fn beat_refreshes_shared_timestamp() {
		let heartbeat = Heartbeat::new();
		let observer = heartbeat.clone();
		let started = observer.last();

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(observer.last(), started);

		heartbeat.beat();
		assert_eq!(observer.last() - started, Duration::from_secs(5));
	}
}
