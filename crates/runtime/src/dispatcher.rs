use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use websend_protocol::uri;

use crate::config::RuntimeConfig;
use crate::reference::{Invocation, Promise, Resolver, Sealer};
use crate::session::{Session, SessionSnapshot};
use crate::transport::Transport;
use crate::value::{Rejected, Value};

struct Worker {
	session: Arc<Session>,
	task: JoinHandle<()>,
}

/// Routes requests to the session of their origin.
pub(crate) struct Dispatcher {
	transport: Arc<dyn Transport>,
	config: RuntimeConfig,
	handle: Handle,
	sealer: Sealer,
	sessions: Mutex<HashMap<String, Worker>>,
}

impl Dispatcher {
	pub fn new(transport: Arc<dyn Transport>, config: RuntimeConfig, handle: Handle) -> Arc<Self> {
		Arc::new_cyclic(|this: &Weak<Self>| Self {
			transport,
			config,
			handle,
			sealer: Sealer::new(this.clone()),
			sessions: Mutex::new(HashMap::new()),
		})
	}

	pub fn sealer(&self) -> &Sealer {
		&self.sealer
	}

	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	/// Queues `invocation` on `target` and returns its eventual result.
	pub fn send(&self, target: &str, invocation: Invocation) -> Promise {
		let (resolver, promise) = Promise::channel();
		self.route(target, invocation, resolver);
		promise
	}

	fn route(&self, target: &str, invocation: Invocation, resolver: Resolver) {
		let Some(origin) = uri::origin(target) else {
			warn!(target: "websend.dispatch", "reference has no origin; rejecting");
			let _ = resolver.send(Value::Rejected(Rejected::broken("reference has no origin")));
			return;
		};
		self.session_for(origin).enqueue(target, invocation, resolver);
	}

	fn session_for(&self, origin: &str) -> Arc<Session> {
		let mut sessions = self.sessions.lock();
		if let Some(worker) = sessions.get(origin) {
			return Arc::clone(&worker.session);
		}

		debug!(target: "websend.dispatch", origin, "opening session");
		let session = Arc::new(Session::new(
			origin,
			Arc::clone(&self.transport),
			self.config.clone(),
			self.sealer.clone(),
		));
		let task = self.handle.spawn(Arc::clone(&session).run());
		sessions.insert(
			origin.to_string(),
			Worker {
				session: Arc::clone(&session),
				task,
			},
		);
		session
	}

	pub fn snapshot(&self, origin: &str) -> Option<SessionSnapshot> {
		self.sessions.lock().get(origin).map(|worker| worker.session.snapshot())
	}

	pub fn spawn<F>(&self, future: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.handle.spawn(future);
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		for (origin, worker) in self.sessions.get_mut().drain() {
			debug!(target: "websend.dispatch", origin = %origin, "stopping session");
			worker.task.abort();
		}
	}
}
