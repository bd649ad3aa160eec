use std::sync::Arc;

use tokio::runtime::Handle;
use websend_protocol::uri;

use crate::config::RuntimeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::http::HttpTransport;
use crate::reference::{Reference, Unsealer};
use crate::session::SessionSnapshot;
use crate::transport::Transport;

/// Owns the origin map and the sealer.
///
/// Cloning is cheap and shares state. When the last clone is dropped every
/// session worker is aborted; outstanding promises then resolve to a
/// `Broken` rejection and existing references stop dispatching.
#[derive(Clone)]
pub struct Runtime {
	dispatcher: Arc<Dispatcher>,
}

impl Runtime {
	/// Creates a runtime on the current tokio runtime.
	pub fn new<T>(transport: T, config: RuntimeConfig) -> Result<Self>
	where
		T: Transport + 'static,
	{
		config.validate()?;
		let handle = Handle::try_current().map_err(|e| Error::RuntimeUnavailable(e.to_string()))?;
		Ok(Self {
			dispatcher: Dispatcher::new(Arc::new(transport), config, handle),
		})
	}

	/// Creates a runtime backed by [`HttpTransport`].
	pub fn http(config: RuntimeConfig) -> Result<Self> {
		Self::new(HttpTransport::new()?, config)
	}

	/// Mints a reference to the absolute URI `uri`.
	///
	/// This is the trusted entry point for turning a string into a
	/// capability; hand sandboxed code references, not the runtime.
	pub fn seal(&self, uri: &str) -> Reference {
		self.dispatcher.sealer().seal(uri)
	}

	/// Mints a token able to read URIs out of references.
	pub fn unsealer(&self) -> Unsealer {
		Unsealer::new(Arc::downgrade(&self.dispatcher))
	}

	/// Current state of the session for `origin` (or any URI on it).
	pub fn session(&self, origin: &str) -> Option<SessionSnapshot> {
		self.dispatcher.snapshot(uri::origin(origin)?)
	}

	pub fn config(&self) -> &RuntimeConfig {
		self.dispatcher.config()
	}
}

impl std::fmt::Debug for Runtime {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runtime").field("config", self.config()).finish_non_exhaustive()
	}
}
