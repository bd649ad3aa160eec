use thiserror::Error;

/// Errors raised inside the runtime.
///
/// None of these reach the holder of a reference directly: the session layer
/// converts them into retries or into a [`Rejected`](crate::Rejected) value.
#[derive(Debug, Error)]
pub enum Error {
	/// The transport could not complete an exchange.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// A response body was not valid wire JSON.
	#[error("Decode error: {0}")]
	DecodeError(String),

	/// The session's internal bookkeeping disagreed with the wire.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// No tokio runtime is available, or the runtime has been dropped.
	#[error("Runtime unavailable: {0}")]
	RuntimeUnavailable(String),

	/// A configuration value is out of range or unparseable.
	#[error("Config error: {0}")]
	ConfigError(String),

	/// A completion channel closed before a value was delivered.
	#[error("Channel closed")]
	ChannelClosed,
}

impl Error {
	/// Returns `true` for faults that are retried rather than surfaced.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::TransportError(_))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::DecodeError(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
