//! HTTP verbs and their retry safety.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Request verb of a remote invocation.
///
/// Idempotence decides whether a request may be retried over a fresh
/// connection before the origin has assigned a session key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verb {
	Get,
	Head,
	Put,
	Delete,
	Options,
	Trace,
	Post,
	/// Any other method; treated as non-idempotent.
	Extension(String),
}

impl Verb {
	/// Returns `true` for verbs that are safe to issue more than once.
	pub fn is_idempotent(&self) -> bool {
		matches!(self, Self::Get | Self::Head | Self::Put | Self::Delete | Self::Options | Self::Trace)
	}

	/// Returns the method token sent on the wire.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Get => "GET",
			Self::Head => "HEAD",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
			Self::Options => "OPTIONS",
			Self::Trace => "TRACE",
			Self::Post => "POST",
			Self::Extension(method) => method,
		}
	}
}

impl From<&str> for Verb {
	fn from(method: &str) -> Self {
		match method.to_ascii_uppercase().as_str() {
			"GET" => Self::Get,
			"HEAD" => Self::Head,
			"PUT" => Self::Put,
			"DELETE" => Self::Delete,
			"OPTIONS" => Self::Options,
			"TRACE" => Self::Trace,
			"POST" => Self::Post,
			other => Self::Extension(other.to_string()),
		}
	}
}

impl From<String> for Verb {
	fn from(method: String) -> Self {
		Self::from(method.as_str())
	}
}

impl From<Verb> for String {
	fn from(verb: Verb) -> Self {
		verb.as_str().to_string()
	}
}

impl fmt::Display for Verb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
