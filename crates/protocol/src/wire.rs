//! Request and response shapes as they cross the transport boundary.

use serde::{Deserialize, Serialize};

use crate::verb::Verb;

/// Content type of every non-empty request body.
pub const TEXT_PLAIN: &str = "text/plain";

/// Response content type whose body is returned as raw text, never decoded.
pub const OPAQUE_CONTENT_TYPE: &str = "application/do-not-execute";

/// Marker key of an embedded reference.
pub const REF_KEY: &str = "@";

/// Marker key of an embedded rejection.
pub const REJECTED_KEY: &str = "!";

/// Marker key of a wrapped top-level scalar.
pub const SCALAR_KEY: &str = "=";

/// Type list key of the legacy typed-object form.
pub const TYPE_KEY: &str = "$";

/// Legacy type name of a rejected promise.
pub const LEGACY_REJECTED_TYPE: &str = "org.ref_send.promise.Rejected";

/// Href, relative to any target on an origin, of that origin's session maker.
pub const SESSIONS_HREF: &str = "./#s=sessions";

/// Query sent with the session-create handshake.
pub const CREATE_QUERY: &str = "create";

/// Body sent with the session-create handshake.
pub const CREATE_BODY: &str = "[]";

/// A request as handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
	pub method: Verb,
	/// Absolute request URI, without fragment.
	pub uri: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
}

impl HttpRequest {
	pub fn new(method: Verb, uri: impl Into<String>) -> Self {
		Self {
			method,
			uri: uri.into(),
			content_type: None,
			body: None,
		}
	}

	/// Attaches a plain-text body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.content_type = Some(TEXT_PLAIN.to_string());
		self.body = Some(body.into());
		self
	}

	/// Returns the value of the named query parameter, undecoded.
	pub fn param(&self, name: &str) -> Option<&str> {
		crate::uri::query(&self.uri)?
			.split('&')
			.find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
	}
}

/// A response as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpResponse {
	pub status: u16,
	#[serde(default)]
	pub phrase: String,
	#[serde(default)]
	pub headers: Vec<(String, String)>,
	#[serde(default)]
	pub body: String,
}

impl HttpResponse {
	pub fn new(status: u16) -> Self {
		Self {
			status,
			..Self::default()
		}
	}

	/// A `200 OK` response carrying `body` as JSON.
	pub fn json(body: impl Into<String>) -> Self {
		Self::new(200).with_phrase("OK").with_header("Content-Type", "application/json").with_body(body)
	}

	pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
		self.phrase = phrase.into();
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = body.into();
		self
	}

	/// Looks up a header by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns `true` when the body must be handed over as raw text.
	pub fn is_opaque(&self) -> bool {
		self.header("Content-Type")
			.and_then(|value| value.split(';').next())
			.is_some_and(|media| media.trim().eq_ignore_ascii_case(OPAQUE_CONTENT_TYPE))
	}
}
