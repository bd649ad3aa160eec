use websend_protocol::wire::{CREATE_QUERY, SESSIONS_HREF};
use websend_protocol::{HttpRequest, SessionParams, Verb, request_uri, uri};

use crate::codec;
use crate::error::Result;
use crate::reference::{Invocation, Resolver};
use crate::value::Value;

/// Where the result of a message goes.
pub(crate) enum Completion {
	Caller(Resolver),
	/// The synthetic session-create request; its result is the session key.
	Handshake,
}

/// A queued request.
pub(crate) struct Message {
	pub id: u64,
	pub target: String,
	pub invocation: Invocation,
	pub completion: Completion,
}

impl Message {
	pub fn new(id: u64, target: &str, invocation: Invocation, resolver: Resolver) -> Self {
		Self {
			id,
			target: target.to_string(),
			invocation,
			completion: Completion::Caller(resolver),
		}
	}

	/// Session-create request for the origin of `target`.
	pub fn handshake(id: u64, target: &str) -> Self {
		Self {
			id,
			target: uri::resolve(target, SESSIONS_HREF),
			invocation: Invocation::new(Verb::Post)
				.with_query(CREATE_QUERY)
				.with_body(Value::Array(Vec::new())),
			completion: Completion::Handshake,
		}
	}

	pub fn is_handshake(&self) -> bool {
		matches!(self.completion, Completion::Handshake)
	}

	pub fn is_idempotent(&self) -> bool {
		self.invocation.verb.is_idempotent()
	}

	/// Carries `x` and `w`. The handshake is the one non-idempotent message
	/// that is not.
	pub fn is_session_bound(&self) -> bool {
		!self.is_handshake() && !self.is_idempotent()
	}

	pub fn to_request(&self, session: Option<SessionParams<'_>>) -> Result<HttpRequest> {
		let uri = request_uri(&self.target, self.invocation.query.as_deref(), session);
		let request = HttpRequest::new(self.invocation.verb.clone(), uri);
		match &self.invocation.body {
			Some(body) => Ok(request.with_body(codec::encode(body, &self.target)?)),
			None => Ok(request),
		}
	}

	/// Delivers `value` to the caller. Handshake results are consumed by the
	/// session before they get here.
	pub fn resolve(self, value: Value) {
		if let Completion::Caller(resolver) = self.completion {
			let _ = resolver.send(value);
		}
	}
}
