//! Assembly of the query string carried by each wire request.
//!
//! The parameter order is part of the wire contract: the application's `q`,
//! then the session pair `x`/`w`, then whatever query and fragment the
//! target already carried. Web-keys travel in the fragment of a reference and
//! are moved into the query here, since fragments never reach the server.

use crate::uri;

/// Session parameters attached to session-bound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams<'a> {
	/// Server-assigned session key.
	pub key: &'a str,
	/// Response counter at the time the request is issued.
	pub counter: u64,
}

/// Computes the URI a request against `target` is issued to.
pub fn request_uri(target: &str, q: Option<&str>, session: Option<SessionParams<'_>>) -> String {
	let mut params = Vec::new();
	if let Some(q) = q {
		params.push(format!("q={}", urlencoding::encode(q)));
	}
	if let Some(session) = session {
		params.push(format!("x={}", urlencoding::encode(session.key)));
		params.push(format!("w={}", session.counter));
	}
	if let Some(query) = uri::query(target).filter(|query| !query.is_empty()) {
		params.push(query.to_string());
	}
	if let Some(fragment) = uri::fragment(target).filter(|fragment| !fragment.is_empty()) {
		params.push(fragment.to_string());
	}

	if params.is_empty() {
		uri::resolve(target, "")
	} else {
		uri::resolve(target, &format!("?{}", params.join("&")))
	}
}

/// Appends URL-encoded `args` to the query of `uri`, ahead of any fragment.
pub fn with_args(uri: &str, args: &[(&str, &str)]) -> String {
	if args.is_empty() {
		return uri.to_string();
	}
	let head = uri::strip_fragment(uri);
	let encoded = args
		.iter()
		.map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
		.collect::<Vec<_>>()
		.join("&");
	let separator = match uri::query(uri) {
		Some("") => "",
		Some(_) => "&",
		None => "?",
	};
	match uri::fragment(uri) {
		Some(fragment) => format!("{head}{separator}{encoded}#{fragment}"),
		None => format!("{head}{separator}{encoded}"),
	}
}
