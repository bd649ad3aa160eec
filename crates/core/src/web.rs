//! Capability-boundary operations for trusted page code.
//!
//! [`Web`] is the only place, besides [`Runtime::seal`], where a string
//! becomes a reference or a reference becomes a string again. Everything it
//! hands to the [`Host`] has been unsealed first; a value that does not
//! unseal is refused without touching the host.

use tracing::debug;
use websend_protocol::{uri, with_args};
use websend_runtime::{Reference, Runtime, Unsealer, Value};

use crate::host::Host;

pub struct Web<H> {
	runtime: Runtime,
	host: H,
	unsealer: Unsealer,
}

impl<H: Host> Web<H> {
	pub fn new(runtime: Runtime, host: H) -> Self {
		let unsealer = runtime.unsealer();
		Self { runtime, host, unsealer }
	}

	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	/// Reference to the current page.
	///
	/// Returns `None` when the host reports a location that is not an
	/// absolute URI.
	pub fn page(&self) -> Option<Reference> {
		let location = self.host.location();
		if uri::origin(&location).is_none() {
			debug!(target: "websend.web", "host location is not an absolute URI");
			return None;
		}
		Some(self.runtime.seal(&location))
	}

	/// Mints a reference to `href` resolved against `base` with `args`
	/// appended to its query.
	///
	/// Without a base, `href` is resolved against the page location. Returns
	/// `None` if `base` is given but is not a reference, or if the result is
	/// not an absolute URI.
	pub fn construct(&self, base: Option<&Value>, href: &str, args: &[(&str, &str)]) -> Option<Reference> {
		let base = match base {
			Some(value) => self.unsealer.unseal(value)?,
			None => self.host.location(),
		};
		if !uri::is_absolute(&base) && !uri::is_absolute(href) {
			return None;
		}
		let target = with_args(&uri::resolve(&base, href), args);
		uri::origin(&target)?;
		Some(self.runtime.seal(&target))
	}

	/// Reads the URI out of `value`.
	///
	/// When `base` is also a reference the result is relative to it. Returns
	/// `None` if `value` is not a reference.
	pub fn extract(&self, value: &Value, base: Option<&Value>) -> Option<String> {
		let target = self.unsealer.unseal(value)?;
		match base.and_then(|base| self.unsealer.unseal(base)) {
			Some(base) => Some(drop_redundant_dot(uri::relate(&base, &target))),
			None => Some(target),
		}
	}

	/// Sends the page to the URI in `value`.
	pub fn navigate(&self, value: &Value) -> bool {
		let Some(target) = self.unsealer.unseal(value) else {
			debug!(target: "websend.web", "navigate refused: not a reference");
			return false;
		};
		self.host.navigate(&target);
		true
	}

	/// Points `attribute` of `element` at the URI in `value`.
	pub fn set_attribute(&self, element: &str, attribute: &str, value: &Value) -> bool {
		let Some(target) = self.unsealer.unseal(value) else {
			debug!(target: "websend.web", element, attribute, "attribute write refused: not a reference");
			return false;
		};
		self.host.set_attribute(element, attribute, &target);
		true
	}

	pub fn title(&self) -> String {
		self.host.title()
	}

	pub fn set_title(&self, title: &str) {
		self.host.set_title(title);
	}
}

impl<H> std::fmt::Debug for Web<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Web").field("runtime", &self.runtime).finish_non_exhaustive()
	}
}

/// Strips a leading `./` when the remainder still resolves to the same URI.
fn drop_redundant_dot(relative: String) -> String {
	let Some(rest) = relative.strip_prefix("./") else {
		return relative;
	};
	let segment_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
	let unsafe_start = rest.is_empty() || rest.starts_with(['/', '?', '#', '.']);
	if unsafe_start || rest[..segment_end].contains(':') {
		return relative;
	}
	rest.to_string()
}
