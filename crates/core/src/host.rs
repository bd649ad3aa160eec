//! The page hosting the client.

use parking_lot::Mutex;

/// Page-level effects the [`Web`](crate::Web) facade performs on behalf of
/// its caller.
///
/// Every method taking a URI is only ever called with a URI read out of a
/// reference; sandboxed code cannot reach the host with a raw string.
pub trait Host: Send + Sync {
	/// Absolute URI of the current page.
	fn location(&self) -> String;

	fn navigate(&self, uri: &str);

	/// Sets `attribute` of `element` (for example `href` or `src`) to `uri`.
	fn set_attribute(&self, element: &str, attribute: &str, uri: &str);

	fn title(&self) -> String;

	fn set_title(&self, title: &str);
}

/// An attribute write recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWrite {
	pub element: String,
	pub attribute: String,
	pub uri: String,
}

#[derive(Debug, Default)]
struct Page {
	location: String,
	title: String,
	navigations: Vec<String>,
	attributes: Vec<AttributeWrite>,
}

/// In-memory host that records every effect.
#[derive(Debug, Default)]
pub struct MemoryHost {
	page: Mutex<Page>,
}

impl MemoryHost {
	pub fn new(location: impl Into<String>) -> Self {
		Self {
			page: Mutex::new(Page {
				location: location.into(),
				..Page::default()
			}),
		}
	}

	/// URIs navigated to, oldest first.
	pub fn navigations(&self) -> Vec<String> {
		self.page.lock().navigations.clone()
	}

	pub fn attributes(&self) -> Vec<AttributeWrite> {
		self.page.lock().attributes.clone()
	}

	/// Latest value written to `attribute` of `element`.
	pub fn attribute(&self, element: &str, attribute: &str) -> Option<String> {
		self.page
			.lock()
			.attributes
			.iter()
			.rev()
			.find(|write| write.element == element && write.attribute == attribute)
			.map(|write| write.uri.clone())
	}
}

impl Host for MemoryHost {
	fn location(&self) -> String {
		self.page.lock().location.clone()
	}

	fn navigate(&self, uri: &str) {
		let mut page = self.page.lock();
		page.location = uri.to_string();
		page.navigations.push(uri.to_string());
	}

	fn set_attribute(&self, element: &str, attribute: &str, uri: &str) {
		self.page.lock().attributes.push(AttributeWrite {
			element: element.to_string(),
			attribute: attribute.to_string(),
			uri: uri.to_string(),
		});
	}

	fn title(&self) -> String {
		self.page.lock().title.clone()
	}

	fn set_title(&self, title: &str) {
		self.page.lock().title = title.to_string();
	}
}
