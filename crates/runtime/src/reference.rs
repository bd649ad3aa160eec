//! Sealed remote references.
//!
//! A [`Reference`] carries exactly one absolute URI, but nothing in its public
//! API returns that URI. The only path out is [`Invocable::expose`], which
//! yields an opaque [`Exposed`] token that only an [`Unsealer`] can open, and
//! unsealers are minted only by the [`Runtime`](crate::Runtime). An unsealer
//! opens only references sealed by its own runtime. Code that is handed
//! references but not an unsealer can pass them around and invoke them, never
//! read or forge them.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use websend_protocol::{Verb, uri};

use crate::dispatcher::Dispatcher;
use crate::value::{Rejected, Value};

/// Sending half of a [`Promise`].
pub(crate) type Resolver = oneshot::Sender<Value>;

/// An operation to perform on a remote object.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
	pub verb: Verb,
	/// Application-supplied `q` parameter.
	pub query: Option<String>,
	pub body: Option<Value>,
}

impl Invocation {
	pub fn new(verb: Verb) -> Self {
		Self {
			verb,
			query: None,
			body: None,
		}
	}

	pub fn get() -> Self {
		Self::new(Verb::Get)
	}

	/// A `POST` carrying `q`.
	pub fn post(query: impl Into<String>) -> Self {
		Self::new(Verb::Post).with_query(query)
	}

	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = Some(query.into());
		self
	}

	pub fn with_body(mut self, body: impl Into<Value>) -> Self {
		self.body = Some(body.into());
		self
	}
}

/// Capability-carrying values.
///
/// Implemented for [`Reference`], [`Rejected`] and [`Value`]; the `Value`
/// impl dispatches on the variant.
pub trait Invocable {
	/// Hands out the sealed URI, if there is one.
	fn expose(&self) -> Option<Exposed>;

	/// Resolves once the value is settled.
	fn when(&self) -> Promise;

	/// Sends `invocation` to the denoted object.
	fn invoke(&self, invocation: Invocation) -> Promise;
}

/// A capability bound to one absolute URI.
///
/// Equality and hashing compare URIs. Formatting never reveals the URI.
#[derive(Clone)]
pub struct Reference {
	uri: Arc<str>,
	dispatcher: Weak<Dispatcher>,
}

impl Reference {
	/// Returns `false` while the reference still denotes an unresolved promise.
	pub fn is_settled(&self) -> bool {
		!uri::is_promise(&self.uri)
	}

	pub(crate) fn uri(&self) -> &str {
		&self.uri
	}

	fn dispatch(&self, invocation: Invocation) -> Promise {
		match self.dispatcher.upgrade() {
			Some(dispatcher) => dispatcher.send(&self.uri, invocation),
			None => Promise::broken(),
		}
	}

	/// Issues a `GET` to settle this promise, then continues with `then`.
	fn settle_then<F>(&self, then: F) -> Promise
	where
		F: FnOnce(Value) -> Promise + Send + 'static,
	{
		let Some(dispatcher) = self.dispatcher.upgrade() else {
			return Promise::broken();
		};
		let settled = dispatcher.send(&self.uri, Invocation::get());
		let (resolver, promise) = Promise::channel();
		dispatcher.spawn(async move {
			let value = then(settled.await).await;
			let _ = resolver.send(value);
		});
		promise
	}
}

impl Invocable for Reference {
	fn expose(&self) -> Option<Exposed> {
		Some(Exposed {
			uri: Arc::clone(&self.uri),
			dispatcher: self.dispatcher.clone(),
		})
	}

	fn when(&self) -> Promise {
		if self.is_settled() {
			return Promise::ready(Value::Ref(self.clone()));
		}
		self.settle_then(|value| match value {
			Value::Ref(settled) => settled.when(),
			other => Promise::ready(other),
		})
	}

	fn invoke(&self, invocation: Invocation) -> Promise {
		if self.is_settled() {
			return self.dispatch(invocation);
		}
		self.settle_then(move |value| match value {
			Value::Ref(settled) => settled.invoke(invocation),
			Value::Rejected(rejected) => Promise::ready(Value::Rejected(rejected)),
			_ => Promise::ready(Value::Rejected(Rejected::broken("promise settled to a value that cannot be invoked"))),
		})
	}
}

impl PartialEq for Reference {
	fn eq(&self, other: &Self) -> bool {
		self.uri == other.uri
	}
}

impl Eq for Reference {}

impl Hash for Reference {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.uri.hash(state);
	}
}

impl fmt::Debug for Reference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Reference(<sealed>)")
	}
}

impl Invocable for Rejected {
	fn expose(&self) -> Option<Exposed> {
		None
	}

	fn when(&self) -> Promise {
		Promise::ready(Value::Rejected(self.clone()))
	}

	fn invoke(&self, _invocation: Invocation) -> Promise {
		Promise::ready(Value::Rejected(self.clone()))
	}
}

impl Invocable for Value {
	fn expose(&self) -> Option<Exposed> {
		match self {
			Value::Ref(reference) => reference.expose(),
			_ => None,
		}
	}

	fn when(&self) -> Promise {
		match self {
			Value::Ref(reference) => reference.when(),
			Value::Rejected(rejected) => rejected.when(),
			data => Promise::ready(data.clone()),
		}
	}

	fn invoke(&self, invocation: Invocation) -> Promise {
		match self {
			Value::Ref(reference) => reference.invoke(invocation),
			Value::Rejected(rejected) => rejected.invoke(invocation),
			_ => Promise::ready(Value::Rejected(Rejected::broken("value cannot be invoked"))),
		}
	}
}

/// Mints references. Held by the runtime and the codec only.
#[derive(Clone)]
pub(crate) struct Sealer {
	dispatcher: Weak<Dispatcher>,
}

impl Sealer {
	pub(crate) fn new(dispatcher: Weak<Dispatcher>) -> Self {
		Self { dispatcher }
	}

	pub(crate) fn seal(&self, uri: impl Into<Arc<str>>) -> Reference {
		Reference {
			uri: uri.into(),
			dispatcher: self.dispatcher.clone(),
		}
	}
}

/// A sealed URI in transit from [`Invocable::expose`] to an [`Unsealer`].
pub struct Exposed {
	uri: Arc<str>,
	dispatcher: Weak<Dispatcher>,
}

impl fmt::Debug for Exposed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Exposed(<sealed>)")
	}
}

/// Recovers URIs from references sealed by the same runtime. Obtained from
/// [`Runtime::unsealer`](crate::Runtime::unsealer).
#[derive(Clone)]
pub struct Unsealer {
	dispatcher: Weak<Dispatcher>,
}

impl Unsealer {
	pub(crate) fn new(dispatcher: Weak<Dispatcher>) -> Self {
		Self { dispatcher }
	}

	/// Returns `None` for a token exposed by another runtime's reference.
	pub fn open(&self, exposed: Exposed) -> Option<String> {
		Weak::ptr_eq(&exposed.dispatcher, &self.dispatcher).then(|| exposed.uri.to_string())
	}

	/// Returns the URI iff `value` is a reference sealed by this runtime.
	pub fn unseal(&self, value: &Value) -> Option<String> {
		self.open(value.expose()?)
	}

	pub fn unseal_reference(&self, reference: &Reference) -> Option<String> {
		self.open(reference.expose()?)
	}
}

impl fmt::Debug for Unsealer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Unsealer")
	}
}

/// Eventual result of an invocation.
///
/// The request is already queued by the time a promise is returned, so
/// dropping a promise does not cancel anything. A promise whose producer goes
/// away resolves to a `Broken` rejection.
#[derive(Debug)]
pub struct Promise {
	state: PromiseState,
}

#[derive(Debug)]
enum PromiseState {
	Ready(Option<Value>),
	Waiting(oneshot::Receiver<Value>),
}

impl Promise {
	pub fn ready(value: Value) -> Self {
		Self {
			state: PromiseState::Ready(Some(value)),
		}
	}

	pub(crate) fn channel() -> (Resolver, Self) {
		let (resolver, receiver) = oneshot::channel();
		(
			resolver,
			Self {
				state: PromiseState::Waiting(receiver),
			},
		)
	}

	fn broken() -> Self {
		Self::ready(Value::Rejected(Rejected::broken("runtime dropped")))
	}
}

impl Future for Promise {
	type Output = Value;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Value> {
		match &mut self.state {
			PromiseState::Ready(value) => Poll::Ready(value.take().unwrap_or_default()),
			PromiseState::Waiting(receiver) => Pin::new(receiver)
				.poll(cx)
				.map(|result| result.unwrap_or_else(|_| Value::Rejected(Rejected::broken("resolver dropped")))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	fn detached(uri: &str) -> Reference {
		Sealer::new(Weak::new()).seal(uri)
	}

	#[test]
	fn equality_and_hash_follow_uri() {
		let mut set = HashSet::new();
		set.insert(detached("https://h/a"));
		set.insert(detached("https://h/a"));
		set.insert(detached("https://h/b"));
		assert_eq!(set.len(), 2);
	}

	#[test]
	fn debug_output_hides_uri() {
		let reference = detached("https://h/secret#s=key");
		let text = format!("{reference:?} {:?}", reference.expose());
		assert!(!text.contains("secret"));
		assert!(!text.contains("key"));
	}

	#[test]
	fn unsealer_reads_only_references() {
		let unsealer = Unsealer::new(Weak::new());
		let reference = detached("https://h/a#s=k");
		assert_eq!(unsealer.unseal(&Value::Ref(reference)).as_deref(), Some("https://h/a#s=k"));
		assert_eq!(unsealer.unseal(&Value::from("https://h/a#s=k")), None);
		assert_eq!(unsealer.unseal(&Value::Rejected(Rejected::not_yet())), None);
		assert_eq!(unsealer.unseal(&Value::Null), None);
	}

	#[test]
	fn promise_marker_means_unsettled() {
		assert!(!detached("https://h/a/#o=&s=p").is_settled());
		assert!(detached("https://h/a/#s=p").is_settled());
	}

	#[tokio::test]
	async fn settled_reference_resolves_to_itself() {
		let reference = detached("https://h/a");
		assert_eq!(reference.when().await, Value::Ref(reference.clone()));
	}

	#[tokio::test]
	async fn rejection_propagates_through_invoke() {
		let rejected = Rejected::failure(410, "Gone");
		assert_eq!(rejected.invoke(Invocation::get()).await, Value::Rejected(rejected.clone()));
		assert_eq!(Value::from(rejected.clone()).when().await, Value::Rejected(rejected));
	}

	#[tokio::test]
	async fn plain_data_settles_but_cannot_be_invoked() {
		assert_eq!(Value::from(7.0).when().await, Value::from(7.0));
		let result = Value::from("x").invoke(Invocation::get()).await;
		assert_eq!(result.as_rejected().and_then(Rejected::kind), Some("Broken"));
	}

	#[tokio::test]
	async fn detached_reference_is_broken() {
		let result = detached("https://h/a").invoke(Invocation::post("go")).await;
		assert_eq!(result.as_rejected().and_then(Rejected::kind), Some("Broken"));
	}

	#[tokio::test]
	async fn dropped_resolver_breaks_promise() {
		let (resolver, promise) = Promise::channel();
		drop(resolver);
		assert_eq!(promise.await.as_rejected().and_then(Rejected::kind), Some("Broken"));
	}
}
