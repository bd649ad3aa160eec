//! Capability-secure remote references over HTTP.
//!
//! A [`Reference`] names an object on a remote server by an unguessable URI.
//! Holding one is the permission to use it: invoke operations with
//! [`Invocable::invoke`], pass it to other objects inside request bodies, or
//! hand it to the page through the [`Web`] facade. Code that only holds
//! references can never read the URI back out.
//!
//! # Quick Start
//!
//! ```ignore
//! use websend::{Invocable, Invocation, MemoryHost, Runtime, RuntimeConfig, Web};
//!
//! #[tokio::main]
//! async fn main() -> websend::Result<()> {
//!     websend::logging::init(1);
//!     let runtime = Runtime::http(RuntimeConfig::default())?;
//!     let web = Web::new(runtime, MemoryHost::new("https://example.com/app/#s=abc"));
//!
//!     let page = web.page().expect("absolute location");
//!     let counter = page.invoke(Invocation::get()).await;
//!     let bumped = counter.invoke(Invocation::post("increment")).await;
//!     println!("{bumped:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! * `websend-protocol`: URI algebra, verbs, status classes, wire shapes
//! * `websend-runtime`: references, codec, sessions and transports
//! * `websend` (this crate): the page-facing facade and logging setup

pub mod host;
pub mod logging;
mod web;

pub use host::{AttributeWrite, Host, MemoryHost};
pub use web::Web;
pub use websend_protocol as protocol;
pub use websend_runtime::fake_transport;
pub use websend_runtime::{
	Error, Exposed, Heartbeat, HttpRequest, HttpResponse, HttpTransport, Invocable, Invocation, Promise, Reference,
	Rejected, Result, Runtime, RuntimeConfig, SessionPhase, SessionSnapshot, Transport, Unsealer, Value, Verb,
};
