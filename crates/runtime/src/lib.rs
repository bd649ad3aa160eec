//! Client runtime for the web_send remote-reference protocol.
//!
//! A program holds [`Reference`]s, unforgeable capabilities bound to a URI,
//! and invokes operations on them through the [`Invocable`] trait. Each
//! invocation is queued on the session of the reference's origin, carried over
//! a [`Transport`], and resolved through a [`Promise`].
//!
//! # Architecture
//!
//! ```text
//! Reference::invoke ─► Dispatcher ─► Session (one per origin)
//!                                      │ worker task, FIFO queue
//!                                      ▼
//!                                  Connection ─► Transport ─► server
//!                                      │ heartbeat watchdog
//!                                      ▼
//!                                    codec ─► Promise
//! ```
//!
//! The [`Runtime`] owns the origin map and is the only place references are
//! minted from strings and URIs are read back out of references.

pub mod backoff;
pub mod codec;
pub mod config;
mod connection;
mod dispatcher;
pub mod error;
pub mod fake_transport;
pub mod http;
mod message;
pub mod reference;
mod runtime;
mod session;
pub mod transport;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use http::HttpTransport;
pub use reference::{Exposed, Invocable, Invocation, Promise, Reference, Unsealer};
pub use runtime::Runtime;
pub use session::{SessionPhase, SessionSnapshot};
pub use transport::{Heartbeat, Transport};
pub use value::{Rejected, Value};
pub use websend_protocol::{HttpRequest, HttpResponse, Verb};
