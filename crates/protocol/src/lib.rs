//! Wire types and URI algebra for the web_send remote-reference protocol.
//!
//! This crate contains the pieces of the protocol that are pure data or pure
//! string functions: how references are relocated between absolute and
//! relative form, which verbs are safe to retry, how response statuses are
//! classified, and the shape of a request as it appears on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure: no I/O, no clocks, no shared state
//! * Exact: [`uri::resolve`] and [`uri::relate`] must round-trip, since
//!   embedded references travel in relative form
//! * Stable: changes only when the wire protocol changes
//!
//! The capability layer, codec and session machinery are built on top of
//! these types in `websend-runtime`.

pub mod query;
pub mod status;
pub mod uri;
pub mod verb;
pub mod wire;

pub use query::{SessionParams, request_uri, with_args};
pub use status::StatusClass;
pub use verb::Verb;
pub use wire::{HttpRequest, HttpResponse};
