//! Per-origin request queue.
//!
//! Every origin gets one [`Session`] with one worker task. The worker drains
//! the queue strictly in order, one exchange at a time, so results reach
//! their callers in enqueue order and the response counter `w` advances by
//! exactly one per completed exchange.
//!
//! # Session keys
//!
//! Non-idempotent requests are bound to a server-assigned session key `x` and
//! the response counter `w`, which lets the server recognise a replayed
//! request. The first such request on an origin schedules a synthetic
//! `POST ?q=create` to the origin's session maker ahead of every request that
//! has not yet been put on the wire; its `{"key": ...}` result becomes the
//! session key. The handshake is issued at most once per session.
//!
//! # Retry
//!
//! * Transient statuses and transport errors leave the head queued; the
//!   connection waits out its watchdog and reissues.
//! * A stalled attempt is aborted and reissued over a replacement connection
//!   with a doubled budget, but only when the server could tell a replay
//!   apart: the key is established or the head is idempotent.
//! * A not-yet response also leaves the head queued; it is reissued after a
//!   doubling delay, and everything behind it waits.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use websend_protocol::{HttpRequest, HttpResponse, SessionParams, StatusClass};

use crate::codec;
use crate::config::RuntimeConfig;
use crate::connection::{Attempt, Connection};
use crate::error::Error;
use crate::backoff::Backoff;
use crate::message::Message;
use crate::reference::{Invocation, Resolver, Sealer};
use crate::transport::Transport;
use crate::value::{Rejected, Value};

/// Observable connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
	/// No connection; the queue is empty.
	Idle,
	/// A connection is working through the queue.
	Connected,
	/// A stalled or failed connection was replaced and the replacement has
	/// not yet completed an exchange.
	Reconnecting,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
	pub origin: String,
	pub established: bool,
	/// Completed exchanges so far.
	pub responses: u64,
	pub queued: usize,
	pub phase: SessionPhase,
}

enum Handshake {
	NotIssued,
	Pending,
	Established(String),
	Failed(Rejected),
}

struct SessionState {
	queue: VecDeque<Message>,
	handshake: Handshake,
	responses: u64,
	/// The queue head has been put on the wire and not yet completed.
	head_on_wire: bool,
	phase: SessionPhase,
	next_id: u64,
}

impl SessionState {
	fn allocate_id(&mut self) -> u64 {
		let id = self.next_id;
		self.next_id += 1;
		id
	}

	fn key(&self) -> Option<&str> {
		match &self.handshake {
			Handshake::Established(key) => Some(key),
			_ => None,
		}
	}
}

/// The request currently at the head of the queue, ready to issue.
struct Outgoing {
	id: u64,
	request: HttpRequest,
	/// May be reissued over a replacement connection.
	replaceable: bool,
	handshake: bool,
}

enum Flow {
	Continue,
	Discard,
}

pub(crate) struct Session {
	origin: String,
	transport: Arc<dyn Transport>,
	config: RuntimeConfig,
	sealer: Sealer,
	state: Mutex<SessionState>,
	wake: Notify,
}

impl Session {
	pub fn new(origin: &str, transport: Arc<dyn Transport>, config: RuntimeConfig, sealer: Sealer) -> Self {
		Self {
			origin: origin.to_string(),
			transport,
			config,
			sealer,
			state: Mutex::new(SessionState {
				queue: VecDeque::new(),
				handshake: Handshake::NotIssued,
				responses: 0,
				head_on_wire: false,
				phase: SessionPhase::Idle,
				next_id: 0,
			}),
			wake: Notify::new(),
		}
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		let state = self.state.lock();
		SessionSnapshot {
			origin: self.origin.clone(),
			established: state.key().is_some(),
			responses: state.responses,
			queued: state.queue.len(),
			phase: state.phase,
		}
	}

	/// Queues `invocation` on `target`, scheduling the handshake if needed.
	pub fn enqueue(&self, target: &str, invocation: Invocation, resolver: Resolver) {
		let mut state = self.state.lock();
		let id = state.allocate_id();
		let message = Message::new(id, target, invocation, resolver);

		if message.is_session_bound() {
			match &state.handshake {
				Handshake::Failed(reason) => {
					let reason = reason.clone();
					drop(state);
					message.resolve(Value::Rejected(reason));
					return;
				}
				Handshake::NotIssued => {
					let at = usize::from(state.head_on_wire);
					let handshake = Message::handshake(state.allocate_id(), target);
					state.queue.insert(at, handshake);
					state.queue.insert(at + 1, message);
					state.handshake = Handshake::Pending;
					debug!(target: "websend.session", origin = %self.origin, id, "session create scheduled");
				}
				Handshake::Pending | Handshake::Established(_) => state.queue.push_back(message),
			}
		} else {
			state.queue.push_back(message);
		}
		drop(state);
		self.wake.notify_one();
	}

	/// Worker loop. Runs until the owning runtime aborts it.
	pub async fn run(self: Arc<Self>) {
		let mut connection: Option<Connection> = None;
		loop {
			let Some(outgoing) = self.next_outgoing() else {
				if connection.take().is_some() {
					debug!(target: "websend.session", origin = %self.origin, "queue drained");
				}
				self.wake.notified().await;
				continue;
			};
			let active = connection
				.get_or_insert_with(|| Connection::open(Arc::clone(&self.transport), self.config.stall_timeout));
			if let Flow::Discard = self.exchange(active, outgoing).await {
				connection = None;
			}
		}
	}

	/// Prepares the queue head for the wire, rejecting heads that cannot be
	/// sent. Returns `None` once the queue is empty.
	fn next_outgoing(&self) -> Option<Outgoing> {
		let mut state = self.state.lock();
		loop {
			let Some(head) = state.queue.front() else {
				state.phase = SessionPhase::Idle;
				return None;
			};

			let bound = head.is_session_bound();
			let prepared = match (&state.handshake, bound) {
				(_, false) => head.to_request(None),
				(Handshake::Established(key), true) => head.to_request(Some(SessionParams {
					key,
					counter: state.responses,
				})),
				(Handshake::Failed(reason), true) => Err(Error::ProtocolError(reason.to_string())),
				(Handshake::NotIssued | Handshake::Pending, true) => {
					Err(Error::ProtocolError("session-bound request ahead of its session key".into()))
				}
			};

			match prepared {
				Ok(request) => {
					let outgoing = Outgoing {
						id: head.id,
						request,
						replaceable: state.key().is_some() || head.is_idempotent(),
						handshake: head.is_handshake(),
					};
					state.head_on_wire = true;
					if state.phase == SessionPhase::Idle {
						state.phase = SessionPhase::Connected;
					}
					return Some(outgoing);
				}
				Err(err) => {
					let rejection = match (&state.handshake, &err) {
						(Handshake::Failed(reason), _) => reason.clone(),
						(_, Error::ProtocolError(detail)) => Rejected::broken(detail.clone()),
						_ => Rejected::bad_syntax(err.to_string()),
					};
					warn!(target: "websend.session", origin = %self.origin, error = %err, "request dropped before sending");
					if let Some(message) = state.queue.pop_front() {
						message.resolve(Value::Rejected(rejection));
					}
				}
			}
		}
	}

	fn set_phase(&self, phase: SessionPhase) {
		self.state.lock().phase = phase;
	}

	/// Drives the head through to a terminal status.
	async fn exchange(&self, connection: &mut Connection, outgoing: Outgoing) -> Flow {
		let mut not_yet: Option<Backoff> = None;
		loop {
			let failure = match connection.issue(outgoing.request.clone(), outgoing.replaceable).await {
				Attempt::Completed(response)
					if StatusClass::of(response.status) == StatusClass::NotYet && !outgoing.handshake =>
				{
					let delay = not_yet.get_or_insert_with(|| self.config.not_yet_schedule()).next_delay();
					debug!(
						target: "websend.session",
						origin = %self.origin,
						id = outgoing.id,
						delay_ms = delay.as_millis() as u64,
						"target not yet available; retry scheduled"
					);
					tokio::time::sleep(delay).await;
					continue;
				}
				Attempt::Completed(response) if StatusClass::of(response.status).is_terminal() => {
					return self.complete(&outgoing, response);
				}
				Attempt::Completed(response) => format!("transient status {}", response.status),
				Attempt::Failed(err) if !err.is_transient() => return self.reject_head(&outgoing, err),
				Attempt::Failed(err) => err.to_string(),
				Attempt::Stalled => {
					warn!(
						target: "websend.session",
						origin = %self.origin,
						id = outgoing.id,
						budget_ms = connection.budget().as_millis() as u64,
						"connection stalled; replacing"
					);
					*connection = connection.successor(&self.config);
					self.set_phase(SessionPhase::Reconnecting);
					continue;
				}
			};

			warn!(
				target: "websend.session",
				origin = %self.origin,
				id = outgoing.id,
				reason = %failure,
				budget_ms = connection.budget().as_millis() as u64,
				"exchange did not complete; retrying"
			);
			connection.wait_out().await;
			if outgoing.replaceable {
				*connection = connection.successor(&self.config);
				self.set_phase(SessionPhase::Reconnecting);
			}
		}
	}

	/// Pops the head if it is still the message `outgoing` was built from.
	fn pop_head(&self, outgoing: &Outgoing) -> Option<Message> {
		let mut state = self.state.lock();
		if state.queue.front().map(|head| head.id) != Some(outgoing.id) {
			let err = Error::ProtocolError(format!("completion for request {} does not match the queue head", outgoing.id));
			error!(target: "websend.session", origin = %self.origin, error = %err, "discarding connection");
			return None;
		}
		let message = state.queue.pop_front()?;
		state.responses += 1;
		state.head_on_wire = false;
		state.phase = if state.queue.is_empty() { SessionPhase::Idle } else { SessionPhase::Connected };
		Some(message)
	}

	/// Pops the head and delivers its result.
	fn complete(&self, outgoing: &Outgoing, response: HttpResponse) -> Flow {
		let Some(message) = self.pop_head(outgoing) else {
			return Flow::Discard;
		};

		if StatusClass::of(response.status) == StatusClass::NotYet {
			self.finish_handshake(Value::Rejected(Rejected::failure(response.status, &response.phrase)));
			return Flow::Continue;
		}

		let (value, flow) = match codec::decode_response(&self.sealer, &message.target, &outgoing.request.uri, &response) {
			Ok(value) => (value, Flow::Continue),
			Err(err) => {
				error!(target: "websend.codec", origin = %self.origin, id = message.id, error = %err, "malformed response");
				(Value::Rejected(Rejected::bad_syntax(err.to_string())), Flow::Discard)
			}
		};
		self.deliver(message, value);
		flow
	}

	/// Pops the head with a `BadSyntax` rejection after a fault that a retry
	/// would only repeat.
	fn reject_head(&self, outgoing: &Outgoing, err: Error) -> Flow {
		error!(target: "websend.codec", origin = %self.origin, id = outgoing.id, error = %err, "unusable response");
		if let Some(message) = self.pop_head(outgoing) {
			self.deliver(message, Value::Rejected(Rejected::bad_syntax(err.to_string())));
		}
		Flow::Discard
	}

	fn deliver(&self, message: Message, value: Value) {
		if message.is_handshake() {
			self.finish_handshake(value);
		} else {
			message.resolve(value);
		}
	}

	/// Records the session key, or fails every session-bound message.
	fn finish_handshake(&self, value: Value) {
		let key = value.get("key").and_then(Value::as_str).map(str::to_string);
		let mut state = self.state.lock();
		if let Some(key) = key {
			info!(target: "websend.session", origin = %self.origin, "session established");
			state.handshake = Handshake::Established(key);
			return;
		}

		let reason = match value {
			Value::Rejected(rejected) => rejected,
			_ => Rejected::bad_syntax("session create returned no key"),
		};
		warn!(target: "websend.session", origin = %self.origin, reason = %reason, "session create failed");
		state.handshake = Handshake::Failed(reason.clone());

		let (bound, rest): (VecDeque<Message>, VecDeque<Message>) =
			state.queue.drain(..).partition(Message::is_session_bound);
		state.queue = rest;
		if state.queue.is_empty() {
			state.phase = SessionPhase::Idle;
		}
		drop(state);
		for message in bound {
			message.resolve(Value::Rejected(reason.clone()));
		}
	}
}
