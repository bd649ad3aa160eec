//! Classification of response statuses.

/// How a response status is handled by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
	/// 200-203: the body carries the result.
	Content,
	/// 204, 205: the result is null.
	NoContent,
	/// 303: the result is the `Location` reference.
	SeeOther,
	/// 404: the target is not yet resolvable; retry later.
	NotYet,
	/// Below 200 or at/above 500: the exchange did not complete.
	Transient,
	/// Any other status: permanent failure.
	Failure,
}

impl StatusClass {
	pub fn of(status: u16) -> Self {
		match status {
			0..=199 | 500.. => Self::Transient,
			200..=203 => Self::Content,
			204 | 205 => Self::NoContent,
			303 => Self::SeeOther,
			404 => Self::NotYet,
			_ => Self::Failure,
		}
	}

	/// Returns `true` when the status ends the exchange for the queue head.
	pub fn is_terminal(self) -> bool {
		self != Self::Transient
	}
}
