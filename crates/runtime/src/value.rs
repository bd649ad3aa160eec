//! Application values exchanged with remote objects.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::reference::Reference;

/// A settled value: plain data, a live reference, or a rejection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Array(Vec<Value>),
	Object(BTreeMap<String, Value>),
	Ref(Reference),
	Rejected(Rejected),
}

impl Value {
	/// Builds an object from key/value pairs.
	pub fn object<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_reference(&self) -> Option<&Reference> {
		match self {
			Self::Ref(r) => Some(r),
			_ => None,
		}
	}

	pub fn as_rejected(&self) -> Option<&Rejected> {
		match self {
			Self::Rejected(r) => Some(r),
			_ => None,
		}
	}

	/// Looks up a member of an object value.
	pub fn get(&self, key: &str) -> Option<&Value> {
		match self {
			Self::Object(map) => map.get(key),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Self::Number(n)
	}
}

impl From<i64> for Value {
	fn from(n: i64) -> Self {
		Self::Number(n as f64)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Self::Array(items)
	}
}

impl From<Reference> for Value {
	fn from(r: Reference) -> Self {
		Self::Ref(r)
	}
}

impl From<Rejected> for Value {
	fn from(r: Rejected) -> Self {
		Self::Rejected(r)
	}
}

/// Plain JSON data. Marker objects are not interpreted here; that is the
/// codec's job.
impl From<JsonValue> for Value {
	fn from(json: JsonValue) -> Self {
		match json {
			JsonValue::Null => Self::Null,
			JsonValue::Bool(b) => Self::Bool(b),
			JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
			JsonValue::String(s) => Self::String(s),
			JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
			JsonValue::Object(map) => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
		}
	}
}

/// A settled failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
	reason: Box<Value>,
}

impl Rejected {
	pub fn new(reason: Value) -> Self {
		Self { reason: Box::new(reason) }
	}

	/// Permanent failure reported by the server with `status`.
	pub fn failure(status: u16, phrase: &str) -> Self {
		Self::new(Value::object([
			("kind", Value::from("Failure")),
			("detail", Value::from("NaO")),
			("status", Value::Number(f64::from(status))),
			("phrase", Value::from(phrase)),
		]))
	}

	/// Target not yet resolvable; retried by the session layer.
	pub fn not_yet() -> Self {
		Self::new(Value::object([("kind", Value::from("NotYet"))]))
	}

	/// Placeholder for a number that has no JSON form.
	pub fn not_a_number() -> Self {
		Self::new(Value::object([("$", Value::Array(vec![Value::from("NaN")]))]))
	}

	/// Malformed payload.
	pub fn bad_syntax(detail: impl Into<String>) -> Self {
		Self::new(Value::object([("kind", Value::from("BadSyntax")), ("detail", Value::String(detail.into()))]))
	}

	/// The value can no longer be produced.
	pub fn broken(detail: impl Into<String>) -> Self {
		Self::new(Value::object([("kind", Value::from("Broken")), ("detail", Value::String(detail.into()))]))
	}

	pub fn reason(&self) -> &Value {
		&self.reason
	}

	pub fn into_reason(self) -> Value {
		*self.reason
	}

	/// The `kind` member of the reason, when it has one.
	pub fn kind(&self) -> Option<&str> {
		self.reason.get("kind").and_then(Value::as_str)
	}

	pub fn is_not_yet(&self) -> bool {
		self.kind() == Some("NotYet")
	}
}

impl fmt::Display for Rejected {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (self.kind(), self.reason.get("detail").and_then(Value::as_str)) {
			(Some(kind), Some(detail)) => write!(f, "rejected: {kind} ({detail})"),
			(Some(kind), None) => write!(f, "rejected: {kind}"),
			_ => f.write_str("rejected"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn failure_reason_shape() {
		let rejected = Rejected::failure(403, "Forbidden");
		assert_eq!(rejected.kind(), Some("Failure"));
		assert_eq!(rejected.reason().get("detail"), Some(&Value::from("NaO")));
		assert_eq!(rejected.reason().get("status").and_then(Value::as_f64), Some(403.0));
		assert_eq!(rejected.to_string(), "rejected: Failure (NaO)");
	}

	#[test]
	fn not_yet_is_recognised() {
		assert!(Rejected::not_yet().is_not_yet());
		assert!(!Rejected::broken("gone").is_not_yet());
	}

	#[test]
	fn json_converts_structurally() {
		let value = Value::from(json!({"a": [1, "two", null], "b": {"c": true}}));
		let a = value.get("a").unwrap();
		assert_eq!(a, &Value::Array(vec![Value::Number(1.0), Value::from("two"), Value::Null]));
		assert_eq!(value.get("b").and_then(|b| b.get("c")).and_then(Value::as_bool), Some(true));
	}

	#[test]
	fn markers_are_not_interpreted_by_plain_conversion() {
		let value = Value::from(json!({"@": "./x"}));
		assert!(value.as_reference().is_none());
		assert_eq!(value.get("@").and_then(Value::as_str), Some("./x"));
	}
}
