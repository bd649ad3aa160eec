//! Wire codec between [`Value`]s and JSON payloads.
//!
//! Live references and rejections travel as marker objects:
//!
//! | value | wire form |
//! |---|---|
//! | reference | `{"@": "<uri relative to the request target>"}` |
//! | rejection | `{"!": <reason>}` |
//! | non-finite number | `{"!": {"$": ["NaN"]}}` |
//! | top-level boolean, number or string | `{"=": <scalar>}` |
//!
//! Decoding also accepts the legacy typed form
//! `{"$": ["org.ref_send.promise.Rejected"], "reason": ...}`.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as JsonValue};
use tracing::trace;
use websend_protocol::wire::{LEGACY_REJECTED_TYPE, REF_KEY, REJECTED_KEY, SCALAR_KEY, TYPE_KEY};
use websend_protocol::{HttpResponse, StatusClass, uri};

use crate::error::Result;
use crate::reference::Sealer;
use crate::value::{Rejected, Value};

/// Largest magnitude below which every integral `f64` is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encodes `value` as the body of a request to `base`.
pub fn encode(value: &Value, base: &str) -> Result<String> {
	let wire = match value {
		Value::Bool(_) | Value::String(_) => wrap_scalar(to_wire(value, base)),
		Value::Number(n) if n.is_finite() => wrap_scalar(to_wire(value, base)),
		_ => to_wire(value, base),
	};
	Ok(serde_json::to_string(&wire)?)
}

fn wrap_scalar(scalar: JsonValue) -> JsonValue {
	let mut map = Map::new();
	map.insert(SCALAR_KEY.to_string(), scalar);
	JsonValue::Object(map)
}

fn marker(key: &str, inner: JsonValue) -> JsonValue {
	let mut map = Map::new();
	map.insert(key.to_string(), inner);
	JsonValue::Object(map)
}

/// Integral values are written without a fraction, except `-0`, which would
/// lose its sign.
fn number(n: f64) -> JsonValue {
	let negative_zero = n == 0.0 && n.is_sign_negative();
	if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER && !negative_zero {
		return JsonValue::from(n as i64);
	}
	Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

fn to_wire(value: &Value, base: &str) -> JsonValue {
	match value {
		Value::Null => JsonValue::Null,
		Value::Bool(b) => JsonValue::Bool(*b),
		Value::Number(n) if n.is_finite() => number(*n),
		Value::Number(_) => marker(REJECTED_KEY, to_wire(Rejected::not_a_number().reason(), base)),
		Value::String(s) => JsonValue::String(s.clone()),
		Value::Array(items) => JsonValue::Array(items.iter().map(|item| to_wire(item, base)).collect()),
		Value::Object(map) => JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), to_wire(v, base))).collect()),
		Value::Ref(reference) => marker(REF_KEY, JsonValue::String(uri::relate(base, reference.uri()))),
		Value::Rejected(rejected) => marker(REJECTED_KEY, to_wire(rejected.reason(), base)),
	}
}

/// Decodes a JSON payload received in response to a request on `base`.
pub(crate) fn decode(sealer: &Sealer, base: &str, text: &str) -> Result<Value> {
	let json: JsonValue = serde_json::from_str(text)?;
	Ok(from_wire(sealer, base, json))
}

/// Children are decoded before their parent is inspected.
fn from_wire(sealer: &Sealer, base: &str, json: JsonValue) -> Value {
	match json {
		JsonValue::Array(items) => Value::Array(items.into_iter().map(|item| from_wire(sealer, base, item)).collect()),
		JsonValue::Object(map) => {
			let mut members: BTreeMap<String, Value> =
				map.into_iter().map(|(k, v)| (k, from_wire(sealer, base, v))).collect();
			if let Some(Value::String(href)) = members.get(REF_KEY) {
				return Value::Ref(sealer.seal(uri::resolve(base, href)));
			}
			if let Some(reason) = members.remove(REJECTED_KEY) {
				return Value::Rejected(Rejected::new(reason));
			}
			if let Some(scalar) = members.remove(SCALAR_KEY) {
				return scalar;
			}
			if is_legacy_rejection(&members) {
				return Value::Rejected(Rejected::new(members.remove("reason").unwrap_or_default()));
			}
			Value::Object(members)
		}
		scalar => Value::from(scalar),
	}
}

fn is_legacy_rejection(members: &BTreeMap<String, Value>) -> bool {
	matches!(
		members.get(TYPE_KEY),
		Some(Value::Array(types)) if types.iter().any(|t| t.as_str() == Some(LEGACY_REJECTED_TYPE))
	)
}

/// Interprets a terminal response to a request on `target` issued as
/// `request_uri`.
pub(crate) fn decode_response(sealer: &Sealer, target: &str, request_uri: &str, response: &HttpResponse) -> Result<Value> {
	trace!(target: "websend.codec", status = response.status, bytes = response.body.len(), "decoding response");
	match StatusClass::of(response.status) {
		StatusClass::Content if response.is_opaque() => Ok(Value::String(response.body.clone())),
		StatusClass::Content => decode(sealer, target, &response.body),
		StatusClass::NoContent => Ok(Value::Null),
		StatusClass::SeeOther => Ok(response
			.header("Location")
			.map_or(Value::Null, |location| Value::Ref(sealer.seal(uri::resolve(request_uri, location))))),
		StatusClass::NotYet => Ok(Value::Rejected(Rejected::not_yet())),
		StatusClass::Transient | StatusClass::Failure => {
			Ok(Value::Rejected(Rejected::failure(response.status, &response.phrase)))
		}
	}
}
