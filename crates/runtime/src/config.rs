//! Runtime timing configuration.
//!
//! All durations serialize as integer milliseconds under camelCase keys, so a
//! host can hand over a JSON object such as
//! `{"stallTimeoutMs": 10000, "notYetBackoffMs": 15000}`. Missing keys take
//! their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::error::{Error, Result};

/// Initial heartbeat budget of a connection.
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 30_000;
/// Ceiling for a connection budget after repeated replacement.
pub const MAX_STALL_TIMEOUT_MS: u64 = 480_000;
/// First retry delay after a not-yet-available response.
pub const DEFAULT_NOT_YET_BACKOFF_MS: u64 = 15_000;
/// Ceiling for the not-yet retry delay.
pub const MAX_NOT_YET_BACKOFF_MS: u64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
	#[serde(rename = "stallTimeoutMs", with = "millis")]
	pub stall_timeout: Duration,
	#[serde(rename = "maxStallTimeoutMs", with = "millis")]
	pub max_stall_timeout: Duration,
	#[serde(rename = "notYetBackoffMs", with = "millis")]
	pub not_yet_backoff: Duration,
	#[serde(rename = "maxNotYetBackoffMs", with = "millis")]
	pub max_not_yet_backoff: Duration,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			stall_timeout: Duration::from_millis(DEFAULT_STALL_TIMEOUT_MS),
			max_stall_timeout: Duration::from_millis(MAX_STALL_TIMEOUT_MS),
			not_yet_backoff: Duration::from_millis(DEFAULT_NOT_YET_BACKOFF_MS),
			max_not_yet_backoff: Duration::from_millis(MAX_NOT_YET_BACKOFF_MS),
		}
	}
}

impl RuntimeConfig {
	/// Parses a JSON configuration object and validates it.
	pub fn from_json(text: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
		self.stall_timeout = timeout;
		self
	}

	pub fn with_max_stall_timeout(mut self, timeout: Duration) -> Self {
		self.max_stall_timeout = timeout;
		self
	}

	pub fn with_not_yet_backoff(mut self, delay: Duration) -> Self {
		self.not_yet_backoff = delay;
		self
	}

	pub fn with_max_not_yet_backoff(mut self, delay: Duration) -> Self {
		self.max_not_yet_backoff = delay;
		self
	}

	/// Rejects zero durations and initial values above their ceilings.
	pub fn validate(&self) -> Result<()> {
		if self.stall_timeout.is_zero() {
			return Err(Error::ConfigError("stallTimeoutMs must be greater than 0".into()));
		}
		if self.stall_timeout > self.max_stall_timeout {
			return Err(Error::ConfigError(format!(
				"stallTimeoutMs ({}) exceeds maxStallTimeoutMs ({})",
				self.stall_timeout.as_millis(),
				self.max_stall_timeout.as_millis()
			)));
		}
		if self.not_yet_backoff.is_zero() {
			return Err(Error::ConfigError("notYetBackoffMs must be greater than 0".into()));
		}
		if self.not_yet_backoff > self.max_not_yet_backoff {
			return Err(Error::ConfigError(format!(
				"notYetBackoffMs ({}) exceeds maxNotYetBackoffMs ({})",
				self.not_yet_backoff.as_millis(),
				self.max_not_yet_backoff.as_millis()
			)));
		}
		Ok(())
	}

	/// Fresh retry schedule for a not-yet-available target.
	pub fn not_yet_schedule(&self) -> Backoff {
		Backoff::new(self.not_yet_backoff, self.max_not_yet_backoff)
	}

	/// Budget of a connection that replaces one with `budget`.
	pub fn next_stall_timeout(&self, budget: Duration) -> Duration {
		budget.saturating_mul(2).min(self.max_stall_timeout)
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_protocol_constants() {
		let config = RuntimeConfig::default();
		assert_eq!(config.not_yet_backoff, Duration::from_secs(15));
		assert_eq!(config.max_not_yet_backoff, Duration::from_secs(3600));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let config = RuntimeConfig::from_json(r#"{"stallTimeoutMs": 1000}"#).unwrap();
		assert_eq!(config.stall_timeout, Duration::from_secs(1));
		assert_eq!(config.max_stall_timeout, Duration::from_millis(MAX_STALL_TIMEOUT_MS));
	}

	#[test]
	fn serializes_milliseconds_in_camel_case() {
		let json = serde_json::to_value(RuntimeConfig::default()).unwrap();
		assert_eq!(json["notYetBackoffMs"], 15_000);
		assert_eq!(json["maxNotYetBackoffMs"], 3_600_000);
		assert_eq!(json["stallTimeoutMs"], DEFAULT_STALL_TIMEOUT_MS);
	}

	#[test]
	fn rejects_inverted_bounds() {
		let err = RuntimeConfig::from_json(r#"{"notYetBackoffMs": 10, "maxNotYetBackoffMs": 5}"#).unwrap_err();
		assert!(matches!(err, Error::ConfigError(_)));
		let err = RuntimeConfig::default().with_stall_timeout(Duration::ZERO).validate().unwrap_err();
		assert!(err.to_string().contains("stallTimeoutMs"));
	}

	#[test]
	fn rejects_malformed_json() {
		assert!(matches!(RuntimeConfig::from_json("{"), Err(Error::ConfigError(_))));
	}

	#[test]
	fn stall_budget_doubles_to_cap() {
		let config = RuntimeConfig::default().with_max_stall_timeout(Duration::from_secs(100));
		assert_eq!(config.next_stall_timeout(Duration::from_secs(30)), Duration::from_secs(60));
		assert_eq!(config.next_stall_timeout(Duration::from_secs(60)), Duration::from_secs(100));
	}
}
