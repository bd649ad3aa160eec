//! Subscriber setup for binaries and tests embedding the client.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
///
/// Other crates stay at `warn`; the `websend.*` targets get one more level
/// per step of `verbosity`.
pub fn default_directive(verbosity: u8) -> String {
	let level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	format!("warn,websend={level}")
}

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`default_directive`].
///
/// Does nothing if a global subscriber is already set.
pub fn init(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}
