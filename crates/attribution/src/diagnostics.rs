//! Observable side channel for failures that are never surfaced to callers.
//!
//! Attribution must not break navigation or checkout, so every failure path
//! degrades to a best-effort result. The failure itself is reported to a
//! [`DiagnosticHook`] injected at construction time.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// A degraded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
	/// The persisted payload could not be decoded and was treated as empty.
	#[error("stored attribution in slot `{key}` is corrupt: {reason}")]
	CorruptSlot { key: String, reason: String },

	/// The backend failed to read the slot; treated as no prior attribution.
	#[error("failed to read attribution slot `{key}`: {reason}")]
	ReadFailed { key: String, reason: String },

	/// The backend refused a write; attribution lives in memory only.
	#[error("failed to persist attribution slot `{key}`: {reason}")]
	WriteFailed { key: String, reason: String },

	/// An outbound URL was not structurally parseable and was stamped by concatenation.
	#[error("could not parse outbound url `{url}`: {reason}")]
	UnparsableUrl { url: String, reason: String },

	/// A cross-tab notification carried a payload that does not decode.
	#[error("ignored malformed cross-tab payload for slot `{key}`: {reason}")]
	MalformedSyncPayload { key: String, reason: String },

	/// The cross-tab channel overflowed and dropped notifications.
	#[error("cross-tab channel lagged, {skipped} notifications dropped")]
	SyncLagged { skipped: u64 },
}

/// Receiver of [`Diagnostic`]s.
pub trait DiagnosticHook: Send + Sync {
	fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticHook for F
where
	F: Fn(&Diagnostic) + Send + Sync,
{
	fn report(&self, diagnostic: &Diagnostic) {
		self(diagnostic)
	}
}

/// Shared handle to a hook.
pub type SharedDiagnostics = Arc<dyn DiagnosticHook>;

/// Default hook: logs every diagnostic as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticHook for TracingDiagnostics {
	fn report(&self, diagnostic: &Diagnostic) {
		tracing::warn!(%diagnostic, "attribution degraded");
	}
}

/// Collects diagnostics in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
	seen: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Copies out everything recorded so far.
	pub fn snapshot(&self) -> Vec<Diagnostic> {
		self.seen.lock().clone()
	}

	/// Drains everything recorded so far.
	pub fn take(&self) -> Vec<Diagnostic> {
		std::mem::take(&mut *self.seen.lock())
	}
}

impl DiagnosticHook for RecordingDiagnostics {
	fn report(&self, diagnostic: &Diagnostic) {
		tracing::debug!(%diagnostic, "recorded attribution diagnostic");
		self.seen.lock().push(diagnostic.clone());
	}
}
