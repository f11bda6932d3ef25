//! Durable single-slot persistence of the current attribution.
//!
//! [`AttributionStore`] sits on top of a [`SlotBackend`] and enforces the two
//! rules every caller relies on:
//!
//! * reads never fail: a missing, unreadable, expired or corrupt slot reads as
//!   an empty record;
//! * an empty record is never written, so a page view without tracking
//!   parameters cannot erase attribution established earlier.
//!
//! Backend failures are routed to the store's [`DiagnosticHook`] instead of
//! being returned.
//!
//! [`DiagnosticHook`]: crate::diagnostics::DiagnosticHook

mod file;
mod memory;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub use file::FileBackend;
pub use memory::{MemoryProfile, TabId, TabStorage};

use crate::diagnostics::{Diagnostic, SharedDiagnostics, TracingDiagnostics};
use crate::error::StorageResult;
use crate::record::AttributionRecord;
use crate::slot::{self, DEFAULT_SLOT_KEY};

/// Raw slot content as returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
	pub payload: String,
	/// Last write time, when the backend tracks it.
	pub written_at: Option<SystemTime>,
}

/// Key/value persistence underneath an [`AttributionStore`].
///
/// Reads and writes are synchronous. Concurrent writers are last-write-wins.
pub trait SlotBackend: Send + Sync {
	/// Reads the payload stored under `key`, if any.
	fn read(&self, key: &str) -> StorageResult<Option<StoredValue>>;

	/// Replaces the payload stored under `key`.
	fn write(&self, key: &str, payload: &str) -> StorageResult<()>;
}

impl<B: SlotBackend + ?Sized> SlotBackend for Arc<B> {
	fn read(&self, key: &str) -> StorageResult<Option<StoredValue>> {
		(**self).read(key)
	}

	fn write(&self, key: &str, payload: &str) -> StorageResult<()> {
		(**self).write(key, payload)
	}
}

/// How long a persisted record stays valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Retention {
	/// Keep the slot until external storage clearing removes it.
	#[default]
	Never,
	/// Treat slots last written longer ago than this as empty.
	MaxAge(Duration),
}

impl Retention {
	/// Whether a slot written at `written_at` has expired at `now`.
	///
	/// Slots without a known write time, or written in the future, never expire.
	pub fn is_expired(self, written_at: Option<SystemTime>, now: SystemTime) -> bool {
		match (self, written_at) {
			(Retention::MaxAge(max_age), Some(written_at)) => {
				now.duration_since(written_at).is_ok_and(|age| age > max_age)
			}
			_ => false,
		}
	}
}

/// Store settings, usually derived from [`AttributionConfig`](crate::config::AttributionConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
	/// Storage identifier of the slot.
	pub slot_key: String,
	pub retention: Retention,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			slot_key: DEFAULT_SLOT_KEY.to_string(),
			retention: Retention::Never,
		}
	}
}

/// Result of [`AttributionStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
	/// The record was persisted.
	Written,
	/// The record was empty; the slot was left untouched.
	SkippedEmpty,
	/// The backend refused the write; attribution is in-memory only.
	Unavailable,
}

/// The durable attribution slot.
///
/// Constructed once at application start and shared by `Arc` with every
/// collaborator that needs it.
pub struct AttributionStore {
	backend: Box<dyn SlotBackend>,
	config: StoreConfig,
	diagnostics: SharedDiagnostics,
}

impl AttributionStore {
	/// Creates a store that logs diagnostics through `tracing`.
	pub fn new(backend: impl SlotBackend + 'static, config: StoreConfig) -> Self {
		Self {
			backend: Box::new(backend),
			config,
			diagnostics: Arc::new(TracingDiagnostics),
		}
	}

	/// Replaces the diagnostic hook.
	#[must_use]
	pub fn with_diagnostics(mut self, diagnostics: SharedDiagnostics) -> Self {
		self.diagnostics = diagnostics;
		self
	}

	pub fn slot_key(&self) -> &str {
		&self.config.slot_key
	}

	pub fn config(&self) -> &StoreConfig {
		&self.config
	}

	pub(crate) fn report(&self, diagnostic: Diagnostic) {
		self.diagnostics.report(&diagnostic);
	}

	/// Reads the persisted record; empty when there is none or it cannot be used.
	pub fn get(&self) -> AttributionRecord {
		let key = self.slot_key();
		let stored = match self.backend.read(key) {
			Ok(Some(stored)) => stored,
			Ok(None) => return AttributionRecord::new(),
			Err(error) => {
				self.report(Diagnostic::ReadFailed {
					key: key.to_string(),
					reason: error.to_string(),
				});
				return AttributionRecord::new();
			}
		};

		if self.config.retention.is_expired(stored.written_at, SystemTime::now()) {
			tracing::debug!(key, written_at = ?stored.written_at, "stored attribution expired");
			return AttributionRecord::new();
		}

		match slot::decode(&stored.payload) {
			Ok(record) => record,
			Err(error) => {
				self.report(Diagnostic::CorruptSlot {
					key: key.to_string(),
					reason: error.to_string(),
				});
				AttributionRecord::new()
			}
		}
	}

	/// Persists `record` unless it is empty.
	pub fn set(&self, record: &AttributionRecord) -> SetOutcome {
		if record.is_empty() {
			return SetOutcome::SkippedEmpty;
		}

		let key = self.slot_key();
		match self.backend.write(key, &slot::encode(record)) {
			Ok(()) => {
				tracing::trace!(key, keys = record.len(), "persisted attribution");
				SetOutcome::Written
			}
			Err(error) => {
				self.report(Diagnostic::WriteFailed {
					key: key.to_string(),
					reason: error.to_string(),
				});
				SetOutcome::Unavailable
			}
		}
	}
}

impl std::fmt::Debug for AttributionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AttributionStore")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
