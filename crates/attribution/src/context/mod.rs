//! Reactive holder of the current attribution.
//!
//! One [`AttributionContext`] exists per tab. It re-evaluates attribution on
//! every navigation (read, merge with the store, publish, persist) and serves
//! both snapshot reads and change subscriptions to collaborators such as the
//! checkout flow or analytics calls.


use std::sync::Arc;

use tokio::sync::watch;

use crate::diagnostics::Diagnostic;
use crate::enrich;
use crate::merge::merge;
use crate::reader::read_query;
use crate::record::AttributionRecord;
use crate::store::{AttributionStore, SetOutcome};

/// Result of one navigation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
	/// Attribution read from the navigated-to query string.
	pub fresh: AttributionRecord,
	/// The merged record now held by the context.
	pub record: Arc<AttributionRecord>,
	/// What the store did, or `None` when the query carried no attribution.
	pub persisted: Option<SetOutcome>,
}

struct ContextInner {
	store: Arc<AttributionStore>,
	state: watch::Sender<Arc<AttributionRecord>>,
}

/// Current attribution for one tab. Clones share the same state.
#[derive(Clone)]
pub struct AttributionContext {
	inner: Arc<ContextInner>,
}

impl AttributionContext {
	/// Creates the context and runs the first navigation cycle for `initial_query`.
	pub fn new(store: Arc<AttributionStore>, initial_query: &str) -> Self {
		let (state, _) = watch::channel(Arc::new(AttributionRecord::new()));
		let context = Self {
			inner: Arc::new(ContextInner { store, state }),
		};
		context.navigate(initial_query);
		context
	}

	pub fn store(&self) -> &AttributionStore {
		&self.inner.store
	}

	/// Re-evaluates attribution for a route change to a location with `query`.
	///
	/// The merged record is persisted (when the query contributed anything)
	/// before subscribers observe it.
	pub fn navigate(&self, query: &str) -> NavigationOutcome {
		let fresh = read_query(query);
		let stored = self.inner.store.get();
		let merged = Arc::new(merge(&fresh, &stored));

		let persisted = (!fresh.is_empty()).then(|| self.inner.store.set(&merged));
		tracing::debug!(
			fresh = fresh.len(),
			stored = stored.len(),
			merged = merged.len(),
			?persisted,
			"attribution navigation cycle"
		);
		self.publish(merged.clone());

		NavigationOutcome {
			fresh,
			record: merged,
			persisted,
		}
	}

	/// Replaces the current record without persisting it.
	///
	/// Used for changes that already live in storage, such as another tab's
	/// write. Subscribers are only notified when the record actually changes.
	pub fn apply_remote(&self, record: AttributionRecord) {
		self.publish(Arc::new(record));
	}

	fn publish(&self, record: Arc<AttributionRecord>) {
		self.inner.state.send_if_modified(|current| {
			if **current == *record {
				return false;
			}
			*current = record;
			true
		});
	}

	/// Current record.
	pub fn snapshot(&self) -> Arc<AttributionRecord> {
		self.inner.state.borrow().clone()
	}

	/// Canonical query string of the current record, without a leading `?`.
	pub fn query_string(&self) -> String {
		self.snapshot().to_query_string()
	}

	/// Receiver that observes every future change of the current record.
	pub fn subscribe(&self) -> watch::Receiver<Arc<AttributionRecord>> {
		self.inner.state.subscribe()
	}

	/// Stamps the current record onto an outbound URL.
	///
	/// See [`enrich::enrich`]. Never fails; unparseable URLs are reported to
	/// the store's diagnostic hook and stamped by concatenation.
	pub fn enrich(&self, url: &str) -> String {
		let record = self.snapshot();
		let stamped = enrich::stamp(&record, url);
		if let Some(error) = stamped.parse_error {
			self.inner.store.report(Diagnostic::UnparsableUrl {
				url: url.to_string(),
				reason: error.to_string(),
			});
		}
		stamped.url
	}
}

impl std::fmt::Debug for AttributionContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AttributionContext")
			.field("store", &self.inner.store)
			.field("current", &*self.inner.state.borrow())
			.finish()
	}
}
