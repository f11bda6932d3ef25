//! Cross-tab propagation of slot changes.
//!
//! Another tab writing the slot produces a [`StorageEvent`] here. The
//! [`CrossTabSync`] handler decodes it and pushes the record straight into the
//! local [`AttributionContext`], never back into storage: tab A writes, tab B
//! observes, tab B does not write again.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::context::AttributionContext;
use crate::diagnostics::Diagnostic;
use crate::record::AttributionRecord;
use crate::slot;
use crate::store::TabId;

/// A change to the storage area made by another browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
	/// Changed key; `None` when the whole storage area was cleared.
	pub key: Option<String>,
	/// New payload; `None` when the key was removed.
	pub new_value: Option<String>,
}

impl StorageEvent {
	pub fn changed(key: &str, new_value: &str) -> Self {
		Self {
			key: Some(key.to_string()),
			new_value: Some(new_value.to_string()),
		}
	}

	pub fn removed(key: &str) -> Self {
		Self {
			key: Some(key.to_string()),
			new_value: None,
		}
	}

	pub fn cleared() -> Self {
		Self {
			key: None,
			new_value: None,
		}
	}
}

#[derive(Debug, Clone)]
struct Notification {
	origin: Option<TabId>,
	event: StorageEvent,
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct StorageNotifier {
	tx: broadcast::Sender<Notification>,
}

impl StorageNotifier {
	/// Creates a channel buffering up to `capacity` notifications per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self { tx }
	}

	/// Subscribes a stream that skips notifications originating from `observer`.
	pub fn subscribe(&self, observer: Option<TabId>) -> StorageEvents {
		StorageEvents {
			rx: self.tx.subscribe(),
			observer,
		}
	}

	/// Publishes an event with no originating tab; every subscriber sees it.
	pub fn notify(&self, event: StorageEvent) {
		self.send(Notification { origin: None, event });
	}

	pub(crate) fn notify_from(&self, origin: TabId, event: StorageEvent) {
		self.send(Notification {
			origin: Some(origin),
			event,
		});
	}

	fn send(&self, notification: Notification) {
		// No subscribers is fine: nobody is listening.
		let _ = self.tx.send(notification);
	}
}

/// The receiving channel overflowed and dropped this many notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lagged(pub u64);

/// Receiving half of the notification channel, as seen by one tab.
#[derive(Debug)]
pub struct StorageEvents {
	rx: broadcast::Receiver<Notification>,
	observer: Option<TabId>,
}

impl StorageEvents {
	fn is_own(&self, notification: &Notification) -> bool {
		notification.origin.is_some() && notification.origin == self.observer
	}

	/// Next pending event without waiting. `Ok(None)` when none is pending or the channel closed.
	pub fn try_next(&mut self) -> Result<Option<StorageEvent>, Lagged> {
		loop {
			match self.rx.try_recv() {
				Ok(notification) if self.is_own(&notification) => continue,
				Ok(notification) => return Ok(Some(notification.event)),
				Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(None),
				Err(TryRecvError::Lagged(skipped)) => return Err(Lagged(skipped)),
			}
		}
	}

	/// Waits for the next event. `Ok(None)` once every sender is gone.
	pub async fn next(&mut self) -> Result<Option<StorageEvent>, Lagged> {
		loop {
			match self.rx.recv().await {
				Ok(notification) if self.is_own(&notification) => continue,
				Ok(notification) => return Ok(Some(notification.event)),
				Err(RecvError::Closed) => return Ok(None),
				Err(RecvError::Lagged(skipped)) => return Err(Lagged(skipped)),
			}
		}
	}
}

/// What [`CrossTabSync::handle`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// The event concerned another key.
	Ignored,
	/// The decoded record replaced the local state.
	Applied,
	/// The slot was removed or the storage cleared; local state reset to empty.
	Cleared,
	/// The payload did not decode; local state untouched.
	Rejected,
}

/// Applies other tabs' slot changes to a local context.
#[derive(Debug)]
pub struct CrossTabSync {
	context: AttributionContext,
	events: StorageEvents,
}

impl CrossTabSync {
	pub fn new(context: AttributionContext, events: StorageEvents) -> Self {
		Self { context, events }
	}

	/// Handles one event. Applying the same event twice leaves the same state.
	pub fn handle(&self, event: &StorageEvent) -> SyncOutcome {
		let slot_key = self.context.store().slot_key();
		match (&event.key, &event.new_value) {
			(Some(key), _) if key != slot_key => SyncOutcome::Ignored,
			(Some(_), Some(payload)) => match slot::decode(payload) {
				Ok(record) => {
					tracing::debug!(key = slot_key, keys = record.len(), "applying attribution from another tab");
					self.context.apply_remote(record);
					SyncOutcome::Applied
				}
				Err(error) => {
					self.context.store().report(Diagnostic::MalformedSyncPayload {
						key: slot_key.to_string(),
						reason: error.to_string(),
					});
					SyncOutcome::Rejected
				}
			},
			(Some(_), None) | (None, _) => {
				tracing::debug!(key = slot_key, "attribution slot cleared by another context");
				self.context.apply_remote(AttributionRecord::new());
				SyncOutcome::Cleared
			}
		}
	}

	/// Handles every pending event without waiting; returns how many were handled.
	pub fn pump(&mut self) -> usize {
		let mut handled = 0;
		loop {
			match self.events.try_next() {
				Ok(Some(event)) => {
					self.handle(&event);
					handled += 1;
				}
				Ok(None) => return handled,
				Err(Lagged(skipped)) => self.report_lag(skipped),
			}
		}
	}

	/// Handles events as they arrive until `shutdown` is cancelled or the
	/// channel closes.
	///
	/// A tab stream taken from a live [`MemoryProfile`](crate::store::MemoryProfile)
	/// only closes once the profile is dropped, so page teardown cancels
	/// `shutdown` instead.
	pub async fn run(mut self, shutdown: CancellationToken) {
		loop {
			let next = tokio::select! {
				biased;
				_ = shutdown.cancelled() => {
					tracing::debug!("cross-tab sync stopped");
					return;
				}
				next = self.events.next() => next,
			};
			match next {
				Ok(Some(event)) => {
					self.handle(&event);
				}
				Ok(None) => break,
				Err(Lagged(skipped)) => self.report_lag(skipped),
			}
		}
		tracing::debug!("cross-tab channel closed");
	}

	fn report_lag(&self, skipped: u64) {
		self.context.store().report(Diagnostic::SyncLagged { skipped });
	}
}
