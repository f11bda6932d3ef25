//! In-process model of one browser profile shared by several tabs.
//!
//! Every [`TabStorage`] is one tab's view of the same storage area. Writes are
//! visible to all tabs immediately and notify every tab except the writer,
//! which is how the platform's storage notifications behave.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use super::{SlotBackend, StoredValue};
use crate::error::{StorageError, StorageResult};
use crate::sync::{StorageEvent, StorageEvents, StorageNotifier};

/// Notifications buffered per tab before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Identity of a tab within a [`MemoryProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

#[derive(Debug)]
struct Slot {
	payload: String,
	written_at: SystemTime,
}

#[derive(Debug, Default)]
struct ProfileState {
	slots: HashMap<String, Slot>,
	writes: HashMap<TabId, usize>,
}

#[derive(Debug)]
struct ProfileInner {
	state: Mutex<ProfileState>,
	available: AtomicBool,
	next_tab: AtomicU64,
	notifier: StorageNotifier,
}

/// Shared storage area. Cloning yields another handle to the same profile.
#[derive(Debug, Clone)]
pub struct MemoryProfile {
	inner: Arc<ProfileInner>,
}

impl Default for MemoryProfile {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryProfile {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(ProfileInner {
				state: Mutex::new(ProfileState::default()),
				available: AtomicBool::new(true),
				next_tab: AtomicU64::new(0),
				notifier: StorageNotifier::new(EVENT_CAPACITY),
			}),
		}
	}

	/// Opens a new tab on this profile.
	pub fn open_tab(&self) -> TabStorage {
		let id = TabId(self.inner.next_tab.fetch_add(1, Ordering::Relaxed));
		TabStorage {
			id,
			profile: self.clone(),
			events: Mutex::new(Some(self.inner.notifier.subscribe(Some(id)))),
		}
	}

	/// Enables or disables persistence, as when the user blocks site storage.
	pub fn set_available(&self, available: bool) {
		self.inner.available.store(available, Ordering::Release);
	}

	fn check_available(&self) -> StorageResult<()> {
		if self.inner.available.load(Ordering::Acquire) {
			Ok(())
		} else {
			Err(StorageError::Unavailable("storage is disabled for this profile".into()))
		}
	}

	/// Writes a raw payload without notifying any tab, as if left over from an earlier session.
	pub fn seed(&self, key: &str, payload: &str, written_at: SystemTime) {
		self.inner.state.lock().slots.insert(
			key.to_string(),
			Slot {
				payload: payload.to_string(),
				written_at,
			},
		);
	}

	/// Raw payload currently stored under `key`.
	pub fn payload(&self, key: &str) -> Option<String> {
		self.inner.state.lock().slots.get(key).map(|slot| slot.payload.clone())
	}

	/// Number of writes issued by `tab`.
	pub fn writes_by(&self, tab: TabId) -> usize {
		self.inner.state.lock().writes.get(&tab).copied().unwrap_or(0)
	}

	/// Number of writes issued by all tabs.
	pub fn total_writes(&self) -> usize {
		self.inner.state.lock().writes.values().sum()
	}

	/// Removes one slot from outside any tab and notifies every tab.
	pub fn remove(&self, key: &str) {
		let removed = self.inner.state.lock().slots.remove(key).is_some();
		if removed {
			self.inner.notifier.notify(StorageEvent::removed(key));
		}
	}

	/// Clears the whole storage area from outside any tab and notifies every tab.
	pub fn clear(&self) {
		self.inner.state.lock().slots.clear();
		self.inner.notifier.notify(StorageEvent::cleared());
	}
}

/// One tab's view of a [`MemoryProfile`].
#[derive(Debug)]
pub struct TabStorage {
	id: TabId,
	profile: MemoryProfile,
	events: Mutex<Option<StorageEvents>>,
}

impl TabStorage {
	pub fn id(&self) -> TabId {
		self.id
	}

	pub fn profile(&self) -> &MemoryProfile {
		&self.profile
	}

	/// Takes this tab's notification stream. Returns `None` once taken.
	///
	/// The stream carries changes made by other tabs and by external clearing,
	/// never this tab's own writes.
	pub fn take_events(&self) -> Option<StorageEvents> {
		self.events.lock().take()
	}
}

impl SlotBackend for TabStorage {
	fn read(&self, key: &str) -> StorageResult<Option<StoredValue>> {
		self.profile.check_available()?;
		Ok(self.profile.inner.state.lock().slots.get(key).map(|slot| StoredValue {
			payload: slot.payload.clone(),
			written_at: Some(slot.written_at),
		}))
	}

	fn write(&self, key: &str, payload: &str) -> StorageResult<()> {
		self.profile.check_available()?;
		{
			let mut state = self.profile.inner.state.lock();
			state.slots.insert(
				key.to_string(),
				Slot {
					payload: payload.to_string(),
					written_at: SystemTime::now(),
				},
			);
			*state.writes.entry(self.id).or_default() += 1;
		}
		self.profile
			.inner
			.notifier
			.notify_from(self.id, StorageEvent::changed(key, payload));
		Ok(())
	}
}
