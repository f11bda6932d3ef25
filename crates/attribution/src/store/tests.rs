use std::sync::Arc;
use std::time::{Duration, SystemTime};

use proptest::prelude::*;

use super::*;
use crate::diagnostics::{Diagnostic, RecordingDiagnostics};
use crate::key::AttributionKey;
use crate::merge::merge;

fn store_on(profile: &MemoryProfile, config: StoreConfig) -> (AttributionStore, Arc<RecordingDiagnostics>) {
	let diagnostics = RecordingDiagnostics::new();
	let store = AttributionStore::new(profile.open_tab(), config).with_diagnostics(diagnostics.clone());
	(store, diagnostics)
}

fn google() -> AttributionRecord {
	AttributionRecord::new().with(AttributionKey::Source, "google")
}

#[test]
fn empty_slot_reads_as_empty_record() {
	let profile = MemoryProfile::new();
	let (store, diagnostics) = store_on(&profile, StoreConfig::default());
	assert!(store.get().is_empty());
	assert!(diagnostics.snapshot().is_empty());
}

#[test]
fn set_then_get_round_trips() {
	let profile = MemoryProfile::new();
	let (store, _) = store_on(&profile, StoreConfig::default());
	assert_eq!(store.set(&google()), SetOutcome::Written);
	assert_eq!(store.get(), google());
	assert_eq!(profile.payload(DEFAULT_SLOT_KEY).as_deref(), Some(r#"{"utm_source":"google"}"#));
}

#[test]
fn empty_record_never_clobbers() {
	let profile = MemoryProfile::new();
	let (store, _) = store_on(&profile, StoreConfig::default());
	store.set(&google());

	assert_eq!(store.set(&AttributionRecord::new()), SetOutcome::SkippedEmpty);
	assert_eq!(store.get(), google());
	assert_eq!(profile.total_writes(), 1);
}

#[test]
fn corrupt_payload_reads_as_empty_and_is_reported() {
	let profile = MemoryProfile::new();
	profile.seed(DEFAULT_SLOT_KEY, "{\"utm_source\":", SystemTime::now());
	let (store, diagnostics) = store_on(&profile, StoreConfig::default());

	let stored = store.get();
	assert!(stored.is_empty());
	assert!(matches!(
		diagnostics.snapshot().as_slice(),
		[Diagnostic::CorruptSlot { key, .. }] if key == DEFAULT_SLOT_KEY
	));

	let fresh = google();
	assert_eq!(merge(&fresh, &stored), fresh);
}

#[test]
fn custom_slot_key_is_used() {
	let profile = MemoryProfile::new();
	let config = StoreConfig {
		slot_key: "campaign".into(),
		..StoreConfig::default()
	};
	let (store, _) = store_on(&profile, config);
	store.set(&google());
	assert!(profile.payload("campaign").is_some());
	assert!(profile.payload(DEFAULT_SLOT_KEY).is_none());
}

#[test]
fn unavailable_backend_degrades() {
	let profile = MemoryProfile::new();
	let (store, diagnostics) = store_on(&profile, StoreConfig::default());
	profile.set_available(false);

	assert!(store.get().is_empty());
	assert_eq!(store.set(&google()), SetOutcome::Unavailable);

	let seen = diagnostics.take();
	assert!(matches!(
		seen.as_slice(),
		[Diagnostic::ReadFailed { .. }, Diagnostic::WriteFailed { .. }]
	));
}

#[test]
fn retention_never_keeps_old_slots() {
	let profile = MemoryProfile::new();
	let ancient = SystemTime::now() - Duration::from_secs(10 * 365 * 24 * 3600);
	profile.seed(DEFAULT_SLOT_KEY, r#"{"utm_source":"google"}"#, ancient);
	let (store, _) = store_on(&profile, StoreConfig::default());
	assert_eq!(store.get(), google());
}

#[test]
fn retention_max_age_expires_old_slots() {
	let day = Duration::from_secs(24 * 3600);
	let profile = MemoryProfile::new();
	let config = StoreConfig {
		retention: Retention::MaxAge(day),
		..StoreConfig::default()
	};
	let (store, _) = store_on(&profile, config);

	profile.seed(DEFAULT_SLOT_KEY, r#"{"utm_source":"google"}"#, SystemTime::now() - 2 * day);
	assert!(store.get().is_empty());

	profile.seed(DEFAULT_SLOT_KEY, r#"{"utm_source":"google"}"#, SystemTime::now() - day / 2);
	assert_eq!(store.get(), google());
}

#[test]
fn retention_ignores_unknown_or_future_timestamps() {
	let now = SystemTime::now();
	let retention = Retention::MaxAge(Duration::from_secs(60));
	assert!(!retention.is_expired(None, now));
	assert!(!retention.is_expired(Some(now + Duration::from_secs(3600)), now));
	assert!(retention.is_expired(Some(now - Duration::from_secs(61)), now));
	assert!(!Retention::Never.is_expired(Some(now - Duration::from_secs(61)), now));
}

#[test]
fn file_backed_store_persists_across_instances() {
	let dir = tempfile::tempdir().unwrap();
	let first = AttributionStore::new(FileBackend::new(dir.path()), StoreConfig::default());
	first.set(&google());
	drop(first);

	let second = AttributionStore::new(FileBackend::new(dir.path()), StoreConfig::default());
	assert_eq!(second.get(), google());
}

fn arb_record() -> impl Strategy<Value = AttributionRecord> {
	proptest::collection::vec(
		(proptest::sample::select(AttributionKey::ALL.to_vec()), "[a-z0-9]{0,6}"),
		0..8,
	)
	.prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
	/// `set` of an empty record never changes a persisted record.
	#[test]
	fn prop_set_empty_never_clobbers(record in arb_record()) {
		let profile = MemoryProfile::new();
		let (store, _) = store_on(&profile, StoreConfig::default());
		store.set(&record);
		let before = profile.payload(DEFAULT_SLOT_KEY);

		prop_assert_eq!(store.set(&AttributionRecord::new()), SetOutcome::SkippedEmpty);
		prop_assert_eq!(profile.payload(DEFAULT_SLOT_KEY), before);
		prop_assert_eq!(store.get(), record);
	}
}
