//! Marketing attribution for the storefront.
//!
//! Captures campaign parameters (`utm_*`, `gclid`, `fbclid`) from the query
//! string of every page the visitor lands on, merges them with what an earlier
//! visit left in durable storage, persists the result, keeps other tabs in
//! step, and stamps the current attribution onto outbound checkout and
//! analytics URLs.
//!
//! * [`read_query`]: query string to [`AttributionRecord`]
//! * [`merge`]: fresh values win, stored values fill gaps
//! * [`AttributionStore`]: the single durable slot on top of a [`SlotBackend`]
//! * [`AttributionContext`]: per-tab reactive state, re-evaluated on navigation
//! * [`enrich`]: attribution stamped onto an outbound URL
//! * [`CrossTabSync`]: other tabs' writes applied without writing back
//!
//! Nothing here fails loudly. Corrupt payloads, blocked storage and
//! unparseable URLs degrade to best-effort results and are reported to a
//! [`DiagnosticHook`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use trail_attribution::{AttributionContext, AttributionStore, MemoryProfile, StoreConfig};
//!
//! let profile = MemoryProfile::new();
//! let store = AttributionStore::new(profile.open_tab(), StoreConfig::default());
//! let context = AttributionContext::new(Arc::new(store), "?utm_source=google&ref=home");
//!
//! assert_eq!(context.query_string(), "utm_source=google");
//! assert_eq!(
//! 	context.enrich("https://pay.example/checkout?ref=abc"),
//! 	"https://pay.example/checkout?ref=abc&utm_source=google"
//! );
//! ```

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod enrich;
pub mod error;
pub mod key;
pub mod merge;
pub mod reader;
pub mod record;
pub mod slot;
pub mod store;
pub mod sync;

pub use config::AttributionConfig;
pub use context::{AttributionContext, NavigationOutcome};
pub use diagnostics::{Diagnostic, DiagnosticHook, RecordingDiagnostics, SharedDiagnostics, TracingDiagnostics};
pub use enrich::enrich;
pub use error::{ConfigError, SlotError, StorageError};
pub use key::AttributionKey;
pub use merge::merge;
pub use reader::{read_query, read_url};
pub use record::AttributionRecord;
pub use store::{
	AttributionStore, FileBackend, MemoryProfile, Retention, SetOutcome, SlotBackend, StoreConfig, StoredValue,
	TabId, TabStorage,
};
pub use sync::{CrossTabSync, Lagged, StorageEvent, StorageEvents, StorageNotifier, SyncOutcome};
