//! Precedence resolution between freshly read and previously stored attribution.

use crate::key::AttributionKey;
use crate::record::AttributionRecord;

/// Combines `fresh` and `stored` into a new record.
///
/// For every key, the fresh value wins; the stored value fills gaps; keys
/// absent from both stay absent.
pub fn merge(fresh: &AttributionRecord, stored: &AttributionRecord) -> AttributionRecord {
	AttributionKey::ALL
		.into_iter()
		.filter_map(|key| fresh.get(key).or_else(|| stored.get(key)).map(|value| (key, value)))
		.collect()
}
