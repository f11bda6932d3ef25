//! Extraction of attribution parameters from a page's query string.

use url::{Url, form_urlencoded};

use crate::key::AttributionKey;
use crate::record::AttributionRecord;

/// Extracts recognized parameters from a raw query string.
///
/// A leading `?` is optional. Only the first occurrence of a parameter counts,
/// even when it is empty, in which case the key stays absent. Unrecognized
/// parameters are ignored and malformed input never fails.
pub fn read_query(query: &str) -> AttributionRecord {
	let query = query.strip_prefix('?').unwrap_or(query);
	let mut seen = [false; AttributionKey::ALL.len()];
	let mut record = AttributionRecord::new();

	for (name, value) in form_urlencoded::parse(query.as_bytes()) {
		let Some(key) = AttributionKey::from_param(&name) else {
			continue;
		};
		if std::mem::replace(&mut seen[key.index()], true) {
			continue;
		}
		record = record.with(key, value);
	}
	record
}

/// Extracts recognized parameters from a URL's query component.
pub fn read_url(url: &Url) -> AttributionRecord {
	url.query().map(read_query).unwrap_or_default()
}
