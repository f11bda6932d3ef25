//! Stamping of attribution onto outbound URLs.

use std::borrow::Cow;

use url::{Url, form_urlencoded};

use crate::key::AttributionKey;
use crate::record::AttributionRecord;

pub(crate) struct Stamped {
	pub(crate) url: String,
	/// Set when `url` was not parseable and got stamped textually.
	pub(crate) parse_error: Option<url::ParseError>,
}

/// Returns `url` with every present key of `record` set as a query parameter.
///
/// An existing parameter of the same name is replaced in place (later
/// duplicates are dropped) and missing ones are appended in canonical order.
/// Every other query segment is copied byte for byte, and the path and the
/// fragment are kept, so enriching twice gives the same result as enriching once.
///
/// URLs that `url::Url` cannot parse (relative or malformed) get the same
/// treatment on their raw text: the query is located between the first `?`
/// and the first `#`. An empty record returns `url` unchanged.
pub fn enrich(record: &AttributionRecord, url: &str) -> String {
	stamp(record, url).url
}

pub(crate) fn stamp(record: &AttributionRecord, url: &str) -> Stamped {
	if record.is_empty() {
		return Stamped {
			url: url.to_string(),
			parse_error: None,
		};
	}

	match Url::parse(url) {
		Ok(mut parsed) => {
			let query = stamp_query(parsed.query().unwrap_or(""), record);
			parsed.set_query(Some(&query));
			Stamped {
				url: parsed.into(),
				parse_error: None,
			}
		}
		Err(error) => Stamped {
			url: stamp_raw(url, record),
			parse_error: Some(error),
		},
	}
}

fn stamp_raw(url: &str, record: &AttributionRecord) -> String {
	let (before_fragment, fragment) = match url.find('#') {
		Some(at) => url.split_at(at),
		None => (url, ""),
	};
	let (base, query) = before_fragment.split_once('?').unwrap_or((before_fragment, ""));
	format!("{base}?{}{fragment}", stamp_query(query, record))
}

/// Rewrites a raw query string. Only segment names are decoded; segments that
/// do not carry a present key are copied verbatim.
fn stamp_query(query: &str, record: &AttributionRecord) -> String {
	let mut placed = [false; AttributionKey::ALL.len()];
	let mut segments: Vec<Cow<'_, str>> = Vec::new();

	for segment in query.split('&').filter(|segment| !segment.is_empty()) {
		let raw_name = segment.split_once('=').map_or(segment, |(name, _)| name);
		let stamped = form_urlencoded::parse(raw_name.as_bytes())
			.next()
			.and_then(|(name, _)| AttributionKey::from_param(&name))
			.and_then(|key| Some((key, record.get(key)?)));
		match stamped {
			Some((key, value)) => {
				if !std::mem::replace(&mut placed[key.index()], true) {
					segments.push(Cow::Owned(encode_pair(key, value)));
				}
			}
			None => segments.push(Cow::Borrowed(segment)),
		}
	}
	for (key, value) in record.iter() {
		if !placed[key.index()] {
			segments.push(Cow::Owned(encode_pair(key, value)));
		}
	}
	segments.join("&")
}

fn encode_pair(key: AttributionKey, value: &str) -> String {
	let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
	format!("{}={value}", key.param())
}
