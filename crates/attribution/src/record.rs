//! Immutable attribution records.

use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::EnumCount;
use url::form_urlencoded;

use crate::key::AttributionKey;

/// Campaign attribution captured for a visit.
///
/// A key is present only when it carries a non-empty value. Records are never
/// mutated in place: [`with`](Self::with) and [`without`](Self::without)
/// consume the record and hand back a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributionRecord {
	values: [Option<Box<str>>; AttributionKey::COUNT],
}

impl AttributionRecord {
	/// Creates an empty record.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a record with `key` set to `value`.
	///
	/// An empty `value` removes the key instead, so empty strings are never stored.
	#[must_use]
	pub fn with(mut self, key: AttributionKey, value: impl Into<String>) -> Self {
		let value = value.into();
		self.values[key.index()] = (!value.is_empty()).then(|| value.into_boxed_str());
		self
	}

	/// Returns a record without `key`.
	#[must_use]
	pub fn without(mut self, key: AttributionKey) -> Self {
		self.values[key.index()] = None;
		self
	}

	pub fn get(&self, key: AttributionKey) -> Option<&str> {
		self.values[key.index()].as_deref()
	}

	pub fn contains(&self, key: AttributionKey) -> bool {
		self.values[key.index()].is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.values.iter().all(Option::is_none)
	}

	/// Number of present keys.
	pub fn len(&self) -> usize {
		self.values.iter().filter(|v| v.is_some()).count()
	}

	/// Present entries in canonical key order.
	pub fn iter(&self) -> impl Iterator<Item = (AttributionKey, &str)> + '_ {
		AttributionKey::ALL
			.into_iter()
			.filter_map(|key| self.get(key).map(|value| (key, value)))
	}

	/// Present keys in canonical key order.
	pub fn keys(&self) -> impl Iterator<Item = AttributionKey> + '_ {
		self.iter().map(|(key, _)| key)
	}

	/// Canonical form-encoded query string, without a leading `?`.
	///
	/// Keys appear in canonical order, so two equal records always serialize
	/// identically no matter how they were assembled. Empty records produce
	/// an empty string.
	pub fn to_query_string(&self) -> String {
		let mut serializer = form_urlencoded::Serializer::new(String::new());
		for (key, value) in self.iter() {
			serializer.append_pair(key.param(), value);
		}
		serializer.finish()
	}
}

impl<S: Into<String>> FromIterator<(AttributionKey, S)> for AttributionRecord {
	/// The first non-empty value for each key wins.
	fn from_iter<I: IntoIterator<Item = (AttributionKey, S)>>(iter: I) -> Self {
		let mut record = Self::new();
		for (key, value) in iter {
			if !record.contains(key) {
				record = record.with(key, value);
			}
		}
		record
	}
}

impl fmt::Display for AttributionRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_query_string())
	}
}

impl Serialize for AttributionRecord {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.len()))?;
		for (key, value) in self.iter() {
			map.serialize_entry(key.param(), value)?;
		}
		map.end()
	}
}

/// Member value of a stored object. Anything other than a string is dropped.
#[derive(Deserialize)]
#[serde(untagged)]
enum MemberValue {
	Text(String),
	Other(#[allow(dead_code)] IgnoredAny),
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
	type Value = AttributionRecord;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("an object of attribution parameters")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
		let mut record = AttributionRecord::new();
		while let Some((name, value)) = access.next_entry::<String, MemberValue>()? {
			let (Some(key), MemberValue::Text(value)) = (AttributionKey::from_param(&name), value) else {
				continue;
			};
			if !record.contains(key) {
				record = record.with(key, value);
			}
		}
		Ok(record)
	}
}

impl<'de> Deserialize<'de> for AttributionRecord {
	/// Accepts any object: unknown members, non-string members and empty strings are skipped.
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_map(RecordVisitor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn with_empty_value_removes_key() {
		let record = AttributionRecord::new()
			.with(AttributionKey::Source, "google")
			.with(AttributionKey::Source, "");
		assert!(record.is_empty());
		assert_eq!(record.get(AttributionKey::Source), None);
	}

	#[test]
	fn query_string_is_canonical_regardless_of_insertion_order() {
		let a = AttributionRecord::new()
			.with(AttributionKey::ClickIdSecondary, "fb.1")
			.with(AttributionKey::Campaign, "spring sale")
			.with(AttributionKey::Source, "google");
		let b = AttributionRecord::new()
			.with(AttributionKey::Source, "google")
			.with(AttributionKey::Campaign, "spring sale")
			.with(AttributionKey::ClickIdSecondary, "fb.1");
		assert_eq!(a, b);
		assert_eq!(
			a.to_query_string(),
			"utm_source=google&utm_campaign=spring+sale&fbclid=fb.1"
		);
		assert_eq!(a.to_query_string(), b.to_query_string());
	}

	#[test]
	fn empty_record_serializes_to_empty_query() {
		assert_eq!(AttributionRecord::new().to_query_string(), "");
		assert_eq!(AttributionRecord::new().len(), 0);
	}

	#[test]
	fn from_iter_keeps_first_non_empty_value() {
		let record: AttributionRecord = [
			(AttributionKey::Medium, ""),
			(AttributionKey::Medium, "email"),
			(AttributionKey::Medium, "cpc"),
		]
		.into_iter()
		.collect();
		assert_eq!(record.get(AttributionKey::Medium), Some("email"));
		assert_eq!(record.len(), 1);
	}

	#[test]
	fn json_uses_parameter_names_in_canonical_order() {
		let record = AttributionRecord::new()
			.with(AttributionKey::ClickIdPrimary, "abc")
			.with(AttributionKey::Source, "google");
		let json = serde_json::to_string(&record).unwrap();
		assert_eq!(json, r#"{"utm_source":"google","gclid":"abc"}"#);
	}

	#[test]
	fn json_decoding_drops_foreign_and_empty_members() {
		let json = r#"{"utm_source":"google","utm_medium":"","ref":"x","utm_id":7,"utm_term":null,"fbclid":{"a":1}}"#;
		let record: AttributionRecord = serde_json::from_str(json).unwrap();
		assert_eq!(record.len(), 1);
		assert_eq!(record.get(AttributionKey::Source), Some("google"));
	}

	#[test]
	fn json_decoding_rejects_non_objects() {
		assert!(serde_json::from_str::<AttributionRecord>("[]").is_err());
		assert!(serde_json::from_str::<AttributionRecord>("\"utm_source\"").is_err());
		assert!(serde_json::from_str::<AttributionRecord>("null").is_err());
	}
}
