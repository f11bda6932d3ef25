//! The closed set of attribution keys and their query parameter names.

use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// One of the tracked campaign parameters.
///
/// Declaration order is the canonical order used for serialization. Every
/// key maps to exactly one query parameter name; see [`AttributionKey::param`].
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	Display,
	EnumString,
	EnumIter,
	EnumCount,
	IntoStaticStr,
)]
pub enum AttributionKey {
	/// `utm_source`: the referrer (search engine, newsletter, ...).
	#[strum(serialize = "utm_source")]
	Source,
	/// `utm_medium`: the marketing medium (cpc, email, ...).
	#[strum(serialize = "utm_medium")]
	Medium,
	/// `utm_campaign`: the campaign name.
	#[strum(serialize = "utm_campaign")]
	Campaign,
	/// `utm_id`: the campaign id.
	#[strum(serialize = "utm_id")]
	Id,
	/// `utm_term`: paid search keywords.
	#[strum(serialize = "utm_term")]
	Term,
	/// `utm_content`: distinguishes ads or links pointing to the same URL.
	#[strum(serialize = "utm_content")]
	Content,
	/// `gclid`: Google Ads click identifier.
	#[strum(serialize = "gclid")]
	ClickIdPrimary,
	/// `fbclid`: Meta click identifier.
	#[strum(serialize = "fbclid")]
	ClickIdSecondary,
}

impl AttributionKey {
	/// All keys in canonical order.
	pub const ALL: [AttributionKey; <AttributionKey as EnumCount>::COUNT] = [
		Self::Source,
		Self::Medium,
		Self::Campaign,
		Self::Id,
		Self::Term,
		Self::Content,
		Self::ClickIdPrimary,
		Self::ClickIdSecondary,
	];

	/// Query parameter name for this key.
	pub fn param(self) -> &'static str {
		self.into()
	}

	/// Looks up a key by its exact (case-sensitive) query parameter name.
	pub fn from_param(name: &str) -> Option<Self> {
		name.parse().ok()
	}

	/// Position of this key in canonical order.
	pub(crate) const fn index(self) -> usize {
		self as usize
	}
}

#[cfg(test)]
mod tests {
	use strum::IntoEnumIterator;

	use super::*;

	#[test]
	fn all_matches_declaration_order() {
		let iterated: Vec<_> = AttributionKey::iter().collect();
		assert_eq!(iterated, AttributionKey::ALL);
		for (i, key) in AttributionKey::ALL.iter().enumerate() {
			assert_eq!(key.index(), i);
		}
	}

	#[test]
	fn params_round_trip_through_lookup() {
		for key in AttributionKey::ALL {
			assert_eq!(AttributionKey::from_param(key.param()), Some(key));
			assert_eq!(key.to_string(), key.param());
		}
		assert_eq!(AttributionKey::ClickIdPrimary.param(), "gclid");
		assert_eq!(AttributionKey::ClickIdSecondary.param(), "fbclid");
	}

	#[test]
	fn lookup_is_exact() {
		assert_eq!(AttributionKey::from_param("UTM_SOURCE"), None);
		assert_eq!(AttributionKey::from_param("utm_source "), None);
		assert_eq!(AttributionKey::from_param("ref"), None);
		assert_eq!(AttributionKey::from_param(""), None);
	}
}
