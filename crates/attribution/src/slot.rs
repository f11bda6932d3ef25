//! Wire format of the durable slot.
//!
//! The payload is a flat JSON object keyed by parameter name, e.g.
//! `{"utm_source":"google","utm_medium":"email"}`. There is no version field;
//! should one ever be introduced, [`decode`] is where it would be read.

use crate::error::SlotError;
use crate::record::AttributionRecord;

/// Default storage identifier of the slot.
pub const DEFAULT_SLOT_KEY: &str = "utm_attribution";

/// Encodes a record as the slot payload.
pub fn encode(record: &AttributionRecord) -> String {
	// A map of string keys to string values always serializes.
	serde_json::to_string(record).unwrap_or_else(|_| String::from("{}"))
}

/// Decodes a slot payload.
///
/// Anything that is not a JSON object fails; foreign members are dropped.
pub fn decode(payload: &str) -> Result<AttributionRecord, SlotError> {
	Ok(serde_json::from_str(payload)?)
}
