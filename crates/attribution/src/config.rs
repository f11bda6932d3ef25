//! TOML configuration for the attribution store.
//!
//! ```toml
//! # Storage identifier of the durable slot.
//! slot_key = "utm_attribution"
//!
//! # Drop stored attribution older than this many days.
//! # Omit to keep it until the user clears site data.
//! retention_days = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::slot::DEFAULT_SLOT_KEY;
use crate::store::{Retention, StoreConfig};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributionConfig {
	pub slot_key: String,
	/// `None` keeps stored attribution indefinitely.
	pub retention_days: Option<u64>,
}

impl Default for AttributionConfig {
	fn default() -> Self {
		Self {
			slot_key: DEFAULT_SLOT_KEY.to_string(),
			retention_days: None,
		}
	}
}

impl AttributionConfig {
	/// Parses a TOML string.
	pub fn parse(input: &str) -> ConfigResult<Self> {
		Ok(toml::from_str(input)?)
	}

	/// Loads configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}

	/// Validates and converts into store settings.
	pub fn into_store_config(self) -> ConfigResult<StoreConfig> {
		if self.slot_key.trim().is_empty() {
			return Err(ConfigError::Invalid {
				field: "slot_key",
				reason: "must not be empty".into(),
			});
		}
		let retention = match self.retention_days {
			None => Retention::Never,
			Some(0) => {
				return Err(ConfigError::Invalid {
					field: "retention_days",
					reason: "must be at least 1; omit it to never expire".into(),
				});
			}
			Some(days) => {
				let secs = days.checked_mul(SECS_PER_DAY).ok_or_else(|| ConfigError::Invalid {
					field: "retention_days",
					reason: format!("{days} days is out of range"),
				})?;
				Retention::MaxAge(Duration::from_secs(secs))
			}
		};
		Ok(StoreConfig {
			slot_key: self.slot_key,
			retention,
		})
	}
}
