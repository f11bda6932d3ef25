//! Error types for the attribution slot, its backends and configuration.
//!
//! None of these reach UI-facing callers: the store and the context turn them
//! into [`Diagnostic`](crate::diagnostics::Diagnostic)s and degrade instead.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a [`SlotBackend`](crate::store::SlotBackend).
#[derive(Debug, Error)]
pub enum StorageError {
	/// Persistence is disabled or blocked for this profile.
	#[error("storage unavailable: {0}")]
	Unavailable(String),

	/// Error reading or writing a slot file.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path of the slot file.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// The stored payload could not be decoded into a record.
#[derive(Debug, Error)]
pub enum SlotError {
	#[error("invalid attribution payload: {0}")]
	Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for `{field}`: {reason}")]
	Invalid {
		field: &'static str,
		reason: String,
	},
}

/// Result type for backend operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
