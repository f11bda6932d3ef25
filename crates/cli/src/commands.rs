use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::Serialize;
use trail_attribution::{
	AttributionConfig, AttributionContext, AttributionRecord, AttributionStore, FileBackend, SetOutcome,
};

const APP_DIR: &str = "trail";

/// Loads `explicit`, or the default config file when it exists, or defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> anyhow::Result<AttributionConfig> {
	if let Some(path) = explicit {
		return AttributionConfig::load(path).with_context(|| format!("loading {}", path.display()));
	}
	let Some(path) = dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")) else {
		return Ok(AttributionConfig::default());
	};
	if !path.is_file() {
		return Ok(AttributionConfig::default());
	}
	tracing::debug!(path = %path.display(), "loading configuration");
	AttributionConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

pub(crate) fn default_data_dir() -> anyhow::Result<PathBuf> {
	dirs::data_dir()
		.map(|dir| dir.join(APP_DIR))
		.context("no data directory for this platform; pass --data-dir")
}

/// Builds the store and the context without running a navigation.
pub(crate) fn open_context(config: AttributionConfig, data_dir: &Path) -> anyhow::Result<AttributionContext> {
	let store_config = config.into_store_config()?;
	tracing::debug!(dir = %data_dir.display(), slot = %store_config.slot_key, "opening attribution store");
	let store = AttributionStore::new(FileBackend::new(data_dir), store_config);
	Ok(AttributionContext::new(Arc::new(store), ""))
}

/// Query component of a location: everything between `?` and `#`, or the
/// whole input when it has no `?`.
fn query_of(location: &str) -> &str {
	let location = location.split_once('#').map_or(location, |(before, _)| before);
	location.split_once('?').map_or(location, |(_, query)| query)
}

#[derive(Serialize)]
struct VisitReport<'a> {
	attribution: &'a AttributionRecord,
	captured: &'a AttributionRecord,
	persisted: &'static str,
}

pub(crate) fn visit(context: &AttributionContext, location: &str, out: &mut impl Write) -> anyhow::Result<()> {
	let outcome = context.navigate(query_of(location));
	let persisted = match outcome.persisted {
		None => "no-parameters",
		Some(SetOutcome::Written) => "written",
		Some(SetOutcome::SkippedEmpty) => "skipped",
		Some(SetOutcome::Unavailable) => "unavailable",
	};
	let report = VisitReport {
		attribution: &outcome.record,
		captured: &outcome.fresh,
		persisted,
	};
	serde_json::to_writer_pretty(&mut *out, &report)?;
	writeln!(out)?;
	Ok(())
}

pub(crate) fn show(context: &AttributionContext, out: &mut impl Write) -> anyhow::Result<()> {
	let record = context.snapshot();
	serde_json::to_writer_pretty(&mut *out, &*record)?;
	writeln!(out)?;
	writeln!(out, "{}", record.to_query_string())?;
	Ok(())
}

pub(crate) fn enrich(context: &AttributionContext, url: &str, out: &mut impl Write) -> anyhow::Result<()> {
	writeln!(out, "{}", context.enrich(url))?;
	Ok(())
}
