//! Slot persistence as one JSON file per key.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{SlotBackend, StoredValue};
use crate::error::{StorageError, StorageResult};

/// Stores each slot as `<dir>/<key>.json`.
///
/// Writes land in a uniquely named temporary file in the same directory and
/// are renamed into place, so a reader never observes a half-written payload
/// and concurrent writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileBackend {
	dir: PathBuf,
}

impl FileBackend {
	/// Uses `dir` as the storage directory; it is created on first write.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the file backing `key`.
	pub fn slot_path(&self, key: &str) -> PathBuf {
		let name: String = key
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
			.collect();
		self.dir.join(format!("{name}.json"))
	}
}

fn io_error(path: &Path, error: std::io::Error) -> StorageError {
	StorageError::Io {
		path: path.to_path_buf(),
		error,
	}
}

impl SlotBackend for FileBackend {
	fn read(&self, key: &str) -> StorageResult<Option<StoredValue>> {
		let path = self.slot_path(key);
		let payload = match fs::read_to_string(&path) {
			Ok(payload) => payload,
			Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
			Err(error) => return Err(io_error(&path, error)),
		};
		let written_at = fs::metadata(&path).and_then(|meta| meta.modified()).ok();
		Ok(Some(StoredValue { payload, written_at }))
	}

	fn write(&self, key: &str, payload: &str) -> StorageResult<()> {
		fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

		let path = self.slot_path(key);
		let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| io_error(&self.dir, e))?;
		tmp.write_all(payload.as_bytes())
			.and_then(|()| tmp.as_file().sync_all())
			.map_err(|e| io_error(tmp.path(), e))?;
		tmp.persist(&path).map_err(|e| io_error(&path, e.error))?;

		tracing::trace!(path = %path.display(), bytes = payload.len(), "wrote attribution slot");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_slot_reads_as_none() {
		let dir = tempfile::tempdir().unwrap();
		let backend = FileBackend::new(dir.path());
		assert_eq!(backend.read("utm_attribution").unwrap(), None);
	}

	#[test]
	fn write_creates_directory_and_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let backend = FileBackend::new(dir.path().join("nested/profile"));

		backend.write("utm_attribution", r#"{"utm_source":"google"}"#).unwrap();
		backend.write("utm_attribution", r#"{"utm_source":"bing"}"#).unwrap();

		let stored = backend.read("utm_attribution").unwrap().unwrap();
		assert_eq!(stored.payload, r#"{"utm_source":"bing"}"#);
		assert!(stored.written_at.is_some());

		let leftovers: Vec<_> = fs::read_dir(backend.dir())
			.unwrap()
			.map(|entry| entry.unwrap().file_name())
			.collect();
		assert_eq!(leftovers, vec![std::ffi::OsString::from("utm_attribution.json")]);
	}

	#[test]
	fn concurrent_writers_each_land_a_whole_payload() {
		let dir = tempfile::tempdir().unwrap();
		let backend = FileBackend::new(dir.path());
		let payloads: Vec<String> = (0..8).map(|n| format!(r#"{{"utm_source":"tab{n}"}}"#)).collect();

		std::thread::scope(|scope| {
			for payload in &payloads {
				let backend = &backend;
				scope.spawn(move || {
					for _ in 0..20 {
						backend.write("utm_attribution", payload).unwrap();
					}
				});
			}
		});

		let stored = backend.read("utm_attribution").unwrap().unwrap();
		assert!(payloads.contains(&stored.payload), "{}", stored.payload);

		let leftovers: Vec<_> = fs::read_dir(backend.dir())
			.unwrap()
			.map(|entry| entry.unwrap().file_name())
			.collect();
		assert_eq!(leftovers, vec![std::ffi::OsString::from("utm_attribution.json")]);
	}

	#[test]
	fn keys_are_sanitized_into_file_names() {
		let backend = FileBackend::new("/data");
		assert_eq!(backend.slot_path("../utm attribution"), Path::new("/data/___utm_attribution.json"));
	}

	#[test]
	fn unwritable_directory_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let blocker = dir.path().join("blocker");
		fs::write(&blocker, "").unwrap();

		let backend = FileBackend::new(blocker.join("profile"));
		assert!(matches!(
			backend.write("utm_attribution", "{}"),
			Err(StorageError::Io { .. })
		));
	}
}
