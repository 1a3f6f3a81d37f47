//! On-disk JSON documents guarded by advisory file locks.
//!
//! Each call locks exactly one file for exactly one operation: shared for
//! reads, exclusive for writes and single-document updates. There is no
//! transaction across documents; callers that touch several documents do so
//! with independent calls and other actors may observe the state in between.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
	Definitions,
	Running,
	Stopped,
}

impl Document {
	pub fn file_name(self) -> &'static str {
		match self {
			Document::Definitions => "pmx-log.json",
			Document::Running => "pmx-running-log.json",
			Document::Stopped => "pmx-stopped-log.json",
		}
	}
}

#[derive(Debug, Clone)]
pub struct StateStore {
	work_dir: PathBuf,
}

impl StateStore {
	/// Opens the store rooted at `work_dir`, creating the directory if needed.
	pub fn open(work_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let work_dir = work_dir.into();
		fs::create_dir_all(&work_dir).map_err(|source| StoreError::Io {
			path: work_dir.clone(),
			source,
		})?;
		Ok(Self { work_dir })
	}

	pub fn work_dir(&self) -> &Path {
		&self.work_dir
	}

	pub fn path(&self, doc: Document) -> PathBuf {
		self.work_dir.join(doc.file_name())
	}

	/// Reads a document. An absent or empty file yields `T::default()` and is
	/// written back so the file exists afterwards.
	pub fn read<T>(&self, doc: Document) -> Result<T, StoreError>
	where
		T: DeserializeOwned + Serialize + Default,
	{
		let path = self.path(doc);
		match read_json_locked(&path)? {
			Some(value) => Ok(value),
			None => {
				let value = T::default();
				if let Err(e) = heal(&path, &value) {
					tracing::warn!(path = %path.display(), "failed to recreate document: {}", e);
				}
				Ok(value)
			}
		}
	}

	pub fn write<T: Serialize>(&self, doc: Document, value: &T) -> Result<(), StoreError> {
		write_json_locked(&self.path(doc), value)
	}

	/// Read-modify-write of a single document under one exclusive lock.
	pub fn update<T, R, F>(&self, doc: Document, f: F) -> Result<R, StoreError>
	where
		T: DeserializeOwned + Serialize + Default,
		F: FnOnce(&mut T) -> R,
	{
		let path = self.path(doc);
		let mut file = open_rw(&path)?;
		lock(&file, &path, true)?;
		let result = update_locked(&mut file, &path, f);
		let _ = FileExt::unlock(&file);
		result
	}
}

/// Reads any JSON file under a shared lock. `Ok(None)` when the file is
/// absent or holds only whitespace.
pub fn read_json_locked<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
	let file = match File::open(path) {
		Ok(f) => f,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(source) => {
			return Err(StoreError::Io {
				path: path.to_path_buf(),
				source,
			})
		}
	};
	lock(&file, path, false)?;
	let mut content = String::new();
	let read = (&file).read_to_string(&mut content);
	let _ = FileExt::unlock(&file);
	read.map_err(|source| StoreError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	decode(path, &content)
}

pub fn write_json_locked<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
	let mut file = open_rw(path)?;
	lock(&file, path, true)?;
	let result = replace_contents(&mut file, path, value);
	let _ = FileExt::unlock(&file);
	result
}

fn update_locked<T, R, F>(file: &mut File, path: &Path, f: F) -> Result<R, StoreError>
where
	T: DeserializeOwned + Serialize + Default,
	F: FnOnce(&mut T) -> R,
{
	let mut content = String::new();
	file.read_to_string(&mut content).map_err(|source| StoreError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	let mut value: T = decode(path, &content)?.unwrap_or_default();
	let out = f(&mut value);
	replace_contents(file, path, &value)?;
	Ok(out)
}

// Only fills a file that is still absent or empty once the exclusive lock is
// held, so a concurrent writer's document is never replaced.
fn heal<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
	let mut file = open_rw(path)?;
	lock(&file, path, true)?;
	let result = heal_locked(&mut file, path, value);
	let _ = FileExt::unlock(&file);
	result
}

fn heal_locked<T: Serialize>(file: &mut File, path: &Path, value: &T) -> Result<(), StoreError> {
	let mut content = String::new();
	file.read_to_string(&mut content).map_err(|source| StoreError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	if content.trim().is_empty() {
		replace_contents(file, path, value)?;
	}
	Ok(())
}

fn decode<T: DeserializeOwned>(path: &Path, content: &str) -> Result<Option<T>, StoreError> {
	if content.trim().is_empty() {
		return Ok(None);
	}
	serde_json::from_str(content)
		.map(Some)
		.map_err(|source| StoreError::Decode {
			path: path.to_path_buf(),
			source,
		})
}

fn encode<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, StoreError> {
	let mut buf = Vec::new();
	let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
	let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
	value.serialize(&mut ser).map_err(|source| StoreError::Encode {
		path: path.to_path_buf(),
		source,
	})?;
	buf.push(b'\n');
	Ok(buf)
}

fn replace_contents<T: Serialize>(file: &mut File, path: &Path, value: &T) -> Result<(), StoreError> {
	let bytes = encode(path, value)?;
	let io_err = |source| StoreError::Io {
		path: path.to_path_buf(),
		source,
	};
	file.set_len(0).map_err(io_err)?;
	file.seek(SeekFrom::Start(0)).map_err(io_err)?;
	file.write_all(&bytes).map_err(io_err)?;
	file.flush().map_err(io_err)?;
	Ok(())
}

fn open_rw(path: &Path) -> Result<File, StoreError> {
	OpenOptions::new()
		.read(true)
		.write(true)
		.create(true)
		.truncate(false)
		.open(path)
		.map_err(|source| StoreError::Io {
			path: path.to_path_buf(),
			source,
		})
}

fn lock(file: &File, path: &Path, exclusive: bool) -> Result<(), StoreError> {
	let result = if exclusive {
		FileExt::lock_exclusive(file)
	} else {
		FileExt::lock_shared(file)
	};
	result.map_err(|source| StoreError::Lock {
		path: path.to_path_buf(),
		source,
	})
}
