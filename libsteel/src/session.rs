//! Session lock handling. At most one database may sit decrypted on disk
//! at any time; the lock records which one, persisted as a one-line file
//! in the user's home directory.

use crate::{fsutil, SteelError};
use std::{
	cell::RefCell,
	fs, io,
	path::{Path, PathBuf},
};


/// Where the process stands with respect to open databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
	Closed,
	Open(PathBuf),
}

/// Persistence seam for the session lock, so tests can run against an
/// in-memory lock instead of the user's home directory.
pub trait LockStore {
	fn load(&self) -> Result<Option<PathBuf>, SteelError>;
	fn store(&self, db: &Path) -> Result<(), SteelError>;
	fn clear(&self) -> Result<(), SteelError>;
}


/// The production lock: a file holding a single line with the open
/// database's path. Absence of the file means no session.
pub struct FileLockStore {
	path: PathBuf,
}

impl FileLockStore {
	pub fn new(path: PathBuf) -> FileLockStore {
		FileLockStore { path }
	}
}

impl LockStore for FileLockStore {
	fn load(&self) -> Result<Option<PathBuf>, SteelError> {
		match fs::read_to_string(&self.path) {
			Ok(content) => {
				let line = content.lines().next().unwrap_or("").trim();
				if line.is_empty() {
					Ok(None)
				} else {
					Ok(Some(PathBuf::from(line)))
				}
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(SteelError::Io(e)),
		}
	}

	fn store(&self, db: &Path) -> Result<(), SteelError> {
		fsutil::atomic_write(&self.path, format!("{}\n", db.display()).as_bytes())
	}

	fn clear(&self) -> Result<(), SteelError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(SteelError::Io(e)),
		}
	}
}


/// In-memory lock for tests.
#[derive(Default)]
pub struct MemoryLockStore {
	slot: RefCell<Option<PathBuf>>,
}

impl MemoryLockStore {
	pub fn new() -> MemoryLockStore {
		Default::default()
	}
}

impl LockStore for MemoryLockStore {
	fn load(&self) -> Result<Option<PathBuf>, SteelError> {
		Ok(self.slot.borrow().clone())
	}

	fn store(&self, db: &Path) -> Result<(), SteelError> {
		*self.slot.borrow_mut() = Some(db.to_owned());
		Ok(())
	}

	fn clear(&self) -> Result<(), SteelError> {
		*self.slot.borrow_mut() = None;
		Ok(())
	}
}


pub struct Session {
	lock: Box<dyn LockStore>,
}

impl Session {
	pub fn new(lock: Box<dyn LockStore>) -> Session {
		Session { lock }
	}

	pub fn state(&self) -> Result<SessionState, SteelError> {
		Ok(match self.lock.load()? {
			Some(path) => SessionState::Open(path),
			None => SessionState::Closed,
		})
	}

	/// Claim the session for `path`. Fails with `AlreadyOpen` if any
	/// database is open, including `path` itself.
	pub fn begin(&self, path: &Path) -> Result<(), SteelError> {
		if let Some(open) = self.lock.load()? {
			return Err(SteelError::AlreadyOpen(open));
		}
		self.lock.store(path)
	}

	pub fn end(&self) -> Result<(), SteelError> {
		self.lock.clear()
	}

	/// The open database's path, or `DatabaseNotOpen`.
	pub fn open_path(&self) -> Result<PathBuf, SteelError> {
		self.lock.load()?.ok_or(SteelError::DatabaseNotOpen)
	}

	/// A lock whose named database no longer exists on disk.
	pub fn stale_path(&self) -> Result<Option<PathBuf>, SteelError> {
		Ok(self.lock.load()?.filter(|p| !fsutil::exists(p)))
	}
}
