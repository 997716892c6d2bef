//! Steel: a local, single-user password manager.
//!
//! The database lives at a user-chosen path in one of two states: an
//! encrypted container (see the `steelcrypto` crate for the format) or,
//! while a session is open, the plaintext record catalogue. The session
//! lock guarantees at most one database is decrypted at any time; the
//! tracking registry remembers every database this user has touched so
//! status can be reported.
//!
//! All operations are synchronous and run to completion or fail. Errors
//! carry no user-facing formatting; rendering is the caller's job.

mod errors;
mod fsutil;
mod record;
mod session;
mod tracking;

pub use errors::SteelError;
pub use record::{Field, Record, RecordStore};
pub use session::{FileLockStore, LockStore, MemoryLockStore, Session, SessionState};
pub use steelcrypto;
pub use tracking::Registry;

use rand::{rngs::OsRng, Rng};
use std::path::{Path, PathBuf};
use tracing::warn;


/// Condition of one tracked database, as reported by `list_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
	/// The tracked file no longer exists; the registry entry was dropped.
	Missing,
	/// Encrypted container on disk.
	Encrypted,
	/// Decrypted and named by the session lock.
	Open,
	/// Decrypted but not named by the session lock.
	Plaintext,
}

#[derive(Debug, Clone)]
pub struct DatabaseStatus {
	pub path: PathBuf,
	pub state: DatabaseState,
}

/// Result of `list_status`: the per-database report, plus the stale lock
/// that was cleaned up, if there was one.
#[derive(Debug, Clone)]
pub struct StatusReport {
	pub databases: Vec<DatabaseStatus>,
	pub removed_stale_lock: Option<PathBuf>,
}


/// The public face of the library. One value of this type owns the session
/// lock and the tracking registry; every user-initiated operation enters
/// through it.
pub struct Steel {
	session: Session,
	registry: Registry,
}

impl Steel {
	/// A facade rooted at the user's home directory, using `~/.steel_open`
	/// for the session lock and `~/.steel_dbs` for the tracking registry.
	pub fn new() -> Result<Steel, SteelError> {
		let home = fsutil::home_dir()?;

		Ok(Steel {
			session: Session::new(Box::new(FileLockStore::new(home.join(".steel_open")))),
			registry: Registry::new(home.join(".steel_dbs")),
		})
	}

	/// Build a facade over explicit stores. Tests use this with
	/// `MemoryLockStore` and a registry inside a temp directory.
	pub fn with_stores(lock: Box<dyn LockStore>, registry: Registry) -> Steel {
		Steel {
			session: Session::new(lock),
			registry,
		}
	}

	/// Create a new empty database at `path` and claim the session for it.
	///
	/// The catalogue starts out in plaintext; the first `close` encrypts
	/// it. Needs no passphrase for that reason.
	pub fn init(&self, path: &Path) -> Result<(), SteelError> {
		let path = fsutil::absolute(path)?;

		if let SessionState::Open(open) = self.session.state()? {
			return Err(SteelError::AlreadyOpen(open));
		}

		RecordStore::create(&path)?;
		self.registry.add(&path)?;
		self.session.begin(&path)
	}

	/// Decrypt the database at `path` and open a session on it.
	pub fn open(&self, path: &Path, passphrase: &str) -> Result<(), SteelError> {
		let path = fsutil::absolute(path)?;

		if let SessionState::Open(open) = self.session.state()? {
			return Err(SteelError::AlreadyOpen(open));
		}
		if !fsutil::exists(&path) {
			return Err(SteelError::NotFound(path));
		}

		steelcrypto::decrypt_file(&path, passphrase).map_err(|e| SteelError::from_crypto(e, &path))?;
		self.registry.add(&path)?;
		self.session.begin(&path)
	}

	/// Encrypt the open database and end the session.
	pub fn close(&self, passphrase: &str) -> Result<(), SteelError> {
		let path = self.session.open_path()?;

		if !fsutil::exists(&path) {
			// Stale lock; list_status reports and removes it.
			return Err(SteelError::NotFound(path));
		}

		steelcrypto::encrypt_file(&path, passphrase).map_err(|e| SteelError::from_crypto(e, &path))?;
		self.session.end()
	}

	fn store(&self) -> Result<RecordStore, SteelError> {
		let path = self.session.open_path()?;
		RecordStore::open(&path)
	}

	/// Add a record to the open database; the store assigns its id.
	pub fn add(
		&self,
		title: &str,
		user: &str,
		passphrase: &str,
		url: &str,
		notes: &str,
	) -> Result<Record, SteelError> {
		self.store()?.add(title, user, passphrase, url, notes)
	}

	pub fn get(&self, id: u64) -> Result<Option<Record>, SteelError> {
		Ok(self.store()?.get(id).cloned())
	}

	pub fn list(&self) -> Result<Vec<Record>, SteelError> {
		Ok(self.store()?.list().to_vec())
	}

	pub fn find(&self, text: &str) -> Result<Vec<Record>, SteelError> {
		Ok(self.store()?.find(text).into_iter().cloned().collect())
	}

	pub fn delete(&self, id: u64) -> Result<(), SteelError> {
		self.store()?.delete(id)
	}

	pub fn update(&self, id: u64, field: &str, value: &str) -> Result<(), SteelError> {
		self.store()?.update(id, Field::parse(field)?, value)
	}

	/// Read a single field of one record. Only passphrase, user, url and
	/// notes can be read this way.
	pub fn show_field(&self, id: u64, field: &str) -> Result<Option<String>, SteelError> {
		let field = Field::parse(field)?;

		if field == Field::Title {
			return Err(SteelError::InvalidArgument("field \"title\" cannot be shown".to_owned()));
		}

		Ok(self.store()?.get(id).map(|record| match field {
			Field::Passphrase => record.passphrase.clone(),
			Field::User => record.user.clone(),
			Field::Url => record.url.clone(),
			Field::Notes => record.notes.clone(),
			Field::Title => unreachable!(),
		}))
	}

	/// Uniform random alphanumeric password.
	pub fn generate(&self, length: usize) -> Result<String, SteelError> {
		random_password(length)
	}

	/// Copy an encrypted database to a new location.
	pub fn backup(&self, source: &Path, dest: &Path) -> Result<(), SteelError> {
		let source = fsutil::absolute(source)?;
		let dest = fsutil::absolute(dest)?;

		if !fsutil::exists(&source) {
			return Err(SteelError::NotFound(source));
		}
		if !steelcrypto::is_file_encrypted(&source).map_err(|e| SteelError::from_crypto(e, &source))? {
			// Refusing to copy plaintext around; close the database first.
			return Err(SteelError::NotEncrypted(source));
		}

		fsutil::copy_file(&source, &dest)
	}

	/// Restore a backup copy into place and start tracking it.
	pub fn import_backup(&self, source: &Path, dest: &Path) -> Result<(), SteelError> {
		let source = fsutil::absolute(source)?;
		let dest = fsutil::absolute(dest)?;

		if !fsutil::exists(&source) {
			return Err(SteelError::NotFound(source));
		}
		if !steelcrypto::is_file_encrypted(&source).map_err(|e| SteelError::from_crypto(e, &source))? {
			return Err(SteelError::NotEncrypted(source));
		}

		fsutil::copy_file(&source, &dest)?;
		self.registry.add(&dest)
	}

	/// Report the state of every tracked database. A stale session lock is
	/// removed, and registry entries whose files are gone are pruned.
	pub fn list_status(&self) -> Result<StatusReport, SteelError> {
		let removed_stale_lock = match self.session.stale_path()? {
			Some(stale) => {
				warn!(path = %stale.display(), "removing stale session lock");
				self.session.end()?;
				Some(stale)
			}
			None => None,
		};

		let open_path = match self.session.state()? {
			SessionState::Open(p) => Some(p),
			SessionState::Closed => None,
		};

		let mut databases = Vec::new();
		for path in self.registry.list()? {
			let state = if !fsutil::exists(&path) {
				self.registry.remove(&path)?;
				DatabaseState::Missing
			} else if steelcrypto::is_file_encrypted(&path).map_err(|e| SteelError::from_crypto(e, &path))? {
				DatabaseState::Encrypted
			} else if open_path.as_deref() == Some(path.as_path()) {
				DatabaseState::Open
			} else {
				DatabaseState::Plaintext
			};

			databases.push(DatabaseStatus { path, state });
		}

		Ok(StatusReport {
			databases,
			removed_stale_lock,
		})
	}

	/// Shred a database: overwrite it with random data, remove it, and
	/// forget it ever existed.
	pub fn remove_database(&self, path: &Path) -> Result<(), SteelError> {
		let path = fsutil::absolute(path)?;

		if !fsutil::exists(&path) {
			return Err(SteelError::NotFound(path));
		}

		warn!(path = %path.display(), "shredding database");
		fsutil::secure_erase(&path)?;
		self.registry.remove(&path)?;

		if let SessionState::Open(open) = self.session.state()? {
			if open == path {
				self.session.end()?;
			}
		}

		Ok(())
	}
}


/// Generate a password of `length` characters drawn uniformly from
/// `[A-Za-z0-9]`. Lengths under 6 are rejected.
pub fn random_password(length: usize) -> Result<String, SteelError> {
	const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
	const MIN_LENGTH: usize = 6;

	if length < MIN_LENGTH {
		return Err(SteelError::InvalidArgument(format!(
			"password length must be at least {}",
			MIN_LENGTH
		)));
	}

	// gen_range rejection-samples internally, so there is no modular bias.
	let password = (0..length)
		.map(|_| ALPHABET[OsRng.gen_range(0..ALPHABET.len())] as char)
		.collect();

	Ok(password)
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	#[test]
	fn test_random_password() {
		assert_eq!(random_password(6).unwrap().len(), 6);
		assert_eq!(random_password(16).unwrap().len(), 16);
		assert_eq!(random_password(128).unwrap().len(), 128);

		assert!(matches!(random_password(5), Err(SteelError::InvalidArgument(_))));
		assert!(matches!(random_password(0), Err(SteelError::InvalidArgument(_))));

		for _ in 0..1000 {
			let password = random_password(16).unwrap();
			assert_eq!(password.len(), 16);
			assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
		}
	}

	#[test]
	fn test_random_password_randomness() {
		// A simple randomness test. We know the source is good (OsRng) but
		// this makes sure our use of it is correct.
		let mut bins = HashMap::new();
		let sample: String = (0..10_000).map(|_| random_password(100).unwrap()).collect();

		assert_eq!(sample.len(), 1_000_000);

		for c in sample.chars() {
			*bins.entry(c).or_insert(0) += 1;
		}

		// Every character of the alphabet should show up in 100k draws
		assert_eq!(bins.len(), 62);

		let mut chi_squared = 0.0;
		let e = sample.len() as f64 / 62.0;

		for o in bins.values() {
			chi_squared += ((*o as f64 - e) * (*o as f64 - e)) / e;
		}

		// >335.9 will basically never happen by chance
		assert!(chi_squared < 335.9);
	}
}
