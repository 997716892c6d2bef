//! The credential catalogue: an ordered table of records kept as a
//! deterministic serialized file while the database is open. Column labels
//! are a presentation concern; nothing here stores them.

use crate::{fsutil, SteelError};
use serde::{Deserialize, Serialize};
use std::{
	fs,
	path::{Path, PathBuf},
};
use zeroize::Zeroize;


/// One credential entry. Identity, and therefore equality, is the
/// store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
	pub id: u64,
	pub title: String,
	pub user: String,
	pub passphrase: String,
	pub url: String,
	pub notes: String,
}

impl PartialEq for Record {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Record {}


/// Column selector for updates and single-field reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	Title,
	User,
	Passphrase,
	Url,
	Notes,
}

impl Field {
	pub fn parse(name: &str) -> Result<Field, SteelError> {
		match name {
			"title" => Ok(Field::Title),
			"user" => Ok(Field::User),
			"passphrase" => Ok(Field::Passphrase),
			"url" => Ok(Field::Url),
			"notes" => Ok(Field::Notes),
			other => Err(SteelError::InvalidArgument(format!("unknown field \"{}\"", other))),
		}
	}
}


// Serialized field order is fixed by declaration order, so the same
// catalogue always produces the same bytes and survives an
// encrypt/decrypt round trip unchanged.
#[derive(Serialize, Deserialize)]
struct Catalogue {
	next_id: u64,
	records: Vec<Record>,
}

pub struct RecordStore {
	path: PathBuf,
	catalogue: Catalogue,
}

impl RecordStore {
	/// Initialize an empty catalogue at `path`. Fails if the path exists.
	pub fn create(path: &Path) -> Result<RecordStore, SteelError> {
		if fsutil::exists(path) {
			return Err(SteelError::AlreadyExists(path.to_owned()));
		}

		let store = RecordStore {
			path: path.to_owned(),
			catalogue: Catalogue {
				next_id: 1,
				records: Vec::new(),
			},
		};
		store.save()?;
		Ok(store)
	}

	/// Open the decrypted catalogue at `path`.
	pub fn open(path: &Path) -> Result<RecordStore, SteelError> {
		if !fsutil::exists(path) {
			return Err(SteelError::NotFound(path.to_owned()));
		}
		if steelcrypto::is_file_encrypted(path).map_err(|e| SteelError::from_crypto(e, path))? {
			return Err(SteelError::DatabaseEncrypted(path.to_owned()));
		}

		let mut data = fs::read(path)?;
		let catalogue = serde_json::from_slice(&data);
		data.zeroize();

		Ok(RecordStore {
			path: path.to_owned(),
			catalogue: catalogue?,
		})
	}

	/// The id the next added record will receive. Ids count up from 1 and
	/// are never reused, even after deletions.
	pub fn next_id(&self) -> u64 {
		self.catalogue.next_id
	}

	pub fn add(
		&mut self,
		title: &str,
		user: &str,
		passphrase: &str,
		url: &str,
		notes: &str,
	) -> Result<Record, SteelError> {
		let record = Record {
			id: self.catalogue.next_id,
			title: title.to_owned(),
			user: user.to_owned(),
			passphrase: passphrase.to_owned(),
			url: url.to_owned(),
			notes: notes.to_owned(),
		};

		self.catalogue.next_id += 1;
		self.catalogue.records.push(record.clone());
		self.save()?;

		Ok(record)
	}

	pub fn get(&self, id: u64) -> Option<&Record> {
		self.catalogue.records.iter().find(|r| r.id == id)
	}

	pub fn update(&mut self, id: u64, field: Field, value: &str) -> Result<(), SteelError> {
		let record = self
			.catalogue
			.records
			.iter_mut()
			.find(|r| r.id == id)
			.ok_or_else(|| SteelError::InvalidArgument(format!("no record with id {}", id)))?;

		match field {
			Field::Title => record.title = value.to_owned(),
			Field::User => record.user = value.to_owned(),
			Field::Passphrase => record.passphrase = value.to_owned(),
			Field::Url => record.url = value.to_owned(),
			Field::Notes => record.notes = value.to_owned(),
		}

		self.save()
	}

	pub fn delete(&mut self, id: u64) -> Result<(), SteelError> {
		let before = self.catalogue.records.len();
		self.catalogue.records.retain(|r| r.id != id);

		if self.catalogue.records.len() == before {
			return Err(SteelError::InvalidArgument(format!("no record with id {}", id)));
		}

		self.save()
	}

	pub fn list(&self) -> &[Record] {
		&self.catalogue.records
	}

	/// Case-insensitive substring search over title, user, url and notes.
	/// Passphrases are never searched.
	pub fn find(&self, needle: &str) -> Vec<&Record> {
		let needle = needle.to_lowercase();

		self.catalogue
			.records
			.iter()
			.filter(|r| {
				[&r.title, &r.user, &r.url, &r.notes]
					.iter()
					.any(|f| f.to_lowercase().contains(&needle))
			})
			.collect()
	}

	fn save(&self) -> Result<(), SteelError> {
		let mut payload = serde_json::to_vec(&self.catalogue)?;
		let result = fsutil::atomic_write(&self.path, &payload);
		payload.zeroize();
		result
	}
}
