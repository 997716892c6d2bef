//! The tracking registry: a newline-delimited list of every database path
//! this user has created or opened. Purely informational; no security
//! decision ever reads it.

use crate::SteelError;
use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
};


pub struct Registry {
	path: PathBuf,
}

impl Registry {
	pub fn new(path: PathBuf) -> Registry {
		Registry { path }
	}

	/// All tracked paths. A missing registry reads as empty.
	pub fn list(&self) -> Result<Vec<PathBuf>, SteelError> {
		match fs::read_to_string(&self.path) {
			Ok(content) => Ok(content
				.lines()
				.filter(|line| !line.trim().is_empty())
				.map(PathBuf::from)
				.collect()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
			Err(e) => Err(SteelError::Io(e)),
		}
	}

	/// Track `db`. Idempotent.
	pub fn add(&self, db: &Path) -> Result<(), SteelError> {
		let mut paths = self.list()?;

		if paths.iter().any(|p| p == db) {
			return Ok(());
		}

		paths.push(db.to_owned());
		self.rewrite(&paths)
	}

	/// Stop tracking `db`, dropping every matching line.
	pub fn remove(&self, db: &Path) -> Result<(), SteelError> {
		let paths: Vec<PathBuf> = self.list()?.into_iter().filter(|p| p != db).collect();
		self.rewrite(&paths)
	}

	// Mutations go through the `.tmp` sibling and a rename, so a crash can
	// never truncate the registry in place.
	fn rewrite(&self, paths: &[PathBuf]) -> Result<(), SteelError> {
		let mut tmp_path = self.path.clone().into_os_string();
		tmp_path.push(".tmp");
		let tmp_path = PathBuf::from(tmp_path);

		let mut tmp = fs::File::create(&tmp_path)?;
		for path in paths {
			writeln!(tmp, "{}", path.display())?;
		}
		tmp.sync_all()?;
		drop(tmp);

		fs::rename(&tmp_path, &self.path)?;
		Ok(())
	}
}
