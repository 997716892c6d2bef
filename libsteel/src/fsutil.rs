//! The small filesystem layer everything else goes through: existence
//! checks, atomic replacement, plain copies and secure erase.

use crate::SteelError;
use rand::{rngs::OsRng, RngCore};
use std::{
	env,
	fs::{self, File, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
};
use tempfile::NamedTempFile;


pub fn exists(path: &Path) -> bool {
	path.exists()
}

/// Normalize a user-supplied path to an absolute one. The file does not
/// have to exist yet.
pub fn absolute(path: &Path) -> Result<PathBuf, SteelError> {
	if path.is_absolute() {
		Ok(path.to_owned())
	} else {
		Ok(env::current_dir()?.join(path))
	}
}

/// The user's home directory. The session lock and the tracking registry
/// live here; not having one is a fatal configuration error.
pub fn home_dir() -> Result<PathBuf, SteelError> {
	directories::BaseDirs::new()
		.map(|dirs| dirs.home_dir().to_owned())
		.ok_or(SteelError::NoHomeDirectory)
}

/// Replace the contents of `path` in one atomic step: write a sibling temp
/// file and rename it over the target.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), SteelError> {
	let parent = path
		.parent()
		.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "bad path"))?;
	let mut temp = NamedTempFile::new_in(parent)?;
	temp.write_all(bytes)?;
	temp.into_temp_path().persist(path).map_err(|e| SteelError::Io(e.error))?;
	Ok(())
}

/// Byte-for-byte copy. Refuses to overwrite the destination.
pub fn copy_file(source: &Path, dest: &Path) -> Result<(), SteelError> {
	if !exists(source) {
		return Err(SteelError::NotFound(source.to_owned()));
	}
	if exists(dest) {
		return Err(SteelError::AlreadyExists(dest.to_owned()));
	}

	let mut reader = File::open(source)?;
	let mut writer = File::create(dest)?;
	io::copy(&mut reader, &mut writer)?;
	writer.sync_all()?;
	Ok(())
}

/// Overwrite the file with random bytes, flush, then remove it. Best effort
/// on journaling filesystems, same as any userspace shred.
pub fn secure_erase(path: &Path) -> Result<(), SteelError> {
	let len = match fs::metadata(path) {
		Ok(meta) => meta.len() as usize,
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			return Err(SteelError::NotFound(path.to_owned()))
		}
		Err(e) => return Err(SteelError::Io(e)),
	};

	let mut file = OpenOptions::new().write(true).open(path)?;
	let mut remaining = len;
	let mut block = [0u8; 8192];
	while remaining > 0 {
		let n = remaining.min(block.len());
		OsRng.fill_bytes(&mut block[..n]);
		file.write_all(&block[..n])?;
		remaining -= n;
	}
	file.sync_all()?;
	drop(file);

	fs::remove_file(path)?;
	Ok(())
}


#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn atomic_write_replaces_contents() {
		let tmp_dir = tempdir().unwrap();
		let path = tmp_dir.path().join("file");

		atomic_write(&path, b"first").unwrap();
		assert_eq!(fs::read(&path).unwrap(), b"first");

		atomic_write(&path, b"second").unwrap();
		assert_eq!(fs::read(&path).unwrap(), b"second");
	}

	#[test]
	fn copy_refuses_overwrite() {
		let tmp_dir = tempdir().unwrap();
		let a = tmp_dir.path().join("a");
		let b = tmp_dir.path().join("b");
		fs::write(&a, b"data").unwrap();

		copy_file(&a, &b).unwrap();
		assert_eq!(fs::read(&b).unwrap(), b"data");

		assert!(matches!(copy_file(&a, &b), Err(SteelError::AlreadyExists(_))));
		assert!(matches!(
			copy_file(&tmp_dir.path().join("missing"), &tmp_dir.path().join("c")),
			Err(SteelError::NotFound(_))
		));
	}

	#[test]
	fn secure_erase_removes_the_file() {
		let tmp_dir = tempdir().unwrap();
		let path = tmp_dir.path().join("shred-me");
		fs::write(&path, vec![0xAAu8; 20_000]).unwrap();

		secure_erase(&path).unwrap();
		assert!(!path.exists());

		assert!(matches!(secure_erase(&path), Err(SteelError::NotFound(_))));
	}
}
