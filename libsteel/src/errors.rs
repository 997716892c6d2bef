use std::path::{Path, PathBuf};
use steelcrypto::CryptoError;


#[derive(Debug)]
pub enum SteelError {
	/// A file that was expected to exist does not.
	NotFound(PathBuf),
	/// A file that was expected not to exist does.
	AlreadyExists(PathBuf),
	/// Another database is already open.
	AlreadyOpen(PathBuf),
	/// The operation needs the database in decrypted form.
	DatabaseEncrypted(PathBuf),
	/// No session lock is set.
	DatabaseNotOpen,
	/// The file carries no container magic.
	NotEncrypted(PathBuf),
	/// The password verifier rejected the passphrase.
	BadPassphrase,
	/// The container's authentication tag did not match.
	Tampered,
	/// IO error.
	Io(std::io::Error),
	/// Cipher, KDF or RNG failure.
	Crypto(CryptoError),
	/// Catalogue serialization error.
	Serialization(serde_json::Error),
	/// Bad caller input (password too short, unknown field, unknown id).
	InvalidArgument(String),
	/// The home directory could not be determined.
	NoHomeDirectory,
}

impl SteelError {
	/// Lift a crypto failure into the API taxonomy, attaching the path the
	/// container operation ran against.
	pub(crate) fn from_crypto(e: CryptoError, path: &Path) -> SteelError {
		match e {
			CryptoError::BadPassphrase => SteelError::BadPassphrase,
			CryptoError::Tampered => SteelError::Tampered,
			CryptoError::NotEncrypted => SteelError::NotEncrypted(path.to_owned()),
			CryptoError::AlreadyEncrypted => SteelError::DatabaseEncrypted(path.to_owned()),
			CryptoError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => SteelError::NotFound(path.to_owned()),
			CryptoError::Io(e) => SteelError::Io(e),
			other => SteelError::Crypto(other),
		}
	}
}

impl From<std::io::Error> for SteelError {
	fn from(e: std::io::Error) -> SteelError {
		SteelError::Io(e)
	}
}

impl From<serde_json::Error> for SteelError {
	fn from(e: serde_json::Error) -> SteelError {
		SteelError::Serialization(e)
	}
}

impl std::error::Error for SteelError {}

impl std::fmt::Display for SteelError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			SteelError::NotFound(p) => write!(f, "{} does not exist", p.display()),
			SteelError::AlreadyExists(p) => write!(f, "{} already exists", p.display()),
			SteelError::AlreadyOpen(p) => write!(f, "Another database is already open: {}", p.display()),
			SteelError::DatabaseEncrypted(p) => write!(f, "Database {} is encrypted", p.display()),
			SteelError::DatabaseNotOpen => write!(f, "No database is open"),
			SteelError::NotEncrypted(p) => write!(f, "{} is not an encrypted database", p.display()),
			SteelError::BadPassphrase => write!(f, "Invalid passphrase"),
			SteelError::Tampered => write!(f, "Data was tampered with; aborting"),
			SteelError::Io(e) => write!(f, "IO error: {}", e),
			SteelError::Crypto(e) => write!(f, "Cryptography error: {}", e),
			SteelError::Serialization(e) => write!(f, "Serialization error: {}", e),
			SteelError::InvalidArgument(msg) => write!(f, "{}", msg),
			SteelError::NoHomeDirectory => write!(f, "Failed to determine the home directory"),
		}
	}
}
