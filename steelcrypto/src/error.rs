use std::error::Error;

#[derive(Debug)]
pub enum CryptoError {
	/// Decrypt was called on a file without the container magic.
	NotEncrypted,
	/// Encrypt was called on a file that is already a container.
	AlreadyEncrypted,
	/// The password verifier rejected the passphrase.
	BadPassphrase,
	/// The authentication tag did not match.
	Tampered,
	/// The file is too short to hold a container.
	TruncatedData,
	/// The stored verifier is not a valid hash string.
	MalformedVerifier,
	/// The stored salt blob could not be parsed.
	MalformedSalt,
	/// Password hashing failure.
	PasswordHash(bcrypt::BcryptError),
	/// IO error.
	Io(std::io::Error),
}

impl From<std::io::Error> for CryptoError {
	fn from(e: std::io::Error) -> Self {
		CryptoError::Io(e)
	}
}

impl From<bcrypt::BcryptError> for CryptoError {
	fn from(e: bcrypt::BcryptError) -> Self {
		CryptoError::PasswordHash(e)
	}
}

impl Error for CryptoError {}

impl std::fmt::Display for CryptoError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			CryptoError::NotEncrypted => write!(f, "File is not a steel container"),
			CryptoError::AlreadyEncrypted => write!(f, "File is already encrypted"),
			CryptoError::BadPassphrase => write!(f, "Invalid passphrase"),
			CryptoError::Tampered => write!(f, "Data was tampered with"),
			CryptoError::TruncatedData => write!(f, "Truncated data"),
			CryptoError::MalformedVerifier => write!(f, "Malformed password verifier"),
			CryptoError::MalformedSalt => write!(f, "Malformed salt blob"),
			CryptoError::PasswordHash(e) => write!(f, "Password hashing error: {}", e),
			CryptoError::Io(e) => write!(f, "IO error: {}", e),
		}
	}
}
