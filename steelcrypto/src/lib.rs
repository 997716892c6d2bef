//! The steel container format.
//!
//! A container is a single file holding an encrypted database:
//!
//! | offset | length | field |
//! |--------|--------|-------|
//! | 0 | 64 | password verifier (bcrypt hash string, zero padded) |
//! | 64 | 4 | magic marker, little-endian |
//! | 68 | 32 | IV, fresh on every write |
//! | 100 | 64 | salt blob (the same salt material the verifier was made from) |
//! | 164 | n | ciphertext, same length as the plaintext |
//! | 164+n | 32 | HMAC-SHA-256 over everything before it |
//!
//! Encrypt-then-MAC, single key: the cipher key derived from the
//! passphrase and salt also keys the tag, which is sound here because the
//! MAC covers ciphertext and the IV is unique per write. Decryption
//! checks the passphrase first, the tag second, and writes no plaintext
//! until both pass.

#[macro_use]
mod newtype;
mod cipher;
mod error;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use cipher::FileCipher;
pub use error::CryptoError;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::{
	fs::File,
	io::{self, Read, Seek, SeekFrom, Write},
	path::Path,
};
use subtle::ConstantTimeEq;
use tempfile::NamedTempFile;
use zeroize::Zeroize;


/// Width of the password verifier field.
pub const VERIFIER_LEN: usize = 64;
/// Width of the self-describing salt blob shared by verifier and KDF.
pub const SALT_LEN: usize = 64;
pub const IV_LEN: usize = 32;
pub const KEY_LEN: usize = 32;
pub const MAC_LEN: usize = 32;

/// Marker identifying a file as a steel container.
/// Stored little-endian right after the verifier.
pub const MAGIC: u32 = 0x3349_7545;

const MAGIC_OFFSET: usize = VERIFIER_LEN;
const IV_OFFSET: usize = MAGIC_OFFSET + 4;
const SALT_OFFSET: usize = IV_OFFSET + IV_LEN;
const HEADER_LEN: usize = SALT_OFFSET + SALT_LEN;
const MIN_CONTAINER_LEN: usize = HEADER_LEN + MAC_LEN;

// bcrypt cost factor (2^cost rounds).
// NOTE: In debug mode we use the cheapest allowed cost since debug builds are
// only for testing and run very slow.
#[cfg(debug_assertions)]
const PWHASH_COST: u32 = 4;
#[cfg(not(debug_assertions))]
const PWHASH_COST: u32 = 12;

const BCRYPT_RAW_SALT_LEN: usize = 16;


new_type!(secret Key(32););
new_type!(public MacTag(32););
new_type!(public Iv(32););
new_type!(public Verifier(64););
new_type!(public SaltBlob(64););


impl Verifier {
	fn from_hash_string(hash: &str) -> Option<Verifier> {
		let bytes = hash.as_bytes();

		if bytes.len() > VERIFIER_LEN {
			return None;
		}

		let mut v = [0u8; VERIFIER_LEN];
		v[..bytes.len()].copy_from_slice(bytes);
		Some(Verifier(v))
	}

	/// The bcrypt hash string held in this field, without the zero padding.
	fn hash_str(&self) -> Result<&str, CryptoError> {
		let end = self.0.iter().position(|&b| b == 0).unwrap_or(VERIFIER_LEN);
		std::str::from_utf8(&self.0[..end]).map_err(|_| CryptoError::MalformedVerifier)
	}
}

impl SaltBlob {
	// Layout: cost as u32 little-endian, 16 raw salt bytes, zero padding.
	fn generate<R: RngCore + ?Sized>(rng: &mut R) -> SaltBlob {
		let mut raw = [0u8; BCRYPT_RAW_SALT_LEN];
		rng.fill_bytes(&mut raw);

		let mut blob = [0u8; SALT_LEN];
		LittleEndian::write_u32(&mut blob[..4], PWHASH_COST);
		blob[4..4 + BCRYPT_RAW_SALT_LEN].copy_from_slice(&raw);
		SaltBlob(blob)
	}

	fn unpack(&self) -> Result<(u32, [u8; BCRYPT_RAW_SALT_LEN]), CryptoError> {
		let cost = LittleEndian::read_u32(&self.0[..4]);

		// bcrypt's allowed cost range
		if !(4..=31).contains(&cost) {
			return Err(CryptoError::MalformedSalt);
		}

		let mut raw = [0u8; BCRYPT_RAW_SALT_LEN];
		raw.copy_from_slice(&self.0[4..4 + BCRYPT_RAW_SALT_LEN]);
		Ok((cost, raw))
	}
}


/// Hash a passphrase into a fresh self-contained verifier, returning the
/// salt blob it was produced from so key derivation can share it.
pub fn hash_passphrase(passphrase: &str) -> Result<(Verifier, SaltBlob), CryptoError> {
	let salt = SaltBlob::generate(&mut OsRng);
	let (cost, raw) = salt.unpack().expect("internal error");

	let mut hash = bcrypt::hash_with_salt(passphrase, cost, raw)?.format_for_version(bcrypt::Version::TwoB);
	let verifier = Verifier::from_hash_string(&hash).ok_or(CryptoError::MalformedVerifier)?;
	hash.zeroize();

	Ok((verifier, salt))
}

/// Check a passphrase against a stored verifier.
///
/// Runtime depends only on the cost factor and input length; the digest
/// comparison inside bcrypt is constant-time.
pub fn verify_passphrase(passphrase: &str, verifier: &Verifier) -> Result<bool, CryptoError> {
	Ok(bcrypt::verify(passphrase, verifier.hash_str()?)?)
}

/// Derive the symmetric key for a container from its passphrase and stored
/// salt blob. Deterministic; recomputing the bcrypt digest is the slow step,
/// so the key inherits the verifier's work factor.
pub fn derive_key(passphrase: &str, salt: &SaltBlob) -> Result<Key, CryptoError> {
	let (cost, raw) = salt.unpack()?;
	let mut digest = bcrypt::hash_with_salt(passphrase, cost, raw)?.format_for_version(bcrypt::Version::TwoB);

	// Extract-and-expand, keyed by the whole blob so the key diverges if
	// either stored salt copy does.
	let mut prk: [u8; KEY_LEN] = hmac_256(&salt[..], digest.as_bytes()).into();
	let key = Key(hmac_256(&prk, &[0x01]).into());

	digest.zeroize();
	prk.zeroize();

	Ok(key)
}

/// Keyed MAC over a byte range.
pub fn compute_mac(key: &Key, data: &[u8]) -> MacTag {
	MacTag(hmac_256(&key[..], data).into())
}

/// Constant-time tag comparison.
pub fn verify_mac(a: &MacTag, b: &MacTag) -> bool {
	a.ct_eq(b).into()
}

fn hmac_256(key: &[u8], data: &[u8]) -> hmac::digest::Output<Hmac<Sha256>> {
	let mut hmac = Hmac::<Sha256>::new_from_slice(key).expect("unexpected");
	hmac.update(data);
	hmac.finalize().into_bytes()
}


/// Reads the magic marker and reports whether the file is a steel container.
pub fn is_file_encrypted(path: &Path) -> Result<bool, CryptoError> {
	let mut file = File::open(path)?;

	if file.metadata()?.len() < (MAGIC_OFFSET + 4) as u64 {
		return Ok(false);
	}

	file.seek(SeekFrom::Start(MAGIC_OFFSET as u64))?;
	Ok(file.read_u32::<LittleEndian>()? == MAGIC)
}

/// Encrypt the plaintext file at `path` in place.
///
/// The container is staged in a sibling temp file and renamed over the
/// target, so a crash leaves either the old plaintext or the finished
/// container, never a half-written file.
pub fn encrypt_file(path: &Path, passphrase: &str) -> Result<(), CryptoError> {
	if is_file_encrypted(path)? {
		return Err(CryptoError::AlreadyEncrypted);
	}

	let (verifier, salt) = hash_passphrase(passphrase)?;
	let key = derive_key(passphrase, &salt)?;
	let iv = Iv::from_rng(&mut OsRng);

	let mut reader = File::open(path)?;
	let parent = path
		.parent()
		.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "bad path"))?;
	let mut temp = NamedTempFile::new_in(parent)?;

	let mut mac = Hmac::<Sha256>::new_from_slice(&key[..]).expect("unexpected");

	let mut header = Vec::with_capacity(HEADER_LEN);
	header.extend_from_slice(&verifier[..]);
	header.extend_from_slice(&MAGIC.to_le_bytes());
	header.extend_from_slice(&iv[..]);
	header.extend_from_slice(&salt[..]);

	temp.write_all(&header)?;
	mac.update(&header);

	let mut cipher = FileCipher::new(&key, &iv);
	let mut buffer = [0u8; 8192];
	loop {
		let n = reader.read(&mut buffer)?;
		if n == 0 {
			break;
		}
		cipher.apply(&mut buffer[..n]);
		temp.write_all(&buffer[..n])?;
		mac.update(&buffer[..n]);
	}
	buffer.zeroize();

	let tag = MacTag(mac.finalize().into_bytes().into());
	temp.write_all(&tag[..])?;

	// Moving the temp file over the target is atomic, which makes the
	// rename the point where the plaintext stops existing.
	let temp_path = temp.into_temp_path();
	temp_path.persist(path).map_err(|e| CryptoError::from(e.error))?;

	Ok(())
}

/// Verify and decrypt the container at `path` in place.
///
/// Ordering is fixed: passphrase check, then tag check, and only then is
/// any plaintext written. Every failure leaves the container untouched and
/// no plaintext on disk.
pub fn decrypt_file(path: &Path, passphrase: &str) -> Result<(), CryptoError> {
	let mut filedata = Vec::new();
	File::open(path)?.read_to_end(&mut filedata)?;

	if filedata.len() < MAGIC_OFFSET + 4
		|| LittleEndian::read_u32(&filedata[MAGIC_OFFSET..MAGIC_OFFSET + 4]) != MAGIC
	{
		return Err(CryptoError::NotEncrypted);
	}

	if filedata.len() < MIN_CONTAINER_LEN {
		return Err(CryptoError::TruncatedData);
	}

	let verifier = Verifier::from_slice(&filedata[..VERIFIER_LEN]).expect("internal error");
	if !verify_passphrase(passphrase, &verifier)? {
		return Err(CryptoError::BadPassphrase);
	}

	let salt = SaltBlob::from_slice(&filedata[SALT_OFFSET..SALT_OFFSET + SALT_LEN]).expect("internal error");
	let key = derive_key(passphrase, &salt)?;

	let (body, tag) = filedata.split_at(filedata.len() - MAC_LEN);
	let tag = MacTag::from_slice(tag).expect("internal error");
	if !verify_mac(&compute_mac(&key, body), &tag) {
		return Err(CryptoError::Tampered);
	}

	let iv = Iv::from_slice(&filedata[IV_OFFSET..IV_OFFSET + IV_LEN]).expect("internal error");

	let parent = path
		.parent()
		.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "bad path"))?;
	let mut temp = NamedTempFile::new_in(parent)?;
	let mut cipher = FileCipher::new(&key, &iv);

	// An IO failure from here on drops the temp file, removing the partial
	// plaintext and leaving the container as it was.
	let mut buffer = [0u8; 8192];
	for chunk in body[HEADER_LEN..].chunks(buffer.len()) {
		let out = &mut buffer[..chunk.len()];
		out.copy_from_slice(chunk);
		cipher.apply(out);
		temp.write_all(out)?;
	}
	buffer.zeroize();

	let temp_path = temp.into_temp_path();
	temp_path.persist(path).map_err(|e| CryptoError::from(e.error))?;

	Ok(())
}
