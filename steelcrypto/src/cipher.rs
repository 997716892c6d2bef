use chacha20::{
	cipher::{KeyIvInit, StreamCipher},
	ChaCha20,
};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroize;

use crate::{Iv, Key};


/// Keystream cipher over the container payload.
///
/// The on-disk format carries a 32 byte IV, wider than any ChaCha20 nonce,
/// so the working key and nonce are derived per file with
/// HMAC-SHA-512 (key, iv) and split. Ciphertext length always equals
/// plaintext length, and the stream may be applied in chunks of any size
/// with byte-identical output.
pub(crate) struct FileCipher {
	inner: ChaCha20,
}

impl FileCipher {
	pub(crate) fn new(key: &Key, iv: &Iv) -> FileCipher {
		let mut big_key = {
			let mut hmac = Hmac::<Sha512>::new_from_slice(&key[..]).expect("unexpected");
			hmac.update(&iv[..]);
			hmac.finalize().into_bytes()
		};

		let inner = {
			let (cipher_key, cipher_nonce) = big_key.split_at(32);

			// Using slice notation here so this code panics in case we accidentally didn't derive the right size big_key
			ChaCha20::new_from_slices(&cipher_key[..32], &cipher_nonce[..12]).expect("unexpected")
		};

		big_key.as_mut_slice().zeroize();

		FileCipher { inner }
	}

	/// Encrypts or decrypts the next chunk of the stream in place.
	pub(crate) fn apply(&mut self, data: &mut [u8]) {
		self.inner.apply_keystream(data);
	}
}
