// Byte-array newtypes for key material and container fields, pared down
// from the sodiumoxide-derived macros.
//
// `secret` newtypes wipe themselves on drop and never print their
// contents; `public` newtypes are plain fixed-width byte fields.
// Equality is constant-time for both so tag and verifier comparisons
// can't leak through timing.

macro_rules! newtype_traits (($newtype:ident, $len:expr) => (
	impl ::subtle::ConstantTimeEq for $newtype {
		fn ct_eq(&self, other: &Self) -> ::subtle::Choice {
			let &$newtype(ref v) = self;
			let &$newtype(ref o) = other;
			v.ct_eq(o)
		}
	}

	impl ::std::cmp::PartialEq for $newtype {
		fn eq(&self, other: &Self) -> bool {
			use ::subtle::ConstantTimeEq;

			self.ct_eq(other).into()
		}
	}

	impl ::std::cmp::Eq for $newtype {}

	/// Allows access to the byte contents as a slice.
	///
	/// WARNING: do not compare objects with `x[..] == y[..]`; that opens
	/// up timing attacks. Use the newtype's own equality.
	impl ::std::ops::Index<::std::ops::RangeFull> for $newtype {
		type Output = [u8];
		fn index(&self, _index: ::std::ops::RangeFull) -> &[u8] {
			let &$newtype(ref b) = self;
			b.index(_index)
		}
	}

	impl $newtype {
		/// `from_slice()` creates an object from a byte slice.
		///
		/// Returns `None` if the length of the slice doesn't match.
		pub fn from_slice(bs: &[u8]) -> Option<$newtype> {
			if bs.len() != $len {
				return None;
			}
			let mut n = $newtype([0u8; $len]);
			n.0.copy_from_slice(bs);
			Some(n)
		}

		pub fn from_rng<R: ::rand::RngCore + ?Sized>(rng: &mut R) -> $newtype {
			let mut n = $newtype([0u8; $len]);
			rng.fill_bytes(&mut n.0);
			n
		}
	}
));

/// Macro used for generating newtypes of byte-arrays
macro_rules! new_type {
	( $(#[$meta:meta])*
	  secret $name:ident($bytes:expr);
	  ) => (
		$(#[$meta])*
		#[must_use]
		pub struct $name(pub [u8; $bytes]);

		impl Clone for $name {
			fn clone(&self) -> $name {
				$name(self.0)
			}
		}

		impl Drop for $name {
			fn drop(&mut self) {
				use ::zeroize::Zeroize;

				self.0.zeroize();
			}
		}

		impl ::std::fmt::Debug for $name {
			fn fmt(&self, formatter: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
				write!(formatter, concat!(stringify!($name), "(<secret>)"))
			}
		}

		newtype_traits!($name, $bytes);
	);
	( $(#[$meta:meta])*
	  public $name:ident($bytes:expr);
	  ) => (
		$(#[$meta])*
		#[derive(Copy)]
		#[must_use]
		pub struct $name(pub [u8; $bytes]);

		impl Clone for $name {
			fn clone(&self) -> $name {
				*self
			}
		}

		impl AsRef<[u8]> for $name {
			#[inline]
			fn as_ref(&self) -> &[u8] {
				&self[..]
			}
		}

		impl ::std::fmt::Debug for $name {
			fn fmt(&self, formatter: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
				write!(formatter, "{}({:?})", stringify!($name), &self[..])
			}
		}

		newtype_traits!($name, $bytes);
	);
}
