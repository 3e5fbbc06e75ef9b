//! Fixed-width conversation tokens.
//!
//! A [`StateKey`] is the 16-byte value exchanged with the client. Minted keys
//! carry a little structure:
//!
//! | byte   | contents                                           |
//! |--------|----------------------------------------------------|
//! | 0      | round counter                                      |
//! | 1      | round counter XOR previous round counter           |
//! | 2      | random (`r0`)                                      |
//! | 3      | configured server id                               |
//! | 4..8   | random, XORed with the virtual server hash         |
//! | 8      | `r0` XOR version major                             |
//! | 10     | `r0` XOR version minor                             |
//! | 12     | `r0` XOR version patch                             |
//! | others | random                                             |
//!
//! None of this is secret. The version bytes are a fingerprint, and the
//! server hash only namespaces keys between virtual servers that share one
//! store.

use std::fmt;

use rand::RngCore;

/// Width of a token in bytes.
pub const KEY_LEN: usize = 16;

const SERVER_HASH_RANGE: std::ops::Range<usize> = 4..8;

const FNV_INIT: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const fn parse_u8(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if !digit.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add(digit - b'0');
        i += 1;
    }
    value
}

/// Major, minor and patch version of this crate, folded into minted keys.
pub const VERSION_FINGERPRINT: [u8; 3] = [
    parse_u8(env!("CARGO_PKG_VERSION_MAJOR")),
    parse_u8(env!("CARGO_PKG_VERSION_MINOR")),
    parse_u8(env!("CARGO_PKG_VERSION_PATCH")),
];

/// Hash of a virtual server's name, used to scope keys to that server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerHash(u32);

impl ServerHash {
    /// Hash a virtual server name (32-bit FNV-1).
    pub fn of(name: &str) -> Self {
        let hash = name
            .bytes()
            .fold(FNV_INIT, |hash, b| hash.wrapping_mul(FNV_PRIME) ^ u32::from(b));
        Self(hash)
    }

    /// Wrap a precomputed hash value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw hash value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// A 16-byte conversation token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey([u8; KEY_LEN]);

impl StateKey {
    /// Wrap raw key bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Fold an arbitrary-length attribute value into a key.
    ///
    /// Exactly 16 bytes are used verbatim. Longer values are reduced to
    /// their MD5 digest so the key depends on the whole value. Shorter
    /// values are zero-padded.
    ///
    /// Malformed values are accepted rather than rejected. This is a
    /// leniency for misbehaving clients, not a security boundary.
    pub fn fold(value: &[u8]) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        if value.len() > KEY_LEN {
            bytes = md5::compute(value).0;
        } else {
            bytes[..value.len()].copy_from_slice(value);
        }
        Self(bytes)
    }

    /// Fill all 16 bytes from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Embedded round counter.
    pub fn round(&self) -> u8 {
        self.0[0]
    }

    /// Bits changed in the round counter since the previous round.
    pub fn round_delta(&self) -> u8 {
        self.0[1]
    }

    /// Embedded server id tag.
    pub fn server_id(&self) -> u8 {
        self.0[3]
    }

    /// Version fingerprint recovered from the key, if it was minted here.
    pub fn version(&self) -> [u8; 3] {
        let r0 = self.0[2];
        [self.0[8] ^ r0, self.0[10] ^ r0, self.0[12] ^ r0]
    }

    /// XOR the server hash field with `hash`.
    ///
    /// Applying the same hash twice gives back the original key.
    pub fn scoped(mut self, hash: ServerHash) -> Self {
        for (byte, h) in self.0[SERVER_HASH_RANGE]
            .iter_mut()
            .zip(hash.as_u32().to_le_bytes())
        {
            *byte ^= h;
        }
        self
    }

    /// Write the round counters, version fingerprint and server id.
    ///
    /// `tries` is the number of earlier rounds in this conversation.
    pub(crate) fn stamp(&mut self, tries: u32, server_id: u8) {
        let previous = tries as u8;
        let round = previous.wrapping_add(1);
        self.0[0] = round;
        self.0[1] = round ^ previous;

        let r0 = self.0[2];
        let [major, minor, patch] = VERSION_FINGERPRINT;
        self.0[8] = r0 ^ major;
        self.0[10] = r0 ^ minor;
        self.0[12] = r0 ^ patch;

        self.0[3] = server_id;
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({})", self)
    }
}

impl From<[u8; KEY_LEN]> for StateKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}
