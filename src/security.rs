//! L6: the Standard Security Handler (§4.10) — RC4-based encryption, 40-bit
//! (V1/R2) and 128-bit (V2/R3), with per-object key derivation and the
//! owner/user password computation. AES (V4/V5) is out of scope (spec
//! Non-goal).
//!
//! RC4 is hand-rolled (the spec permits only an MD5 primitive as a
//! supplied building block); MD5 comes from the `md-5` crate.

use md5::{Digest, Md5};

use crate::error::{Error, SecurityError};

/// The fixed 32-byte password padding constant from the PDF specification.
pub const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Bits 3-6 (print, modify, copy, annotate), 9-12 (fill-forms, extract,
/// assemble, print-high-quality) of `/P`, per ISO 32000-1 table 22. Bits
/// 1-2 and 7-8 must be 1; high bits 13-32 must be 1 (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub print: bool,
    pub modify: bool,
    pub copy: bool,
    pub annotate: bool,
    pub fill_forms: bool,
    pub extract: bool,
    pub assemble: bool,
    pub print_high_quality: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
            fill_forms: true,
            extract: true,
            assemble: true,
            print_high_quality: true,
        }
    }
}

impl Permissions {
    /// Encodes these flags into the `/P` 32-bit signed integer, with the
    /// mandatory reserved bits set per ISO 32000-1.
    pub fn encode(self) -> i32 {
        let mut p: u32 = 0xFFFF_F000; // bits 13-32 set, bits 3-12 cleared below as needed
        p |= 0b11; // bits 1-2 always 1
        p |= 0b1100_0000; // bits 7-8 always 1
        if self.print {
            p |= 1 << 2;
        }
        if self.modify {
            p |= 1 << 3;
        }
        if self.copy {
            p |= 1 << 4;
        }
        if self.annotate {
            p |= 1 << 5;
        }
        if self.fill_forms {
            p |= 1 << 8;
        }
        if self.extract {
            p |= 1 << 9;
        }
        if self.assemble {
            p |= 1 << 10;
        }
        if self.print_high_quality {
            p |= 1 << 11;
        }
        p as i32
    }

    pub fn decode(p: i32) -> Self {
        let p = p as u32;
        Permissions {
            print: p & (1 << 2) != 0,
            modify: p & (1 << 3) != 0,
            copy: p & (1 << 4) != 0,
            annotate: p & (1 << 5) != 0,
            fill_forms: p & (1 << 8) != 0,
            extract: p & (1 << 9) != 0,
            assemble: p & (1 << 10) != 0,
            print_high_quality: p & (1 << 11) != 0,
        }
    }
}

/// Which revision of the Standard Security Handler to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLength {
    Bits40,
    Bits128,
}

impl KeyLength {
    /// The `/V` value this revision writes.
    pub fn v(self) -> i64 {
        match self {
            KeyLength::Bits40 => 1,
            KeyLength::Bits128 => 2,
        }
    }
    /// The `/R` value this revision writes.
    pub fn r(self) -> i64 {
        match self {
            KeyLength::Bits40 => 2,
            KeyLength::Bits128 => 3,
        }
    }
    fn n_bytes(self) -> usize {
        match self {
            KeyLength::Bits40 => 5,
            KeyLength::Bits128 => 16,
        }
    }
}

/// User-supplied encryption parameters (§6.3 `set_encryption`).
#[derive(Debug, Clone)]
pub struct EncryptionOptions {
    pub user_password: String,
    pub owner_password: String,
    pub key_length: KeyLength,
    pub permissions: Permissions,
}

/// The fully-derived Standard Security Handler state, computed once at
/// write time (or once per successful authentication at read time).
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    pub key_length: KeyLength,
    pub permissions_raw: i32,
    pub o: [u8; 32],
    pub u: [u8; 32],
    pub file_id: Vec<u8>,
    pub encryption_key: Vec<u8>,
}

fn pad_password(password: &str) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let bytes = password.as_bytes();
    let n = bytes.len().min(32);
    padded[..n].copy_from_slice(&bytes[..n]);
    padded[n..].copy_from_slice(&PASSWORD_PAD[..32 - n]);
    padded
}

fn md5(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RC4 key-scheduling + PRGA, applied to `data` with `key`.
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = [0; 256];
    for (i, slot) in s.iter_mut().enumerate() {
        *slot = i as u8;
    }
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0u8, 0u8);
    for &byte in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[(s[i as usize].wrapping_add(s[j as usize])) as usize];
        out.push(byte ^ k);
    }
    out
}

/// Computes the `/O` owner-password string (§4.10 step "Owner string O").
fn compute_owner_hash(owner_password: &str, user_password: &str, key_length: KeyLength) -> [u8; 32] {
    let owner_or_user = if owner_password.is_empty() { user_password } else { owner_password };
    let padded_owner = pad_password(owner_or_user);
    let mut digest = md5(&padded_owner);
    if key_length.r() >= 3 {
        for _ in 0..50 {
            digest = md5(&digest[..key_length.n_bytes()]);
        }
    }
    let key = &digest[..key_length.n_bytes()];

    let mut result = pad_password(user_password).to_vec();
    result = rc4(key, &result);
    if key_length.r() >= 3 {
        for i in 1..=19u8 {
            let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            result = rc4(&xored, &result);
        }
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Derives the document encryption key from the padded user password,
/// `/O`, `/P`, and the file ID (§4.10 "Encryption key derivation").
fn derive_encryption_key(
    user_password: &str,
    o: &[u8; 32],
    permissions: i32,
    file_id: &[u8],
    key_length: KeyLength,
) -> Vec<u8> {
    let mut input = pad_password(user_password).to_vec();
    input.extend_from_slice(o);
    input.extend_from_slice(&permissions.to_le_bytes());
    input.extend_from_slice(file_id);
    let mut digest = md5(&input);
    if key_length.r() >= 3 {
        for _ in 0..50 {
            digest = md5(&digest[..key_length.n_bytes()]);
        }
    }
    digest[..key_length.n_bytes()].to_vec()
}

/// Computes the `/U` user-password string (§4.10 "User string U").
fn compute_user_hash(encryption_key: &[u8], file_id: &[u8], key_length: KeyLength) -> [u8; 32] {
    if key_length.r() == 2 {
        let mut out = [0u8; 32];
        let encrypted = rc4(encryption_key, &PASSWORD_PAD);
        out[..encrypted.len()].copy_from_slice(&encrypted);
        out
    } else {
        let mut input = PASSWORD_PAD.to_vec();
        input.extend_from_slice(file_id);
        let mut result = rc4(encryption_key, &md5(&input));
        for i in 1..=19u8 {
            let xored: Vec<u8> = encryption_key.iter().map(|b| b ^ i).collect();
            result = rc4(&xored, &result);
        }
        let mut out = [0u8; 32];
        out[..result.len().min(32)].copy_from_slice(&result[..result.len().min(32)]);
        out
    }
}

impl SecurityHandler {
    /// Builds the handler at write time: computes `/O`, derives the
    /// encryption key, and computes `/U`.
    pub fn new(opts: &EncryptionOptions, file_id: Vec<u8>) -> Self {
        let permissions_raw = opts.permissions.encode();
        let o = compute_owner_hash(&opts.owner_password, &opts.user_password, opts.key_length);
        let encryption_key = derive_encryption_key(&opts.user_password, &o, permissions_raw, &file_id, opts.key_length);
        let u = compute_user_hash(&encryption_key, &file_id, opts.key_length);
        SecurityHandler { key_length: opts.key_length, permissions_raw, o, u, file_id, encryption_key }
    }

    /// Rebuilds the handler from a file's `/Encrypt` dictionary fields, to
    /// be used only after successful authentication.
    pub fn from_parts(
        v: i64,
        r: i64,
        o: [u8; 32],
        u: [u8; 32],
        permissions_raw: i32,
        file_id: Vec<u8>,
        encryption_key: Vec<u8>,
    ) -> Result<Self, Error> {
        let key_length = match (v, r) {
            (1, 2) => KeyLength::Bits40,
            (2, 3) => KeyLength::Bits128,
            _ => return Err(SecurityError::UnsupportedVersion(v, r).into()),
        };
        Ok(SecurityHandler { key_length, permissions_raw, o, u, file_id, encryption_key })
    }

    /// Tries to authenticate as the user. Compares the first 16 bytes of
    /// `/U` for R >= 3, all 32 bytes for R = 2. Returns the derived
    /// document encryption key on success.
    pub fn try_user_password(&self, password: &str) -> Option<Vec<u8>> {
        let key = derive_encryption_key(password, &self.o, self.permissions_raw, &self.file_id, self.key_length);
        let candidate_u = compute_user_hash(&key, &self.file_id, self.key_length);
        let n = if self.key_length.r() >= 3 { 16 } else { 32 };
        if candidate_u[..n] == self.u[..n] {
            Some(key)
        } else {
            None
        }
    }

    /// Tries to authenticate as the owner: reverses the `/O` computation
    /// to recover the user password, then retries user authentication
    /// (§4.10 "Authentication on read"). Returns the derived document
    /// encryption key on success.
    pub fn try_owner_password(&self, password: &str) -> Option<Vec<u8>> {
        let padded_owner = pad_password(password);
        let mut digest = md5(&padded_owner);
        if self.key_length.r() >= 3 {
            for _ in 0..50 {
                digest = md5(&digest[..self.key_length.n_bytes()]);
            }
        }
        let key = &digest[..self.key_length.n_bytes()];

        let mut result = self.o.to_vec();
        if self.key_length.r() >= 3 {
            for i in (1..=19u8).rev() {
                let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                result = rc4(&xored, &result);
            }
            result = rc4(key, &result);
        } else {
            result = rc4(key, &result);
        }
        let recovered_len = result.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0).max(1);
        let recovered_user_password = String::from_utf8_lossy(&result[..recovered_len.min(32)]);
        self.try_user_password(recovered_user_password.trim_end_matches(|c: char| c == '\u{0}'))
    }

    /// Bool-only convenience wrapper around [`Self::try_user_password`].
    pub fn authenticate_user(&self, password: &str) -> bool {
        self.try_user_password(password).is_some()
    }

    /// Bool-only convenience wrapper around [`Self::try_owner_password`].
    pub fn authenticate_owner(&self, password: &str) -> bool {
        self.try_owner_password(password).is_some()
    }

    /// Derives the per-object RC4 key for object `(num, gen)` (§4.10
    /// "Per-object key").
    pub fn object_key(&self, object_number: u32, generation: u16) -> Vec<u8> {
        let mut input = self.encryption_key.clone();
        input.extend_from_slice(&object_number.to_le_bytes()[..3]);
        input.extend_from_slice(&generation.to_le_bytes()[..2]);
        let digest = md5(&input);
        let n = (self.encryption_key.len() + 5).min(16);
        digest[..n].to_vec()
    }

    /// Encrypts (or, symmetrically, decrypts) a string/stream payload for
    /// object `(num, gen)`.
    pub fn crypt(&self, object_number: u32, generation: u16, data: &[u8]) -> Vec<u8> {
        rc4(&self.object_key(object_number, generation), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(user: &str, owner: &str) -> EncryptionOptions {
        EncryptionOptions {
            user_password: user.to_string(),
            owner_password: owner.to_string(),
            key_length: KeyLength::Bits40,
            permissions: Permissions::default(),
        }
    }

    #[test]
    fn user_password_authenticates() {
        let handler = SecurityHandler::new(&opts("user123", "owner123"), b"fileid".to_vec());
        assert!(handler.authenticate_user("user123"));
        assert!(!handler.authenticate_user(""));
    }

    #[test]
    fn owner_password_authenticates_and_recovers_user() {
        let handler = SecurityHandler::new(&opts("user123", "owner123"), b"fileid".to_vec());
        assert!(handler.authenticate_owner("owner123"));
        assert!(!handler.authenticate_owner("wrongpassword"));
    }

    #[test]
    fn object_key_is_deterministic() {
        let handler = SecurityHandler::new(&opts("a", "b"), b"fileid".to_vec());
        assert_eq!(handler.object_key(3, 0), handler.object_key(3, 0));
        assert_ne!(handler.object_key(3, 0), handler.object_key(4, 0));
    }

    #[test]
    fn rc4_is_involutive() {
        let key = b"secretkey";
        let plaintext = b"attack at dawn";
        let ciphertext = rc4(key, plaintext);
        assert_eq!(rc4(key, &ciphertext), plaintext);
    }

    #[test]
    fn permissions_roundtrip_through_encode_decode() {
        let mut perms = Permissions::default();
        perms.print = false;
        perms.assemble = false;
        let decoded = Permissions::decode(perms.encode());
        assert_eq!(decoded, perms);
    }

    #[test]
    fn bits_128_authenticates() {
        let o = EncryptionOptions { key_length: KeyLength::Bits128, ..opts("u", "o") };
        let handler = SecurityHandler::new(&o, b"another-file-id".to_vec());
        assert!(handler.authenticate_user("u"));
        assert!(handler.authenticate_owner("o"));
        assert!(!handler.authenticate_user("wrong"));
    }
}
