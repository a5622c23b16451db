#![forbid(unsafe_code)]

//! Key derivation and decryption for PKCS#12.
//!
//! Three paths:
//! 1. PKCS#12 KDF (RFC 7292 Appendix B) for the MAC key and legacy PBE
//! 2. Legacy PBE: pbeWithSHAAnd3-KeyTripleDES-CBC keyed by the PKCS#12 KDF
//! 3. PBES2: PBKDF2 + AES-256-CBC

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use firma_core::Error;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// PKCS#12 KDF ID values (RFC 7292 Appendix B.3).
pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// Hash family used by the KDF and by the integrity MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Sha1,
    Sha256,
}

impl HashKind {
    pub fn output_len(self) -> usize {
        match self {
            HashKind::Sha1 => 20,
            HashKind::Sha256 => 32,
        }
    }
}

/// PKCS#12 KDF (RFC 7292 Appendix B) with a 64-byte block size.
///
/// `password` is the BMP encoding from [`password_to_bmp`].
pub fn pkcs12_kdf(
    hash: HashKind,
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>> {
    match hash {
        HashKind::Sha1 => derive::<Sha1>(id, password, salt, iterations, output_len),
        HashKind::Sha256 => derive::<Sha256>(id, password, salt, iterations, output_len),
    }
}

fn derive<D>(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>>
where
    D: Digest + sha2::digest::FixedOutputReset,
{
    const V: usize = 64;
    let u = <D as Digest>::output_size();

    let d_block = [id; V];

    // I = S || P, each extended to a multiple of v
    let mut i_block = Zeroizing::new(repeat_to_multiple(salt, V));
    i_block.extend_from_slice(&repeat_to_multiple(password, V));

    let blocks = output_len.div_ceil(u);
    let mut out = Zeroizing::new(Vec::with_capacity(blocks * u));

    for block in 0..blocks {
        let mut hasher = D::new();
        Digest::update(&mut hasher, d_block);
        Digest::update(&mut hasher, i_block.as_slice());
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if block + 1 < blocks {
            let b = repeat_to_multiple(&a, V);
            for chunk in i_block.chunks_mut(V) {
                add_with_carry(chunk, &b);
            }
        }
    }

    out.truncate(output_len);
    out
}

/// Repeat `data` until it fills a multiple of `v` bytes. Empty stays empty.
fn repeat_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// block = (block + b + 1) mod 2^(8 * block.len())
fn add_with_carry(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// BMP (UTF-16BE) encoding with a two-byte NUL terminator; the empty
/// password encodes to nothing.
pub fn password_to_bmp(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bmp = Zeroizing::new(Vec::new());
    if password.is_empty() {
        return bmp;
    }
    for c in password.encode_utf16() {
        bmp.extend_from_slice(&c.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// pbeWithSHAAnd3-KeyTripleDES-CBC.
pub fn decrypt_pbe_sha1_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key = pkcs12_kdf(HashKind::Sha1, ID_KEY, bmp_password, salt, iterations, 24);
    let iv = pkcs12_kdf(HashKind::Sha1, ID_IV, bmp_password, salt, iterations, 8);

    let decryptor = Des3CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| Error::Certificate(format!("3DES-CBC init failed: {e}")))?;
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::Certificate("3DES-CBC decryption failed (wrong passphrase?)".into()))?;
    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// PBES2 with PBKDF2 (HMAC-SHA1 or HMAC-SHA256) and AES-256-CBC.
pub fn decrypt_pbes2_aes256cbc(
    ciphertext: &[u8],
    password: &str,
    prf: HashKind,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut key = Zeroizing::new([0u8; 32]);
    match prf {
        HashKind::Sha1 => {
            pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key[..])
        }
        HashKind::Sha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..])
        }
    }

    let decryptor = Aes256CbcDec::new_from_slices(&key[..], iv)
        .map_err(|e| Error::Certificate(format!("AES-256-CBC init failed: {e}")))?;
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| {
            Error::Certificate("AES-256-CBC decryption failed (wrong passphrase?)".into())
        })?;
    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// Check the container MAC in constant time.
pub fn verify_hmac(hash: HashKind, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error> {
    let init_err = |e: hmac::digest::InvalidLength| Error::Certificate(format!("HMAC init failed: {e}"));
    let ok = match hash {
        HashKind::Sha1 => {
            let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key).map_err(init_err)?;
            mac.update(data);
            mac.verify_slice(expected).is_ok()
        }
        HashKind::Sha256 => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(init_err)?;
            mac.update(data);
            mac.verify_slice(expected).is_ok()
        }
    };
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_to_bmp() {
        assert_eq!(password_to_bmp("ab").as_slice(), &[0, b'a', 0, b'b', 0, 0]);
        assert!(password_to_bmp("").is_empty());
    }

    #[test]
    fn test_repeat_to_multiple() {
        assert_eq!(repeat_to_multiple(b"abc", 4), b"abca".to_vec());
        assert_eq!(repeat_to_multiple(b"abcdefg", 4), b"abcdefga".to_vec());
        assert_eq!(repeat_to_multiple(b"abcd", 4), b"abcd".to_vec());
        assert!(repeat_to_multiple(b"", 4).is_empty());
    }

    #[test]
    fn test_add_with_carry() {
        let mut block = [0x00, 0xff];
        add_with_carry(&mut block, &[0x00, 0x00]);
        assert_eq!(block, [0x01, 0x00]);
    }

    #[test]
    fn test_kdf_rfc7292_vector() {
        // "smeg", salt 0x0A58CF64530D823F, 1 iteration, key material (id 1)
        let password = password_to_bmp("smeg");
        let salt = [0x0a, 0x58, 0xcf, 0x64, 0x53, 0x0d, 0x82, 0x3f];
        let key = pkcs12_kdf(HashKind::Sha1, ID_KEY, &password, &salt, 1, 24);
        assert_eq!(
            key.as_slice(),
            &[
                0x8a, 0xaa, 0xe6, 0x29, 0x7b, 0x6c, 0xb0, 0x46, 0x42, 0xab, 0x5b, 0x07, 0x78, 0x51,
                0x28, 0x4e, 0xb7, 0x12, 0x8f, 0x1a, 0x2a, 0x7f, 0xbc, 0xa3,
            ]
        );
    }

    #[test]
    fn test_kdf_ids_and_lengths() {
        let password = password_to_bmp("test");
        let key = pkcs12_kdf(HashKind::Sha256, ID_KEY, &password, b"saltsalt", 2048, 32);
        let mac = pkcs12_kdf(HashKind::Sha256, ID_MAC, &password, b"saltsalt", 2048, 32);
        assert_eq!(key.len(), 32);
        assert_ne!(key, mac);
        // spans two SHA-1 blocks
        assert_eq!(pkcs12_kdf(HashKind::Sha1, ID_IV, &password, b"s", 3, 40).len(), 40);
    }

    #[test]
    fn test_verify_hmac() {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(b"k").unwrap();
        mac.update(b"data");
        let tag = mac.finalize().into_bytes();
        assert!(verify_hmac(HashKind::Sha256, b"k", b"data", &tag).unwrap());
        assert!(!verify_hmac(HashKind::Sha256, b"k", b"datb", &tag).unwrap());
        assert_eq!(HashKind::Sha1.output_len(), 20);
    }
}
