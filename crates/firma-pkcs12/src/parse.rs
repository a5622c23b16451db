#![forbid(unsafe_code)]

//! BER parsing of PKCS#12 (PFX) structures (RFC 7292).
//!
//! Containers are BER, not strict DER, so everything goes through
//! `yasna::parse_ber`.

use firma_core::Error;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};
use zeroize::Zeroizing;

use crate::kdf::{self, HashKind};
use crate::Pkcs12Contents;

// PKCS#7 content types
const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// PKCS#12 bag types
const OID_PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Encryption schemes
const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Hashes and PRFs
const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

#[derive(Debug)]
enum EncryptionScheme {
    PbeSha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: HashKind,
        iv: Vec<u8>,
    },
}

struct MacData {
    hash: HashKind,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum ContentInfo {
    Data(Vec<u8>),
    EncryptedData {
        scheme: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
}

enum SafeBag {
    ShroudedKey {
        scheme: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
    Cert(Vec<u8>),
    Other,
}

pub fn parse_pfx(data: &[u8], passphrase: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            if r.next().read_u32()? != 3 {
                return Err(invalid());
            }
            let auth_safe = read_data_content_info(r.next())?;
            let mac_data = r.read_optional(read_mac_data)?;
            Ok((auth_safe, mac_data))
        })
    })
    .map_err(|e| Error::Certificate(format!("malformed PKCS#12 container: {e}")))?;

    match mac_data {
        Some(mac) => verify_mac(&mac, &auth_safe, passphrase)?,
        None => log::debug!("PKCS#12 container has no MAC, skipping integrity check"),
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(read_content_info))
        .map_err(|e| Error::Certificate(format!("malformed PKCS#12 authenticated safe: {e}")))?;

    let bmp_password = kdf::password_to_bmp(passphrase);
    let mut contents = Pkcs12Contents {
        private_keys: Vec::new(),
        certificates: Vec::new(),
    };

    for ci in content_infos {
        let bags_der = match ci {
            ContentInfo::Data(data) => Zeroizing::new(data),
            ContentInfo::EncryptedData { scheme, ciphertext } => {
                decrypt(&scheme, &ciphertext, passphrase, &bmp_password)?
            }
        };

        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| Error::Certificate(format!("malformed PKCS#12 safe contents: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey { scheme, ciphertext } => {
                    let pkcs8 = decrypt(&scheme, &ciphertext, passphrase, &bmp_password)?;
                    contents.private_keys.push(pkcs8);
                }
                SafeBag::Cert(der) => contents.certificates.push(der),
                SafeBag::Other => {}
            }
        }
    }

    log::debug!(
        "PKCS#12 container holds {} key(s) and {} certificate(s)",
        contents.private_keys.len(),
        contents.certificates.len()
    );
    Ok(contents)
}

/// ContentInfo wrapping the authSafe: must be `data`, returns the payload.
fn read_data_content_info(r: BERReader) -> Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        if r.next().read_oid()? != oid(OID_DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

fn read_content_info(r: BERReader) -> Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            return Ok(ContentInfo::Data(data));
        }
        if content_type != oid(OID_ENCRYPTED_DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| {
            r.read_sequence(|r| {
                let _version = r.next().read_u32()?;
                r.next().read_sequence(|r| {
                    let _content_type = r.next().read_oid()?;
                    let scheme = read_encryption_scheme(r.next())?;
                    let ciphertext = r
                        .next()
                        .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                    Ok(ContentInfo::EncryptedData { scheme, ciphertext })
                })
            })
        })
    })
}

fn read_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;
        let bag = if bag_type == oid(OID_PKCS8_SHROUDED_KEY_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let scheme = read_encryption_scheme(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok(SafeBag::ShroudedKey { scheme, ciphertext })
                })
            })?
        } else if bag_type == oid(OID_CERT_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    if r.next().read_oid()? != oid(OID_X509_CERTIFICATE) {
                        return Err(invalid());
                    }
                    let der = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                    Ok(SafeBag::Cert(der))
                })
            })?
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };
        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Friendly names and local key ids are not needed.
fn skip_bag_attributes(r: &mut yasna::BERReaderSeq) -> Result<(), ASN1Error> {
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _attr_type = r.next().read_oid()?;
                r.next().read_set_of(|r| r.read_der().map(drop))
            })
        })
    })?;
    Ok(())
}

fn read_encryption_scheme(r: BERReader) -> Result<EncryptionScheme, ASN1Error> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;
        if alg == oid(OID_PBE_SHA1_3DES) {
            return r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(EncryptionScheme::PbeSha1And3Des { salt, iterations })
            });
        }
        if alg != oid(OID_PBES2) {
            return Err(invalid());
        }
        r.next().read_sequence(|r| {
            let (salt, iterations, prf) = r.next().read_sequence(|r| {
                if r.next().read_oid()? != oid(OID_PBKDF2) {
                    return Err(invalid());
                }
                r.next().read_sequence(read_pbkdf2_params)
            })?;
            let iv = r.next().read_sequence(|r| {
                if r.next().read_oid()? != oid(OID_AES_256_CBC) {
                    return Err(invalid());
                }
                r.next().read_bytes()
            })?;
            Ok(EncryptionScheme::Pbes2 {
                salt,
                iterations,
                prf,
                iv,
            })
        })
    })
}

/// PBKDF2-params: salt, iterationCount, keyLength OPTIONAL, prf DEFAULT hmacWithSHA1.
fn read_pbkdf2_params(
    r: &mut yasna::BERReaderSeq,
) -> Result<(Vec<u8>, u32, HashKind), ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;
    let mut prf = HashKind::Sha1;
    if let Some(der) = r.read_optional(|r| r.read_der())? {
        let prf_der = if der.first() == Some(&0x30) {
            Some(der)
        } else {
            // that was keyLength
            r.read_optional(|r| r.read_der())?
        };
        if let Some(prf_der) = prf_der {
            prf = parse_prf(&prf_der)?;
        }
    }
    Ok((salt, iterations, prf))
}

fn parse_prf(der: &[u8]) -> Result<HashKind, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let prf = r.next().read_oid()?;
            r.read_optional(|r| r.read_null())?;
            if prf == oid(OID_HMAC_SHA256) {
                Ok(HashKind::Sha256)
            } else if prf == oid(OID_HMAC_SHA1) {
                Ok(HashKind::Sha1)
            } else {
                Err(invalid())
            }
        })
    })
}

fn read_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let alg = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                if alg == oid(OID_SHA256) {
                    Ok(HashKind::Sha256)
                } else if alg == oid(OID_SHA1) {
                    Ok(HashKind::Sha1)
                } else {
                    Err(invalid())
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            hash,
            digest,
            salt,
            iterations,
        })
    })
}

fn verify_mac(mac: &MacData, auth_safe: &[u8], passphrase: &str) -> Result<(), Error> {
    let bmp_password = kdf::password_to_bmp(passphrase);
    let key = kdf::pkcs12_kdf(
        mac.hash,
        kdf::ID_MAC,
        &bmp_password,
        &mac.salt,
        mac.iterations,
        mac.hash.output_len(),
    );
    if !kdf::verify_hmac(mac.hash, &key, auth_safe, &mac.digest)? {
        return Err(Error::Certificate(
            "PKCS#12 MAC verification failed (wrong passphrase?)".into(),
        ));
    }
    Ok(())
}

fn decrypt(
    scheme: &EncryptionScheme,
    ciphertext: &[u8],
    passphrase: &str,
    bmp_password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    match scheme {
        EncryptionScheme::PbeSha1And3Des { salt, iterations } => {
            kdf::decrypt_pbe_sha1_3des(ciphertext, bmp_password, salt, *iterations)
        }
        EncryptionScheme::Pbes2 {
            salt,
            iterations,
            prf,
            iv,
        } => kdf::decrypt_pbes2_aes256cbc(ciphertext, passphrase, *prf, salt, *iterations, iv),
    }
}
