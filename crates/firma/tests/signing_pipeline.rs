use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use firma::{
    CertificateManager, Environment, Error, LocalClockProvider, SignerOptions, TimestampConfig,
    TimestampService, XmlDsigSigner,
};

const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:test:invoice" xmlns:cac="urn:test:aggregate">
  <ID>INV-2030-0001</ID>
  <cac:Party><Name>Acme &amp; Sons</Name></cac:Party>
  <Total currency="EUR">1210.00</Total>
</Invoice>"#;

fn keys_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys")
}

#[tokio::test]
async fn test_container_to_timestamped_document() {
    let manager = CertificateManager::new();
    let identity = manager
        .load_from_container_file(keys_dir().join("signer.p12"), "secret123")
        .unwrap();

    let in_window = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let validation = manager.validate_certificate_at(&identity, in_window);
    assert!(validation.valid, "{:?}", validation.errors);

    let info = manager.get_certificate_info(&identity);
    assert!(info.contains(&identity.fingerprint));
    assert!(!info.contains("PRIVATE KEY"));

    let signer = XmlDsigSigner::new();
    let signed = signer.sign_with_identity(INVOICE, &identity).unwrap();
    let result = signer.verify(&signed);
    assert!(result.valid, "{:?}", result.errors);

    let stamps = TimestampService::new(
        Environment::Development,
        TimestampConfig::default(),
        Arc::new(LocalClockProvider),
    )
    .unwrap();
    let stamped = stamps.add_timestamp(&signed).await.unwrap().unwrap();
    assert!(stamped.contains("SigningTime"));
    assert!(signer.verify(&stamped).valid);

    let tampered = stamped.replace("1210.00", "121.00");
    assert!(!signer.verify(&tampered).valid);
}

#[test]
fn test_pem_pair_and_container_share_cache_entry() {
    let manager = CertificateManager::new();
    let from_pem = manager
        .load_from_pem_files(keys_dir().join("signer-cert.pem"), keys_dir().join("signer-key.pem"))
        .unwrap();
    let from_container = manager
        .load_from_container_file(keys_dir().join("signer-legacy.p12"), "secret123")
        .unwrap();
    assert!(Arc::ptr_eq(&from_pem, &from_container));
    assert_eq!(manager.len(), 1);

    manager.clear_cache();
    manager.clear_cache();
    assert!(manager.is_empty());
}

#[test]
fn test_detached_key_info_flow() {
    let manager = CertificateManager::new();
    let identity = manager
        .load_from_container_file(keys_dir().join("signer.p12"), "secret123")
        .unwrap();

    let signer = XmlDsigSigner::with_options(SignerOptions {
        include_key_info: false,
        ..SignerOptions::default()
    });
    let signed = signer.sign_with_identity(INVOICE, &identity).unwrap();
    assert_eq!(signer.extract_certificate_from_signature(&signed), None);
    assert!(signer.verify_with_certificate(&signed, &identity.certificate_pem).valid);
}

#[test]
fn test_wrong_passphrase_and_production_guard() {
    let manager = CertificateManager::new();
    let err = manager
        .load_from_container_file(keys_dir().join("signer.p12"), "wrong")
        .unwrap_err();
    assert!(matches!(err, Error::Certificate(_)));

    let env: Environment = "prod".parse().unwrap();
    let err = TimestampService::new(env, TimestampConfig::default(), Arc::new(LocalClockProvider))
        .unwrap_err();
    assert!(matches!(err, Error::Timestamp { .. }));
}
