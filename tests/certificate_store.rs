//! Certificate store lookup against directories of generated PEM files.

use std::path::Path;

use aad_confidential_client::{CertificateError, CertificateStore, CertificateStores};
use chrono::{Datelike, TimeZone, Utc};
use rcgen::{CertificateParams, DnType, KeyPair};

fn write_certificate(
    directory: &Path,
    file_name: &str,
    common_name: &str,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    params.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);

    let key_pair = KeyPair::generate().unwrap();
    let certificate = params.self_signed(&key_pair).unwrap();
    let bundle = format!("{}{}", certificate.pem(), key_pair.serialize_pem());
    std::fs::write(directory.join(file_name), bundle).unwrap();
}

fn stores(user: &Path, machine: &Path) -> CertificateStores {
    CertificateStores::new(CertificateStore::open(user), CertificateStore::open(machine))
}

#[test]
fn finds_certificate_by_common_name() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "svc.pem", "contoso-service-client", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path())
        .find_by_subject_name("contoso-service-client", now)
        .unwrap();
    assert!(found.subject().contains("contoso-service-client"));
    assert_eq!(found.path(), user.path().join("svc.pem"));
}

#[test]
fn matches_on_subject_substring() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "svc.pem", "contoso-service-client", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path()).find_by_subject_name("contoso-service", now);
    assert!(found.is_ok());
}

#[test]
fn matches_subject_case_insensitively() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "svc.pem", "Contoso-Service-Client", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path()).find_by_subject_name("contoso-service", now);
    assert!(found.is_ok());
}

#[test]
fn prefers_most_recently_issued_among_valid_matches() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "old.pem", "svc", (2020, 1, 1), (2040, 1, 1));
    write_certificate(user.path(), "new.pem", "svc", (2028, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path())
        .find_by_subject_name("svc", now)
        .unwrap();
    assert_eq!(found.not_before().year(), 2028);
}

#[test]
fn discards_certificates_outside_their_validity_window() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "expired.pem", "svc", (2020, 1, 1), (2025, 1, 1));
    write_certificate(user.path(), "future.pem", "svc", (2038, 1, 1), (2040, 1, 1));
    write_certificate(user.path(), "valid.pem", "svc", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path())
        .find_by_subject_name("svc", now)
        .unwrap();
    assert_eq!(found.path(), user.path().join("valid.pem"));
}

#[test]
fn only_expired_certificates_is_not_found() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "expired.pem", "svc", (2020, 1, 1), (2025, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let error = stores(user.path(), machine.path())
        .find_by_subject_name("svc", now)
        .unwrap_err();
    assert!(matches!(error, CertificateError::NotFound { .. }));
}

#[test]
fn searches_the_user_store_before_the_machine_store() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(user.path(), "svc.pem", "svc", (2024, 1, 1), (2040, 1, 1));
    write_certificate(machine.path(), "svc.pem", "svc", (2026, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path())
        .find_by_subject_name("svc", now)
        .unwrap();
    assert_eq!(found.path(), user.path().join("svc.pem"));
}

#[test]
fn falls_back_to_the_machine_store() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    write_certificate(machine.path(), "svc.pem", "svc", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path())
        .find_by_subject_name("svc", now)
        .unwrap();
    assert_eq!(found.path(), machine.path().join("svc.pem"));
}

#[test]
fn skips_files_that_are_not_certificates() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();
    std::fs::write(user.path().join("junk.pem"), "not a certificate").unwrap();
    std::fs::write(user.path().join("notes.txt"), "ignored entirely").unwrap();
    write_certificate(user.path(), "svc.pem", "svc", (2024, 1, 1), (2040, 1, 1));

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let found = stores(user.path(), machine.path()).find_by_subject_name("svc", now);
    assert!(found.is_ok());
}

#[test]
fn missing_store_directories_are_treated_as_empty() {
    let parent = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let error = stores(&parent.path().join("no-user"), &parent.path().join("no-machine"))
        .find_by_subject_name("svc", now)
        .unwrap_err();
    match error {
        CertificateError::NotFound { subject } => assert_eq!(subject, "svc"),
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn not_found_error_names_the_subject() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let error = stores(user.path(), machine.path())
        .find_by_subject_name("missing-client", now)
        .unwrap_err();
    assert!(error.to_string().contains("\"missing-client\""));
}

#[test]
fn blank_subject_name_is_rejected() {
    let user = tempfile::tempdir().unwrap();
    let machine = tempfile::tempdir().unwrap();

    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    let error = stores(user.path(), machine.path())
        .find_by_subject_name("  ", now)
        .unwrap_err();
    assert!(matches!(error, CertificateError::MissingSubjectName));
}
