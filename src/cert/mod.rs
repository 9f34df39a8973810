//! # Certificate store lookup
//!
//! Reads certificates from a user-scoped or machine-scoped store based on the
//! certificate's subject name. Stores are directories of PEM files holding a
//! certificate and its private key; expired or not-yet-valid certificates are
//! discarded. Every lookup re-scans the store, nothing is cached and no
//! handle is held across calls.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use const_oid::db::rfc4519::CN;
use thiserror::Error;
use tracing::{debug, warn};
use x509_cert::der::Decode;
use x509_cert::Certificate;

/// Environment variable overriding the user-scoped store directory.
pub const USER_STORE_ENV: &str = "AAD_CERT_STORE_USER";
/// Environment variable overriding the machine-scoped store directory.
pub const MACHINE_STORE_ENV: &str = "AAD_CERT_STORE_MACHINE";

const DEFAULT_MACHINE_STORE: &str = "/etc/aad-confidential-client/certs";

/// Certificate lookup failures.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error(
        "could not find a certificate with subject \"{subject}\" in either the current-user or \
         local-machine store. Install the certificate on the target machine before using it"
    )]
    NotFound { subject: String },

    #[error("certificate subject name is missing")]
    MissingSubjectName,
}

/// A certificate located in one of the stores.
///
/// Carries the full PEM contents of the backing file (certificate plus any
/// private key) so a credential can be built from it, along with the parsed
/// identity and validity window.
#[derive(Clone)]
pub struct StoredCertificate {
    path: PathBuf,
    contents: String,
    der: Vec<u8>,
    subject: String,
    common_name: Option<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl StoredCertificate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw PEM contents of the store file, including the private key when
    /// one is stored alongside the certificate.
    pub fn pem_bundle(&self) -> &str {
        &self.contents
    }

    /// The DER encoding of the certificate entry.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The PEM encoding of the private key stored alongside the certificate,
    /// when the file contains one.
    pub fn private_key_pem(&self) -> Option<String> {
        let entries = pem::parse_many(&self.contents).ok()?;
        entries
            .into_iter()
            .find(|entry| entry.tag().ends_with("PRIVATE KEY"))
            .map(|entry| pem::encode(&entry))
    }

    /// The certificate subject (RFC 4514 string form).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }
}

impl fmt::Debug for StoredCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // contents may hold a private key
        f.debug_struct("StoredCertificate")
            .field("path", &self.path)
            .field("subject", &self.subject)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

/// A single certificate store backed by a directory of PEM files.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    root: PathBuf,
}

impl CertificateStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the certificate whose subject common name contains
    /// `subject_name` and whose validity window includes `now`, preferring
    /// the most recently issued (latest not-before) among multiple matches.
    ///
    /// Files that cannot be read or parsed are skipped with a warning; a
    /// store directory may hold unrelated key material.
    pub fn find_by_subject_name(
        &self,
        subject_name: &str,
        now: DateTime<Utc>,
    ) -> Option<StoredCertificate> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                debug!(store = %self.root.display(), %error, "certificate store is not readable, treating as empty");
                return None;
            }
        };

        let mut best: Option<StoredCertificate> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !has_pem_extension(&path) {
                continue;
            }
            for candidate in read_candidates(&path) {
                if !subject_matches(&candidate, subject_name) {
                    continue;
                }
                if now < candidate.not_before || now >= candidate.not_after {
                    debug!(
                        subject = %candidate.subject,
                        path = %path.display(),
                        "skipping certificate outside its validity window"
                    );
                    continue;
                }
                let newer = best
                    .as_ref()
                    .map(|current| candidate.not_before > current.not_before)
                    .unwrap_or(true);
                if newer {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

/// The pair of stores searched for a confidential-client certificate: the
/// current-user store first, falling back to the local-machine store.
#[derive(Debug, Clone)]
pub struct CertificateStores {
    current_user: CertificateStore,
    local_machine: CertificateStore,
}

impl CertificateStores {
    pub fn new(current_user: CertificateStore, local_machine: CertificateStore) -> Self {
        Self {
            current_user,
            local_machine,
        }
    }

    /// The default store locations, overridable through the
    /// `AAD_CERT_STORE_USER` and `AAD_CERT_STORE_MACHINE` environment
    /// variables.
    pub fn from_env() -> Self {
        Self::new(
            CertificateStore::open(env_path_or(USER_STORE_ENV, default_user_store)),
            CertificateStore::open(env_path_or(MACHINE_STORE_ENV, || {
                PathBuf::from(DEFAULT_MACHINE_STORE)
            })),
        )
    }

    /// Locate a certificate valid at `now` whose subject matches
    /// `subject_name`, searching the current-user store first and the
    /// local-machine store second.
    pub fn find_by_subject_name(
        &self,
        subject_name: &str,
        now: DateTime<Utc>,
    ) -> Result<StoredCertificate, CertificateError> {
        if subject_name.trim().is_empty() {
            return Err(CertificateError::MissingSubjectName);
        }

        let found = self
            .current_user
            .find_by_subject_name(subject_name, now)
            .or_else(|| self.local_machine.find_by_subject_name(subject_name, now));

        match found {
            Some(certificate) => {
                debug!(
                    subject = %certificate.subject,
                    path = %certificate.path.display(),
                    "resolved certificate"
                );
                Ok(certificate)
            }
            None => Err(CertificateError::NotFound {
                subject: subject_name.to_string(),
            }),
        }
    }
}

impl Default for CertificateStores {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_path_or(variable: &str, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var_os(variable)
        .map(PathBuf::from)
        .unwrap_or_else(fallback)
}

fn default_user_store() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".config/aad-confidential-client/certs")
}

fn has_pem_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("pem" | "crt" | "cer")
    )
}

/// Parse every certificate entry in a PEM file into a candidate.
fn read_candidates(path: &Path) -> Vec<StoredCertificate> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            warn!(path = %path.display(), %error, "skipping unreadable store file");
            return Vec::new();
        }
    };

    let entries = match pem::parse_many(&contents) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(path = %path.display(), %error, "skipping store file that is not valid PEM");
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for entry in entries.iter().filter(|entry| entry.tag() == "CERTIFICATE") {
        let der = entry.contents();
        let certificate = match Certificate::from_der(der) {
            Ok(certificate) => certificate,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping entry that is not an X.509 certificate");
                continue;
            }
        };

        let validity = &certificate.tbs_certificate.validity;
        let not_before = DateTime::<Utc>::from(validity.not_before.to_system_time());
        let not_after = DateTime::<Utc>::from(validity.not_after.to_system_time());

        candidates.push(StoredCertificate {
            path: path.to_path_buf(),
            contents: contents.clone(),
            der: der.to_vec(),
            subject: certificate.tbs_certificate.subject.to_string(),
            common_name: common_name(&certificate),
            not_before,
            not_after,
        });
    }
    candidates
}

/// Match on the subject common name (case-insensitive substring), falling
/// back to the full subject string when no CN is present.
fn subject_matches(candidate: &StoredCertificate, subject_name: &str) -> bool {
    let needle = subject_name.to_lowercase();
    match &candidate.common_name {
        Some(common_name) => common_name.to_lowercase().contains(&needle),
        None => candidate.subject.to_lowercase().contains(&needle),
    }
}

fn common_name(certificate: &Certificate) -> Option<String> {
    for rdn in certificate.tbs_certificate.subject.0.iter() {
        for attribute in rdn.0.iter() {
            if attribute.oid == CN {
                if let Ok(value) = std::str::from_utf8(attribute.value.value()) {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
