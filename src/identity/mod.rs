//! # Identity client
//!
//! Acquires bearer tokens from Azure AD using the OAuth2 client-credentials
//! flow, authenticating with either a client secret or a certificate resolved
//! from the local stores. Single-attempt semantics: identity-provider
//! failures are logged and re-signaled unchanged, with no retry or backoff.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::cert::{CertificateError, CertificateStores, StoredCertificate};
use crate::config::{
    ConfidentialClientConfiguration, Secret, ValidateConfiguration, ValidationError,
};

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 600;
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Token acquisition failures.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Configuration(#[from] ValidationError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error("failed to build client assertion")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("certificate file {path} does not contain a private key")]
    MissingPrivateKey { path: std::path::PathBuf },

    #[error("failed to request token from identity provider")]
    Request(#[from] reqwest::Error),

    /// The identity provider rejected the request (bad credential,
    /// throttling, unknown tenant). Carried unchanged from the AAD error
    /// body; the caller decides whether to retry.
    #[error("identity provider returned {status}: {error}: {error_description}")]
    Provider {
        status: StatusCode,
        error: String,
        error_description: String,
    },
}

/// A bearer token issued by the identity provider.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    access_token: String,
    token_type: String,
    expires_in: u64,
    #[serde(default)]
    scope: Option<String>,
}

impl AccessToken {
    pub fn token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Token lifetime in seconds, as reported by the provider.
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// The scopes actually granted, when the provider reports them.
    pub fn granted_scopes(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Error body returned by the AAD token endpoint.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
    error_description: String,
}

/// Claims of the JWT a certificate credential presents as client assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims {
    aud: String,
    exp: i64,
    iat: i64,
    iss: String,
    jti: String,
    nbf: i64,
    sub: String,
}

/// The credential the client was configured with, before first use.
enum CredentialSource {
    ClientSecret(Secret),
    CertificateSubject(String),
}

/// The lazily built application state: the per-tenant token endpoint and the
/// resolved credential.
enum PreparedCredential {
    ClientSecret(Secret),
    Certificate(StoredCertificate),
}

struct ConfidentialApplication {
    token_endpoint: String,
    credential: PreparedCredential,
}

/// A confidential client that requests tokens from Azure AD on behalf of the
/// application itself.
///
/// The configuration is validated up front; the token endpoint and credential
/// (including the certificate-store lookup) are built once on first use and
/// reused for the lifetime of the client. Concurrent first use performs a
/// single initialization.
pub struct AzureAdIdentityClient {
    client_id: String,
    tenant_id: String,
    scopes: Vec<String>,
    credential: CredentialSource,
    authority: String,
    stores: CertificateStores,
    http: reqwest::Client,
    application: OnceCell<ConfidentialApplication>,
}

impl std::fmt::Debug for AzureAdIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAdIdentityClient")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("scopes", &self.scopes)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl AzureAdIdentityClient {
    /// Create a client from a validated configuration.
    ///
    /// Fails fast with the aggregated validation failures if the
    /// configuration is incomplete.
    pub fn new(configuration: ConfidentialClientConfiguration) -> Result<Self, TokenError> {
        let failures = configuration.validate();
        if !failures.is_empty() {
            return Err(ValidationError::new(failures).into());
        }

        let azure_ad = configuration.azure_ad();
        // Validation guarantees these are present.
        let client_id = azure_ad.client_id().unwrap_or_default().to_string();
        let tenant_id = azure_ad.tenant_id().unwrap_or_default().to_string();
        let scopes = azure_ad.scopes().to_vec();
        let authority = azure_ad.instance().trim_end_matches('/').to_string();

        let credential = match &configuration {
            ConfidentialClientConfiguration::ClientSecret(secret_configuration) => {
                CredentialSource::ClientSecret(
                    secret_configuration.client_secret().cloned().unwrap_or_default(),
                )
            }
            ConfidentialClientConfiguration::Certificate(certificate_configuration) => {
                CredentialSource::CertificateSubject(
                    certificate_configuration
                        .certificate_subject_name()
                        .unwrap_or_default()
                        .to_string(),
                )
            }
        };

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client_id,
            tenant_id,
            scopes,
            credential,
            authority,
            stores: CertificateStores::from_env(),
            http,
            application: OnceCell::new(),
        })
    }

    /// Override the authority endpoint. Intended for tests that point the
    /// client at a local identity endpoint.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the certificate stores searched for a certificate credential.
    pub fn with_certificate_stores(mut self, stores: CertificateStores) -> Self {
        self.stores = stores;
        self
    }

    /// Request a bearer token for the configured scopes.
    pub async fn request_token(&self) -> Result<AccessToken, TokenError> {
        info!("requesting token from identity provider");

        let application = self
            .application
            .get_or_try_init(|| async { self.build_application() })
            .await?;

        let scope = self.scopes.join(" ");
        let assertion;
        let params: Vec<(&str, &str)> = match &application.credential {
            PreparedCredential::ClientSecret(secret) => vec![
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", secret.expose()),
                ("scope", &scope),
            ],
            PreparedCredential::Certificate(certificate) => {
                assertion = self.sign_assertion(certificate, &application.token_endpoint)?;
                vec![
                    ("grant_type", "client_credentials"),
                    ("client_id", &self.client_id),
                    ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                    ("client_assertion", &assertion),
                    ("scope", &scope),
                ]
            }
        };

        let response = self
            .http
            .post(&application.token_endpoint)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (provider_error, description) = parse_provider_error(&body);
            error!(%status, error = %provider_error, "token request failed");
            return Err(TokenError::Provider {
                status,
                error: provider_error,
                error_description: description,
            });
        }

        let token: AccessToken = response.json().await?;
        info!("token requested successfully");
        debug!(
            expires_in = token.expires_in,
            granted_scopes = ?token.scope,
            "token details"
        );
        Ok(token)
    }

    /// Build the per-tenant token endpoint and resolve the credential. For a
    /// certificate configuration this performs the store lookup with the
    /// current time.
    fn build_application(&self) -> Result<ConfidentialApplication, TokenError> {
        let token_endpoint = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);

        let credential = match &self.credential {
            CredentialSource::ClientSecret(secret) => {
                debug!("building confidential client with client secret");
                PreparedCredential::ClientSecret(secret.clone())
            }
            CredentialSource::CertificateSubject(subject_name) => {
                debug!(subject = %subject_name, "building confidential client with certificate");
                let certificate = self.stores.find_by_subject_name(subject_name, Utc::now())?;
                PreparedCredential::Certificate(certificate)
            }
        };

        Ok(ConfidentialApplication {
            token_endpoint,
            credential,
        })
    }

    /// Sign a fresh client assertion with the resolved certificate's private
    /// key, carrying the certificate thumbprint in the `x5t#S256` header.
    fn sign_assertion(
        &self,
        certificate: &StoredCertificate,
        audience: &str,
    ) -> Result<String, TokenError> {
        let key_pem =
            certificate
                .private_key_pem()
                .ok_or_else(|| TokenError::MissingPrivateKey {
                    path: certificate.path().to_path_buf(),
                })?;
        let key = EncodingKey::from_rsa_pem(key_pem.as_bytes())?;

        let mut header = Header::new(Algorithm::RS256);
        header.x5t_s256 = Some(sha256_thumbprint(certificate.der()));

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            aud: audience.to_string(),
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
            iss: self.client_id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            sub: self.client_id.clone(),
        };

        Ok(encode(&header, &claims, &key)?)
    }
}

/// Base64url (unpadded) SHA-256 over the DER-encoded certificate.
fn sha256_thumbprint(der: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(der);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn parse_provider_error(body: &str) -> (String, String) {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => (parsed.error, parsed.error_description),
        Err(_) => ("unknown_error".to_string(), body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AzureAdConfiguration, ClientSecretConfiguration};

    #[test]
    fn incomplete_configuration_is_rejected_up_front() {
        let configuration = ClientSecretConfiguration::new(
            "secret",
            AzureAdConfiguration::new("api://app", "", "client"),
        );
        let result = AzureAdIdentityClient::new(configuration.into());
        match result {
            Err(TokenError::Configuration(error)) => assert!(error.names_field("TenantId")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn token_endpoint_derives_from_tenant() {
        let configuration = ClientSecretConfiguration::new(
            "secret",
            AzureAdConfiguration::new("api://app", "tenant-guid", "client-guid"),
        );
        let client = AzureAdIdentityClient::new(configuration.into()).unwrap();
        let application = client.build_application().unwrap();
        assert_eq!(
            application.token_endpoint,
            "https://login.microsoftonline.com/tenant-guid/oauth2/v2.0/token"
        );
    }

    #[test]
    fn provider_error_body_is_surfaced_verbatim() {
        let (error, description) = parse_provider_error(
            r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
        );
        assert_eq!(error, "invalid_client");
        assert!(description.starts_with("AADSTS7000215"));
    }

    #[test]
    fn unparseable_error_body_is_kept_as_description() {
        let (error, description) = parse_provider_error("upstream exploded");
        assert_eq!(error, "unknown_error");
        assert_eq!(description, "upstream exploded");
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken {
            access_token: "eyJ".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3599,
            scope: None,
        };
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("eyJ"));
        assert!(rendered.contains("[redacted]"));
    }
}
