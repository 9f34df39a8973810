//! # Azure AD configuration objects
//!
//! The information needed to make authenticated requests to a resource
//! protected with Azure Active Directory: a shared required-field set
//! ([`AzureAdConfiguration`]) plus a credential-specific payload (certificate
//! subject name or client secret), combined in
//! [`ConfidentialClientConfiguration`].

use serde::Deserialize;

use crate::config::secret::Secret;
use crate::config::validation::{require, ValidateConfiguration, ValidationFailure};
use crate::uri;

/// The Azure AD public-cloud instance every configuration points at.
pub const AZURE_AD_INSTANCE: &str = "https://login.microsoftonline.com/";

/// Shared settings for requesting tokens from Azure AD.
///
/// `app_identifier` is the AAD application identifier (URI-shaped) of the web
/// API the calling application needs access to; `tenant_id` and `client_id`
/// are GUID strings identifying the directory and the calling application.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AzureAdConfiguration {
    app_identifier: Option<String>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    scopes: Vec<String>,
}

impl AzureAdConfiguration {
    /// Create a configuration with the default scope list
    /// (`{app_identifier}/.default`).
    pub fn new(
        app_identifier: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        let app_identifier = app_identifier.into();
        let scopes = default_scopes(&app_identifier);
        Self {
            app_identifier: Some(app_identifier),
            tenant_id: Some(tenant_id.into()),
            client_id: Some(client_id.into()),
            scopes,
        }
    }

    /// Create a configuration with an explicit scope list.
    pub fn with_scopes(
        app_identifier: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            app_identifier: Some(app_identifier.into()),
            tenant_id: Some(tenant_id.into()),
            client_id: Some(client_id.into()),
            scopes,
        }
    }

    pub fn app_identifier(&self) -> Option<&str> {
        self.app_identifier.as_deref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The fixed authority endpoint. Not configurable.
    pub fn instance(&self) -> &'static str {
        AZURE_AD_INSTANCE
    }

    /// The expected token issuer. Equals [`Self::instance`].
    pub fn issuer(&self) -> &'static str {
        AZURE_AD_INSTANCE
    }

    /// Replace the application identifier and regenerate the default scope
    /// list from it. Used when one shared credential requests tokens for
    /// multiple downstream resources.
    pub fn override_app_identifier(&mut self, app_identifier: impl Into<String>) {
        let app_identifier = app_identifier.into();
        self.scopes = default_scopes(&app_identifier);
        self.app_identifier = Some(app_identifier);
    }
}

fn default_scopes(app_identifier: &str) -> Vec<String> {
    vec![format!("{app_identifier}/.default")]
}

impl ValidateConfiguration for AzureAdConfiguration {
    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        require(&mut failures, self.client_id(), "ClientId");
        require(&mut failures, self.tenant_id(), "TenantId");
        require(&mut failures, self.app_identifier(), "AppIdentifier");
        if self.scopes.is_empty() {
            failures.push(ValidationFailure::MissingAppSetting("Scopes"));
        } else {
            for scope in &self.scopes {
                if uri::valid_uri(Some(scope)).is_none() {
                    failures.push(ValidationFailure::InvalidScope(scope.clone()));
                }
            }
        }
        failures
    }

    fn apply_defaults(&mut self) {
        if self.scopes.is_empty() {
            if let Some(app_identifier) = &self.app_identifier {
                self.scopes = default_scopes(app_identifier);
            }
        }
    }
}

/// Access to the shared Azure AD field set of a configuration object.
pub trait AzureAdSettings {
    fn azure_ad(&self) -> &AzureAdConfiguration;
    fn azure_ad_mut(&mut self) -> &mut AzureAdConfiguration;
}

impl AzureAdSettings for AzureAdConfiguration {
    fn azure_ad(&self) -> &AzureAdConfiguration {
        self
    }

    fn azure_ad_mut(&mut self) -> &mut AzureAdConfiguration {
        self
    }
}

/// Azure AD settings plus the client secret the application uses to prove its
/// identity (also referred to as the application password).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientSecretConfiguration {
    #[serde(flatten)]
    azure_ad: AzureAdConfiguration,
    client_secret: Option<Secret>,
}

impl ClientSecretConfiguration {
    pub fn new(client_secret: impl Into<Secret>, azure_ad: AzureAdConfiguration) -> Self {
        Self {
            azure_ad,
            client_secret: Some(client_secret.into()),
        }
    }

    pub fn client_secret(&self) -> Option<&Secret> {
        self.client_secret.as_ref()
    }

    /// Clone this configuration against a different downstream resource,
    /// regenerating the default scope list.
    pub fn with_app_identifier(mut self, app_identifier: impl Into<String>) -> Self {
        self.azure_ad.override_app_identifier(app_identifier);
        self
    }
}

impl AzureAdSettings for ClientSecretConfiguration {
    fn azure_ad(&self) -> &AzureAdConfiguration {
        &self.azure_ad
    }

    fn azure_ad_mut(&mut self) -> &mut AzureAdConfiguration {
        &mut self.azure_ad
    }
}

impl ValidateConfiguration for ClientSecretConfiguration {
    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = self.azure_ad.validate();
        require(
            &mut failures,
            self.client_secret.as_ref().map(Secret::expose),
            "ClientSecret",
        );
        failures
    }

    fn apply_defaults(&mut self) {
        self.azure_ad.apply_defaults();
    }
}

/// Azure AD settings plus the subject name of the certificate that proves the
/// application's identity.
///
/// The certificate (without the private key) must be uploaded to the AAD
/// application itself; the certificate with the private key must be installed
/// in one of the local certificate stores.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CertificateConfiguration {
    #[serde(flatten)]
    azure_ad: AzureAdConfiguration,
    certificate_subject_name: Option<String>,
}

impl CertificateConfiguration {
    pub fn new(
        certificate_subject_name: impl Into<String>,
        azure_ad: AzureAdConfiguration,
    ) -> Self {
        Self {
            azure_ad,
            certificate_subject_name: Some(certificate_subject_name.into()),
        }
    }

    pub fn certificate_subject_name(&self) -> Option<&str> {
        self.certificate_subject_name.as_deref()
    }

    /// Clone this configuration against a different downstream resource,
    /// regenerating the default scope list.
    pub fn with_app_identifier(mut self, app_identifier: impl Into<String>) -> Self {
        self.azure_ad.override_app_identifier(app_identifier);
        self
    }
}

impl AzureAdSettings for CertificateConfiguration {
    fn azure_ad(&self) -> &AzureAdConfiguration {
        &self.azure_ad
    }

    fn azure_ad_mut(&mut self) -> &mut AzureAdConfiguration {
        &mut self.azure_ad
    }
}

impl ValidateConfiguration for CertificateConfiguration {
    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = self.azure_ad.validate();
        require(
            &mut failures,
            self.certificate_subject_name(),
            "CertificateSubjectName",
        );
        failures
    }

    fn apply_defaults(&mut self) {
        self.azure_ad.apply_defaults();
    }
}

/// A complete confidential-client configuration: the shared field set plus
/// exactly one credential. The two credential kinds are mutually exclusive by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfidentialClientConfiguration {
    ClientSecret(ClientSecretConfiguration),
    Certificate(CertificateConfiguration),
}

impl ConfidentialClientConfiguration {
    pub fn azure_ad(&self) -> &AzureAdConfiguration {
        match self {
            ConfidentialClientConfiguration::ClientSecret(configuration) => {
                configuration.azure_ad()
            }
            ConfidentialClientConfiguration::Certificate(configuration) => {
                configuration.azure_ad()
            }
        }
    }
}

impl ValidateConfiguration for ConfidentialClientConfiguration {
    fn validate(&self) -> Vec<ValidationFailure> {
        match self {
            ConfidentialClientConfiguration::ClientSecret(configuration) => {
                configuration.validate()
            }
            ConfidentialClientConfiguration::Certificate(configuration) => {
                configuration.validate()
            }
        }
    }

    fn apply_defaults(&mut self) {
        match self {
            ConfidentialClientConfiguration::ClientSecret(configuration) => {
                configuration.apply_defaults();
            }
            ConfidentialClientConfiguration::Certificate(configuration) => {
                configuration.apply_defaults();
            }
        }
    }
}

impl From<ClientSecretConfiguration> for ConfidentialClientConfiguration {
    fn from(configuration: ClientSecretConfiguration) -> Self {
        ConfidentialClientConfiguration::ClientSecret(configuration)
    }
}

impl From<CertificateConfiguration> for ConfidentialClientConfiguration {
    fn from(configuration: CertificateConfiguration) -> Self {
        ConfidentialClientConfiguration::Certificate(configuration)
    }
}
