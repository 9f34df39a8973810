//! # Azure AD Confidential Client
//!
//! Validated configuration objects for Azure AD (Entra ID) confidential-client
//! authentication, a Cosmos DB connection-settings holder, and a thin token
//! acquisition client for the OAuth2 client-credentials flow.
//!
//! A caller binds a raw configuration section into one of the typed
//! configuration objects, which fails fast if required settings are missing or
//! malformed. The validated configuration is then handed to
//! [`identity::AzureAdIdentityClient`], which requests a bearer token using
//! either a client secret or a certificate looked up by subject name.

pub mod cert;
pub mod config;
pub mod hosting;
pub mod identity;
pub mod uri;

pub use cert::{CertificateError, CertificateStore, CertificateStores, StoredCertificate};
pub use config::{
    get_valid, get_valid_with_app_identifier, AzureAdConfiguration, AzureAdSettings, BindingError,
    CertificateConfiguration, ClientSecretConfiguration, ConfidentialClientConfiguration,
    CosmosDbConfiguration, Secret, ValidateConfiguration, ValidationError, ValidationFailure,
};
pub use identity::{AccessToken, AzureAdIdentityClient, TokenError};
