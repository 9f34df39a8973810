//! # Configuration
//!
//! Typed, self-validating configuration objects and the section binding that
//! produces them. Binding is fail-fast: a missing or malformed required
//! setting is fatal to application startup, and every failure is reported at
//! once rather than one at a time.

mod azure_ad;
mod binding;
mod cosmos;
mod secret;
mod validation;

pub use azure_ad::{
    AzureAdConfiguration, AzureAdSettings, CertificateConfiguration, ClientSecretConfiguration,
    ConfidentialClientConfiguration, AZURE_AD_INSTANCE,
};
pub use binding::{get_valid, get_valid_with_app_identifier, BindingError};
pub use cosmos::CosmosDbConfiguration;
pub use secret::Secret;
pub use validation::{ValidateConfiguration, ValidationError, ValidationFailure};
