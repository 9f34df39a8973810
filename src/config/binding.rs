//! Binding configuration sections into validated objects.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::azure_ad::AzureAdSettings;
use crate::config::validation::{ValidateConfiguration, ValidationError};

/// Why a configuration section could not be turned into a valid object.
///
/// Either way the section is unusable; callers are expected to treat this as
/// fatal to application startup.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to bind configuration section")]
    Bind(#[source] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Bind a configuration section into a typed object and validate it.
///
/// Binding reaches fields that are not settable from outside the object.
/// Defaults (the synthetic `{AppIdentifier}/.default` scope) are applied
/// before validation, and every validation failure is reported at once.
pub fn get_valid<T>(section: &Value) -> Result<T, BindingError>
where
    T: DeserializeOwned + ValidateConfiguration,
{
    let mut configuration: T =
        serde_json::from_value(section.clone()).map_err(BindingError::Bind)?;
    configuration.apply_defaults();
    finish(configuration)
}

/// Bind a configuration section, then point it at a different downstream
/// resource before validating.
///
/// The bound object's application identifier is overwritten with
/// `app_identifier` and the default scope list is regenerated from it. This
/// models one shared secret or certificate reused to request tokens for
/// multiple resource identifiers.
pub fn get_valid_with_app_identifier<T>(
    section: &Value,
    app_identifier: &str,
) -> Result<T, BindingError>
where
    T: DeserializeOwned + ValidateConfiguration + AzureAdSettings,
{
    let mut configuration: T =
        serde_json::from_value(section.clone()).map_err(BindingError::Bind)?;
    configuration
        .azure_ad_mut()
        .override_app_identifier(app_identifier);
    configuration.apply_defaults();
    debug!(app_identifier, "bound configuration with overridden app identifier");
    finish(configuration)
}

fn finish<T: ValidateConfiguration>(configuration: T) -> Result<T, BindingError> {
    let failures = configuration.validate();
    if failures.is_empty() {
        Ok(configuration)
    } else {
        Err(ValidationError::new(failures).into())
    }
}
