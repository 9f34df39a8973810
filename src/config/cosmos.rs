//! Cosmos DB connection settings.

use serde::Deserialize;

use crate::config::secret::Secret;
use crate::config::validation::{require, ValidateConfiguration, ValidationFailure};

/// Settings for connecting to a Cosmos DB account.
///
/// The connection string is always derived from the endpoint and key; it can
/// never be set independently. The legacy `CosmosDb`-prefixed key names are
/// accepted as aliases when binding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CosmosDbConfiguration {
    #[serde(alias = "CosmosDbAccountEndpoint")]
    account_endpoint: Option<String>,
    #[serde(alias = "CosmosDbPrimaryKey")]
    primary_key: Option<Secret>,
}

impl CosmosDbConfiguration {
    pub fn new(account_endpoint: impl Into<String>, primary_key: impl Into<Secret>) -> Self {
        Self {
            account_endpoint: Some(account_endpoint.into()),
            primary_key: Some(primary_key.into()),
        }
    }

    pub fn account_endpoint(&self) -> Option<&str> {
        self.account_endpoint.as_deref()
    }

    pub fn primary_key(&self) -> Option<&Secret> {
        self.primary_key.as_ref()
    }

    /// The derived connection string, available once both settings are
    /// present. Wrapped as a [`Secret`] because it embeds the account key.
    pub fn connection_string(&self) -> Option<Secret> {
        match (&self.account_endpoint, &self.primary_key) {
            (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => Some(
                Secret::new(format!("AccountEndpoint={endpoint};AccountKey={}", key.expose())),
            ),
            _ => None,
        }
    }
}

impl ValidateConfiguration for CosmosDbConfiguration {
    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        require(&mut failures, self.account_endpoint(), "AccountEndpoint");
        require(
            &mut failures,
            self.primary_key.as_ref().map(Secret::expose),
            "PrimaryKey",
        );
        failures
    }
}
