//! Hosting environment names and predicates.
//!
//! The well-known environment names deployments use, plus helpers for
//! branching on the ambient environment. The current environment is read from
//! `APP_ENVIRONMENT` and defaults to production.

/// Environment variable carrying the hosting environment name.
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

/// Well-known hosting environment names.
pub mod environment_names {
    pub const LOCAL_DEVELOPMENT: &str = "LocalDevelopment";
    pub const DEVELOPMENT: &str = "Development";
    pub const TEST: &str = "Test";
    pub const REFERENCE: &str = "Reference";
    pub const INTEGRATION: &str = "Integration";
    pub const ACCEPTANCE_TEST: &str = "AcceptanceTest";
    pub const STAGING: &str = "Staging";
    pub const PRODUCTION: &str = "Production";
}

/// The hosting environment the application runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    name: String,
}

impl HostEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Read the environment from `APP_ENVIRONMENT`, defaulting to
    /// `Production` when unset.
    pub fn from_env() -> Self {
        let name = std::env::var(ENVIRONMENT_VARIABLE)
            .unwrap_or_else(|_| environment_names::PRODUCTION.to_string());
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_environment(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_local_development(&self) -> bool {
        self.is_environment(environment_names::LOCAL_DEVELOPMENT)
    }

    pub fn is_development(&self) -> bool {
        self.is_environment(environment_names::DEVELOPMENT)
    }

    pub fn is_test(&self) -> bool {
        self.is_environment(environment_names::TEST)
    }

    pub fn is_reference(&self) -> bool {
        self.is_environment(environment_names::REFERENCE)
    }

    pub fn is_integration(&self) -> bool {
        self.is_environment(environment_names::INTEGRATION)
    }

    pub fn is_acceptance_test(&self) -> bool {
        self.is_environment(environment_names::ACCEPTANCE_TEST)
    }

    pub fn is_staging(&self) -> bool {
        self.is_environment(environment_names::STAGING)
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(environment_names::PRODUCTION)
    }
}
