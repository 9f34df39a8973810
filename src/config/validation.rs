//! Validation primitives shared by every configuration object.

use thiserror::Error;

/// A single validation failure, naming the offending app setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// A required setting is missing or empty.
    #[error("Configuration not valid. App setting \"{0}\" that is required for the application to start is missing.")]
    MissingAppSetting(&'static str),

    /// A scope entry is not a well-formed absolute URI.
    #[error("Configuration not valid. App setting \"Scopes\" contains \"{0}\" which is not a well-formed absolute URI.")]
    InvalidScope(String),
}

impl ValidationFailure {
    /// The name of the setting this failure refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationFailure::MissingAppSetting(field) => field,
            ValidationFailure::InvalidScope(_) => "Scopes",
        }
    }
}

/// Aggregate of every validation failure found on a configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_failures(.failures))]
pub struct ValidationError {
    failures: Vec<ValidationFailure>,
}

impl ValidationError {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// True if any failure names the given setting.
    pub fn names_field(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field() == field)
    }
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Self-validation contract for configuration objects.
///
/// `validate` evaluates every rule independently and collects all failures in
/// a stable order; it never short-circuits. `apply_defaults` runs after
/// binding and before validation to fill documented fallbacks (currently only
/// the default scope list).
pub trait ValidateConfiguration {
    fn validate(&self) -> Vec<ValidationFailure>;

    fn apply_defaults(&mut self) {}
}

/// Push a missing-setting failure when the value is absent or empty.
pub(crate) fn require(
    failures: &mut Vec<ValidationFailure>,
    value: Option<&str>,
    field: &'static str,
) {
    if value.is_none_or(str::is_empty) {
        failures.push(ValidationFailure::MissingAppSetting(field));
    }
}
