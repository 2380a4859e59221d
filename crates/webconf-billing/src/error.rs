//! Error types for `webconf-billing`.

use thiserror::Error;
use uuid::Uuid;
use webconf_core::validation::{Field, FieldError, ValidationErrors};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a lifecycle transition was aborted. Every variant rolls back the local
/// transaction it occurred in.
#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error("invalid subscription: {0}")]
  Invalid(ValidationErrors),

  /// The payment gateway refused or did not answer.
  #[error("{0}")]
  Gateway(String),

  #[error("tax id is invalid")]
  TaxIdInvalid,

  #[error("zip code is invalid")]
  ZipCodeInvalid,

  #[error("tax id and zip code are invalid")]
  TaxIdAndZipCodeInvalid,

  #[error("Bad ops_type, can't {operation}")]
  UnsupportedGatewayType {
    ops_type:  String,
    operation: &'static str,
  },

  #[error("subscription not found: {0}")]
  NotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl LifecycleError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// The failure as field-keyed messages, the shape shown to API callers.
  pub fn errors(&self) -> ValidationErrors {
    match self {
      Self::Invalid(errors) => errors.clone(),
      Self::TaxIdInvalid => (Field::TaxId, FieldError::Invalid).into(),
      Self::ZipCodeInvalid => (Field::ZipCode, FieldError::Invalid).into(),
      Self::TaxIdAndZipCodeInvalid => {
        let mut errors = ValidationErrors::new();
        errors.add(Field::TaxId, FieldError::Invalid);
        errors.add(Field::ZipCode, FieldError::Invalid);
        errors
      }
      Self::Gateway(_)
      | Self::UnsupportedGatewayType { .. }
      | Self::NotFound(_)
      | Self::Store(_) => (Field::OpsError, FieldError::Message(self.to_string())).into(),
    }
  }
}

/// Why no invoice item could be produced or posted.
#[derive(Debug, Error)]
pub enum UsageError {
  #[error("get_stats error: {0}")]
  StatsFetch(String),

  #[error("gateway error: {0}")]
  Gateway(String),
}
