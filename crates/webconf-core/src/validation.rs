//! Record-level validation errors, keyed by field.
//!
//! Lifecycle failures are reported to callers in this shape rather than as
//! opaque errors, so a form can attach each message to its input.

use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};
use strum::Display;

/// A subscription attribute an error can be attached to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  UserId,
  PlanId,
  PayDay,
  TaxId,
  Address,
  Number,
  ZipCode,
  City,
  Province,
  District,
  Country,
  /// Failures of the payment gateway itself rather than of one input.
  OpsError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
  Blank,
  Invalid,
  Taken,
  Message(String),
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Blank => f.write_str("can't be blank"),
      Self::Invalid => f.write_str("is invalid"),
      Self::Taken => f.write_str("has already been taken"),
      Self::Message(msg) => f.write_str(msg),
    }
  }
}

impl Serialize for FieldError {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Errors collected while validating or persisting one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, Vec<FieldError>>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, field: Field, error: FieldError) {
    self.0.entry(field).or_default().push(error);
  }

  /// Record a [`FieldError::Blank`] when `value` is empty or whitespace.
  pub fn require(&mut self, field: Field, value: &str) {
    if value.trim().is_empty() {
      self.add(field, FieldError::Blank);
    }
  }

  pub fn on(&self, field: Field) -> &[FieldError] {
    self.0.get(&field).map(Vec::as_slice).unwrap_or_default()
  }

  /// Total number of messages across all fields.
  pub fn len(&self) -> usize { self.0.values().map(Vec::len).sum() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
    self.0.keys().copied()
  }

  /// `Ok(())` when nothing was recorded.
  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, errors) in &self.0 {
      for error in errors {
        if !first {
          f.write_str(", ")?;
        }
        write!(f, "{field} {error}")?;
        first = false;
      }
    }
    Ok(())
  }
}

impl From<(Field, FieldError)> for ValidationErrors {
  fn from((field, error): (Field, FieldError)) -> Self {
    let mut errors = Self::new();
    errors.add(field, error);
    errors
  }
}
