//! Plans and subscriptions.
//!
//! A subscription ties one account to a plan and mirrors a customer and a
//! subscription record held by the payment gateway. The tokens for both are
//! stored locally; a subscription never exists locally without them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  validation::{Field, FieldError, ValidationErrors},
};

// ─── Plans ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
  pub plan_id:    Uuid,
  pub name:       String,
  /// Which payment gateway bills this plan.
  pub ops_type:   String,
  /// The plan's id on the payment gateway.
  pub identifier: String,
}

/// Input to [`crate::store::SubscriptionStore::add_plan`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
  pub name:       String,
  pub ops_type:   String,
  pub identifier: String,
}

// ─── Billing details ─────────────────────────────────────────────────────────

/// The account a subscription bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
  pub user_id:    Uuid,
  pub email:      String,
  pub full_name:  String,
  /// Meeting id of the account's own conferencing room; usage is measured
  /// there.
  pub meeting_id: String,
}

/// Billing address and tax identity, as sent to the payment gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
  /// CPF or CNPJ.
  pub tax_id:                  String,
  pub address:                 String,
  #[serde(default)]
  pub additional_address_info: Option<String>,
  pub number:                  String,
  pub zip_code:                String,
  pub city:                    String,
  pub province:                String,
  pub district:                String,
  pub country:                 String,
}

impl BillingAddress {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    errors.require(Field::TaxId, &self.tax_id);
    errors.require(Field::Address, &self.address);
    errors.require(Field::Number, &self.number);
    errors.require(Field::ZipCode, &self.zip_code);
    errors.require(Field::City, &self.city);
    errors.require(Field::Province, &self.province);
    errors.require(Field::District, &self.district);
    errors.require(Field::Country, &self.country);
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
  /// Validated locally, not yet confirmed by the gateway.
  Pending,
  Active,
  /// Removed from the gateway and from the local store.
  Terminated,
}

impl SubscriptionStatus {
  /// Decode the stored string form.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id:    Uuid,
  pub plan_id:            Uuid,
  pub subscriber:         Subscriber,
  pub billing:            BillingAddress,
  /// Day of the month the gateway charges on.
  pub pay_day:            u8,
  pub customer_token:     Option<String>,
  pub subscription_token: Option<String>,
  pub status:             SubscriptionStatus,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// Input to the create flow. Optional fields are required; they are
/// optional here only so that absence is reported as a validation error.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscription {
  pub plan_id:    Option<Uuid>,
  pub subscriber: Subscriber,
  pub billing:    BillingAddress,
  pub pay_day:    Option<u8>,
}

impl NewSubscription {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if self.plan_id.is_none() {
      errors.add(Field::PlanId, FieldError::Blank);
    }
    if self.pay_day.is_none() {
      errors.add(Field::PayDay, FieldError::Blank);
    }
    self.billing.validate_into(&mut errors);
    errors.into_result()
  }

  /// Build the not-yet-confirmed subscription. Callers must have validated
  /// first; missing values fall back to defaults.
  pub fn into_pending(self, now: DateTime<Utc>) -> Subscription {
    Subscription {
      subscription_id:    Uuid::new_v4(),
      plan_id:            self.plan_id.unwrap_or_default(),
      subscriber:         self.subscriber,
      billing:            self.billing,
      pay_day:            self.pay_day.unwrap_or_default(),
      customer_token:     None,
      subscription_token: None,
      status:             SubscriptionStatus::Pending,
      created_at:         now,
      updated_at:         now,
    }
  }
}

/// Input to the update flow.
///
/// Name and email changes belong to the account, not the subscription, and
/// are never sent to the gateway from here.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionChanges {
  pub billing: BillingAddress,
  #[serde(default)]
  pub pay_day: Option<u8>,
}

impl Subscription {
  /// Apply `changes` to a copy of this subscription and validate the result.
  pub fn with_changes(
    &self,
    changes: SubscriptionChanges,
    now: DateTime<Utc>,
  ) -> Result<Subscription, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    changes.billing.validate_into(&mut errors);
    errors.into_result()?;

    Ok(Subscription {
      billing: changes.billing,
      pay_day: changes.pay_day.unwrap_or(self.pay_day),
      updated_at: now,
      ..self.clone()
    })
  }
}
