//! The payment gateway contract.
//!
//! Implementations talk to a remote payment processor. Only one processor
//! type is supported; plans name theirs in `ops_type`.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::subscription::BillingAddress;

/// `ops_type` value routed to the Iugu processor.
pub const IUGU: &str = "IUGU";

/// The payment processors this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpsType {
  #[serde(rename = "IUGU")]
  Iugu,
}

impl OpsType {
  /// Parse a plan's `ops_type`; matching is exact.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      IUGU => Some(Self::Iugu),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Iugu => IUGU,
    }
  }
}

// ─── Gateway responses ───────────────────────────────────────────────────────

/// Inputs the gateway rejected as malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidFields {
  pub tax_id:   bool,
  pub zip_code: bool,
}

impl InvalidFields {
  pub fn any(self) -> bool { self.tax_id || self.zip_code }
}

/// Result of creating a remote customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerToken {
  Issued(String),
  /// The gateway answered with field errors instead of a token.
  Rejected(InvalidFields),
}

/// Result of updating a remote customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerUpdate {
  Updated,
  Failed,
  /// The gateway answered with field errors. With no field flagged the
  /// update counts as accepted.
  Rejected(InvalidFields),
}

/// Everything the gateway needs to open a customer account.
#[derive(Debug, Clone, Copy)]
pub struct CustomerDetails<'a> {
  pub email:     &'a str,
  pub full_name: &'a str,
  pub billing:   &'a BillingAddress,
}

/// A charge appended to the next invoice of a remote subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
  pub description: String,
  /// Unit price in cents.
  pub price_cents: u32,
  pub quantity:    u32,
}

impl InvoiceItem {
  pub fn total_cents(&self) -> u64 {
    u64::from(self.price_cents) * u64::from(self.quantity)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Operations on the remote payment processor.
///
/// `Ok(None)` / `Ok(false)` mean the processor refused; `Err` means the call
/// itself failed. Callers treat both as "no result".
pub trait PaymentGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_customer<'a>(
    &'a self,
    customer: CustomerDetails<'a>,
  ) -> impl Future<Output = Result<Option<CustomerToken>, Self::Error>> + Send + 'a;

  /// Returns the remote subscription token.
  fn create_subscription<'a>(
    &'a self,
    plan_identifier: &'a str,
    customer_token: &'a str,
    pay_day: u8,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Push address and tax identity changes. Name and email are not sent.
  fn update_customer<'a>(
    &'a self,
    customer_token: &'a str,
    billing: &'a BillingAddress,
  ) -> impl Future<Output = Result<CustomerUpdate, Self::Error>> + Send + 'a;

  fn destroy_subscription<'a>(
    &'a self,
    subscription_token: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn destroy_customer<'a>(
    &'a self,
    customer_token: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn add_invoice_item<'a>(
    &'a self,
    subscription_token: &'a str,
    item: &'a InvoiceItem,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
