//! [`PaymentGateway`] over the Iugu REST API.
//!
//! Requests are JSON, authenticated with the account's API token as the
//! Basic-auth username. Field-level refusals come back as
//! `{"errors": {"cpf_cnpj": [..], "zip_code": [..]}}`.

use std::time::Duration;

use chrono::{Datelike as _, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use webconf_core::{
  gateway::{
    CustomerDetails, CustomerToken, CustomerUpdate, InvalidFields, InvoiceItem,
    PaymentGateway,
  },
  subscription::BillingAddress,
};

use crate::IuguConfig;

#[derive(Debug, Error)]
pub enum IuguError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Iugu client. Cheap to clone; the inner [`reqwest::Client`] is
/// `Arc`-based.
#[derive(Clone)]
pub struct IuguClient {
  client: Client,
  config: IuguConfig,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CustomerBody<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  email:      Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  name:       Option<&'a str>,
  cpf_cnpj:   &'a str,
  zip_code:   &'a str,
  number:     &'a str,
  street:     &'a str,
  city:       &'a str,
  state:      &'a str,
  district:   &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  complement: Option<&'a str>,
  /// Sent when opening a customer; updates leave it unchanged.
  #[serde(skip_serializing_if = "Option::is_none")]
  country:    Option<&'a str>,
}

impl<'a> CustomerBody<'a> {
  fn address(billing: &'a BillingAddress) -> Self {
    Self {
      email:      None,
      name:       None,
      cpf_cnpj:   &billing.tax_id,
      zip_code:   &billing.zip_code,
      number:     &billing.number,
      street:     &billing.address,
      city:       &billing.city,
      state:      &billing.province,
      district:   &billing.district,
      complement: billing.additional_address_info.as_deref(),
      country:    None,
    }
  }
}

#[derive(Debug, Serialize)]
struct SubscriptionBody<'a> {
  plan_identifier: &'a str,
  customer_id:     &'a str,
  expires_at:      String,
}

#[derive(Debug, Serialize)]
struct SubItem<'a> {
  description: &'a str,
  price_cents: u32,
  quantity:    u32,
  recurrent:   bool,
}

#[derive(Debug, Serialize)]
struct SubItemsBody<'a> {
  subitems: [SubItem<'a>; 1],
}

/// Either an object id or field errors.
#[derive(Debug, Default, Deserialize)]
struct Answer {
  id:     Option<String>,
  #[serde(default)]
  errors: Value,
}

impl Answer {
  fn invalid_fields(&self) -> InvalidFields {
    let flagged = |key: &str| {
      self
        .errors
        .get(key)
        .is_some_and(|v| !v.is_null() && v.as_array().is_none_or(|a| !a.is_empty()))
    };
    InvalidFields { tax_id: flagged("cpf_cnpj"), zip_code: flagged("zip_code") }
  }

  /// How a `PUT /customers/{id}` reply maps onto [`CustomerUpdate`]. Only
  /// tax id and zip code markers count as a field rejection; any other
  /// refusal is a failure.
  fn update_outcome(&self, success: bool) -> CustomerUpdate {
    let invalid = self.invalid_fields();
    if invalid.any() {
      return CustomerUpdate::Rejected(invalid);
    }
    if self.id.is_some() || success {
      CustomerUpdate::Updated
    } else {
      CustomerUpdate::Failed
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl IuguClient {
  pub fn new(config: IuguConfig) -> Result<Self, IuguError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    req.basic_auth(&self.config.api_token, Some(""))
  }

  /// Decode an id-or-errors body; an unreadable body decodes as empty.
  async fn answer(resp: Response) -> Answer {
    let status = resp.status();
    match resp.json::<Answer>().await {
      Ok(answer) => answer,
      Err(e) => {
        tracing::warn!(%status, error = %e, "unreadable iugu response");
        Answer::default()
      }
    }
  }

  async fn delete(&self, path: &str) -> Result<bool, IuguError> {
    let resp = self.auth(self.client.delete(self.url(path))).send().await?;
    if !resp.status().is_success() {
      tracing::warn!(status = %resp.status(), path, "iugu refused delete");
      return Ok(false);
    }
    Ok(true)
  }
}

/// The first date on or after tomorrow that falls on `pay_day`, clamped to
/// the last day of short months.
pub fn next_pay_date(today: NaiveDate, pay_day: u8) -> NaiveDate {
  let clamp = |year: i32, month: u32| {
    let day = u32::from(pay_day.max(1));
    (1..=day)
      .rev()
      .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
      .unwrap_or(today)
  };
  let this_month = clamp(today.year(), today.month());
  if this_month > today {
    return this_month;
  }
  let (year, month) = if today.month() == 12 {
    (today.year() + 1, 1)
  } else {
    (today.year(), today.month() + 1)
  };
  clamp(year, month)
}

impl PaymentGateway for IuguClient {
  type Error = IuguError;

  async fn create_customer(
    &self,
    customer: CustomerDetails<'_>,
  ) -> Result<Option<CustomerToken>, IuguError> {
    let body = CustomerBody {
      email: Some(customer.email),
      name: Some(customer.full_name),
      country: Some(customer.billing.country.as_str()),
      ..CustomerBody::address(customer.billing)
    };
    let resp = self
      .auth(self.client.post(self.url("/customers")))
      .json(&body)
      .send()
      .await?;
    let answer = Self::answer(resp).await;
    let invalid = answer.invalid_fields();

    if let Some(id) = answer.id {
      return Ok(Some(CustomerToken::Issued(id)));
    }
    if invalid.any() {
      return Ok(Some(CustomerToken::Rejected(invalid)));
    }
    tracing::error!(errors = %answer.errors, "iugu returned no customer id");
    Ok(None)
  }

  async fn create_subscription(
    &self,
    plan_identifier: &str,
    customer_token: &str,
    pay_day: u8,
  ) -> Result<Option<String>, IuguError> {
    let body = SubscriptionBody {
      plan_identifier,
      customer_id: customer_token,
      expires_at: next_pay_date(Utc::now().date_naive(), pay_day)
        .format("%Y-%m-%d")
        .to_string(),
    };
    let resp = self
      .auth(self.client.post(self.url("/subscriptions")))
      .json(&body)
      .send()
      .await?;
    let answer = Self::answer(resp).await;
    if answer.id.is_none() {
      tracing::error!(errors = %answer.errors, "iugu returned no subscription id");
    }
    Ok(answer.id)
  }

  async fn update_customer(
    &self,
    customer_token: &str,
    billing: &BillingAddress,
  ) -> Result<CustomerUpdate, IuguError> {
    let resp = self
      .auth(self.client.put(self.url(&format!("/customers/{customer_token}"))))
      .json(&CustomerBody::address(billing))
      .send()
      .await?;
    let success = resp.status().is_success();
    let answer = Self::answer(resp).await;
    let outcome = answer.update_outcome(success);
    if outcome == CustomerUpdate::Failed {
      tracing::warn!(errors = %answer.errors, "iugu refused customer update");
    }
    Ok(outcome)
  }

  async fn destroy_subscription(&self, subscription_token: &str) -> Result<bool, IuguError> {
    self.delete(&format!("/subscriptions/{subscription_token}")).await
  }

  async fn destroy_customer(&self, customer_token: &str) -> Result<bool, IuguError> {
    self.delete(&format!("/customers/{customer_token}")).await
  }

  async fn add_invoice_item(
    &self,
    subscription_token: &str,
    item: &InvoiceItem,
  ) -> Result<bool, IuguError> {
    let body = SubItemsBody {
      subitems: [SubItem {
        description: &item.description,
        price_cents: item.price_cents,
        quantity:    item.quantity,
        recurrent:   false,
      }],
    };
    let resp = self
      .auth(self.client.put(self.url(&format!("/subscriptions/{subscription_token}"))))
      .json(&body)
      .send()
      .await?;
    if !resp.status().is_success() {
      tracing::warn!(status = %resp.status(), "iugu refused invoice item");
      return Ok(false);
    }
    Ok(Self::answer(resp).await.id.is_some())
  }
}
