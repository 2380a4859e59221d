//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings; UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use webconf_core::subscription::{
  BillingAddress, Plan, Subscriber, Subscription, SubscriptionStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Plans ───────────────────────────────────────────────────────────────────

pub const PLAN_COLUMNS: &str = "plan_id, name, ops_type, identifier";

pub struct RawPlan {
  pub plan_id:    String,
  pub name:       String,
  pub ops_type:   String,
  pub identifier: String,
}

impl RawPlan {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:    row.get(0)?,
      name:       row.get(1)?,
      ops_type:   row.get(2)?,
      identifier: row.get(3)?,
    })
  }

  pub fn into_plan(self) -> Result<Plan> {
    Ok(Plan {
      plan_id:    decode_uuid(&self.plan_id)?,
      name:       self.name,
      ops_type:   self.ops_type,
      identifier: self.identifier,
    })
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

pub const SUBSCRIPTION_COLUMNS: &str = "
  subscription_id, plan_id, user_id, email, full_name, meeting_id,
  tax_id, address, additional_address_info, number, zip_code,
  city, province, district, country,
  pay_day, customer_token, subscription_token, status,
  created_at, updated_at";

/// A subscription row exactly as read from SQLite.
pub struct RawSubscription {
  pub subscription_id:         String,
  pub plan_id:                 String,
  pub user_id:                 String,
  pub email:                   String,
  pub full_name:               String,
  pub meeting_id:              String,
  pub tax_id:                  String,
  pub address:                 String,
  pub additional_address_info: Option<String>,
  pub number:                  String,
  pub zip_code:                String,
  pub city:                    String,
  pub province:                String,
  pub district:                String,
  pub country:                 String,
  pub pay_day:                 i64,
  pub customer_token:          Option<String>,
  pub subscription_token:      Option<String>,
  pub status:                  String,
  pub created_at:              String,
  pub updated_at:              String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id:         row.get(0)?,
      plan_id:                 row.get(1)?,
      user_id:                 row.get(2)?,
      email:                   row.get(3)?,
      full_name:               row.get(4)?,
      meeting_id:              row.get(5)?,
      tax_id:                  row.get(6)?,
      address:                 row.get(7)?,
      additional_address_info: row.get(8)?,
      number:                  row.get(9)?,
      zip_code:                row.get(10)?,
      city:                    row.get(11)?,
      province:                row.get(12)?,
      district:                row.get(13)?,
      country:                 row.get(14)?,
      pay_day:                 row.get(15)?,
      customer_token:          row.get(16)?,
      subscription_token:      row.get(17)?,
      status:                  row.get(18)?,
      created_at:              row.get(19)?,
      updated_at:              row.get(20)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    let pay_day = u8::try_from(self.pay_day)
      .map_err(|_| Error::Decode(format!("pay_day out of range: {}", self.pay_day)))?;

    Ok(Subscription {
      subscription_id:    decode_uuid(&self.subscription_id)?,
      plan_id:            decode_uuid(&self.plan_id)?,
      subscriber:         Subscriber {
        user_id:    decode_uuid(&self.user_id)?,
        email:      self.email,
        full_name:  self.full_name,
        meeting_id: self.meeting_id,
      },
      billing:            BillingAddress {
        tax_id:                  self.tax_id,
        address:                 self.address,
        additional_address_info: self.additional_address_info,
        number:                  self.number,
        zip_code:                self.zip_code,
        city:                    self.city,
        province:                self.province,
        district:                self.district,
        country:                 self.country,
      },
      pay_day,
      customer_token:     self.customer_token,
      subscription_token: self.subscription_token,
      status:             SubscriptionStatus::parse(&self.status)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Owned column values for INSERT/UPDATE, in [`SUBSCRIPTION_COLUMNS`] order.
pub struct SubscriptionParams {
  pub subscription_id:         String,
  pub plan_id:                 String,
  pub user_id:                 String,
  pub email:                   String,
  pub full_name:               String,
  pub meeting_id:              String,
  pub tax_id:                  String,
  pub address:                 String,
  pub additional_address_info: Option<String>,
  pub number:                  String,
  pub zip_code:                String,
  pub city:                    String,
  pub province:                String,
  pub district:                String,
  pub country:                 String,
  pub pay_day:                 i64,
  pub customer_token:          Option<String>,
  pub subscription_token:      Option<String>,
  pub status:                  String,
  pub created_at:              String,
  pub updated_at:              String,
}

impl SubscriptionParams {
  pub fn encode(sub: &Subscription) -> Self {
    Self {
      subscription_id:         encode_uuid(sub.subscription_id),
      plan_id:                 encode_uuid(sub.plan_id),
      user_id:                 encode_uuid(sub.subscriber.user_id),
      email:                   sub.subscriber.email.clone(),
      full_name:               sub.subscriber.full_name.clone(),
      meeting_id:              sub.subscriber.meeting_id.clone(),
      tax_id:                  sub.billing.tax_id.clone(),
      address:                 sub.billing.address.clone(),
      additional_address_info: sub.billing.additional_address_info.clone(),
      number:                  sub.billing.number.clone(),
      zip_code:                sub.billing.zip_code.clone(),
      city:                    sub.billing.city.clone(),
      province:                sub.billing.province.clone(),
      district:                sub.billing.district.clone(),
      country:                 sub.billing.country.clone(),
      pay_day:                 i64::from(sub.pay_day),
      customer_token:          sub.customer_token.clone(),
      subscription_token:      sub.subscription_token.clone(),
      status:                  sub.status.to_string(),
      created_at:              encode_dt(sub.created_at),
      updated_at:              encode_dt(sub.updated_at),
    }
  }
}
