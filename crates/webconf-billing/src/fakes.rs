//! Hand-written gateway and conferencing doubles that record their calls.

use std::sync::Mutex;

use webconf_core::{
  conference::{ConferenceServer, StatsResponse},
  gateway::{
    CustomerDetails, CustomerToken, CustomerUpdate, InvalidFields, InvoiceItem,
    PaymentGateway,
  },
  subscription::BillingAddress,
};

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
pub struct Unreachable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  CreateCustomer { email: String },
  CreateSubscription {
    plan_identifier: String,
    customer_token:  String,
    pay_day:         u8,
  },
  UpdateCustomer { customer_token: String, city: String },
  DestroySubscription { token: String },
  DestroyCustomer { token: String },
  AddInvoiceItem { token: String, item: InvoiceItem },
}

struct Script {
  reachable:            bool,
  customer:             Option<CustomerToken>,
  subscription:         Option<String>,
  update:               CustomerUpdate,
  destroy_subscription: bool,
  destroy_customer:     bool,
  invoice:              bool,
}

pub struct FakeGateway {
  script: Mutex<Script>,
  calls:  Mutex<Vec<Call>>,
}

impl FakeGateway {
  /// Issues `CUST-1` / `SUB-1` and accepts every other call.
  pub fn accepting() -> Self {
    Self {
      script: Mutex::new(Script {
        reachable:            true,
        customer:             Some(CustomerToken::Issued("CUST-1".into())),
        subscription:         Some("SUB-1".into()),
        update:               CustomerUpdate::Updated,
        destroy_subscription: true,
        destroy_customer:     true,
        invoice:              true,
      }),
      calls:  Mutex::new(Vec::new()),
    }
  }

  /// Every call fails at the transport level.
  pub fn unreachable() -> Self {
    let gateway = Self::accepting();
    gateway.script.lock().unwrap().reachable = false;
    gateway
  }

  pub fn rejecting_customer(self, fields: InvalidFields) -> Self {
    self.script.lock().unwrap().customer = Some(CustomerToken::Rejected(fields));
    self
  }

  pub fn without_customer_token(self) -> Self {
    self.script.lock().unwrap().customer = None;
    self
  }

  pub fn without_subscription_token(self) -> Self {
    self.script.lock().unwrap().subscription = None;
    self
  }

  pub fn set_update(&self, update: CustomerUpdate) {
    self.script.lock().unwrap().update = update;
  }

  pub fn set_destroy_subscription(&self, ok: bool) {
    self.script.lock().unwrap().destroy_subscription = ok;
  }

  pub fn set_destroy_customer(&self, ok: bool) {
    self.script.lock().unwrap().destroy_customer = ok;
  }

  pub fn set_invoice(&self, ok: bool) { self.script.lock().unwrap().invoice = ok; }

  pub fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

  fn record<T>(
    &self,
    call: Call,
    answer: impl FnOnce(&Script) -> T,
  ) -> Result<T, Unreachable> {
    self.calls.lock().unwrap().push(call);
    let script = self.script.lock().unwrap();
    if script.reachable { Ok(answer(&script)) } else { Err(Unreachable) }
  }
}

impl PaymentGateway for FakeGateway {
  type Error = Unreachable;

  async fn create_customer(
    &self,
    customer: CustomerDetails<'_>,
  ) -> Result<Option<CustomerToken>, Unreachable> {
    self.record(
      Call::CreateCustomer { email: customer.email.into() },
      |s| s.customer.clone(),
    )
  }

  async fn create_subscription(
    &self,
    plan_identifier: &str,
    customer_token: &str,
    pay_day: u8,
  ) -> Result<Option<String>, Unreachable> {
    self.record(
      Call::CreateSubscription {
        plan_identifier: plan_identifier.into(),
        customer_token: customer_token.into(),
        pay_day,
      },
      |s| s.subscription.clone(),
    )
  }

  async fn update_customer(
    &self,
    customer_token: &str,
    billing: &BillingAddress,
  ) -> Result<CustomerUpdate, Unreachable> {
    self.record(
      Call::UpdateCustomer {
        customer_token: customer_token.into(),
        city:           billing.city.clone(),
      },
      |s| s.update,
    )
  }

  async fn destroy_subscription(&self, token: &str) -> Result<bool, Unreachable> {
    self.record(Call::DestroySubscription { token: token.into() }, |s| {
      s.destroy_subscription
    })
  }

  async fn destroy_customer(&self, token: &str) -> Result<bool, Unreachable> {
    self.record(Call::DestroyCustomer { token: token.into() }, |s| s.destroy_customer)
  }

  async fn add_invoice_item(
    &self,
    token: &str,
    item: &InvoiceItem,
  ) -> Result<bool, Unreachable> {
    self.record(
      Call::AddInvoiceItem { token: token.into(), item: item.clone() },
      |s| s.invoice,
    )
  }
}

/// Serves a fixed stats answer and records the meeting ids asked for.
pub struct FakeConference {
  answer:    Result<Option<StatsResponse>, ()>,
  requested: Mutex<Vec<String>>,
}

impl FakeConference {
  pub fn with_stats(stats: StatsResponse) -> Self {
    Self { answer: Ok(Some(stats)), requested: Mutex::new(Vec::new()) }
  }

  pub fn empty() -> Self { Self { answer: Ok(None), requested: Mutex::new(Vec::new()) } }

  pub fn unreachable() -> Self {
    Self { answer: Err(()), requested: Mutex::new(Vec::new()) }
  }

  pub fn requested(&self) -> Vec<String> { self.requested.lock().unwrap().clone() }
}

impl ConferenceServer for FakeConference {
  type Error = Unreachable;

  async fn get_stats(
    &self,
    meeting_id: &str,
  ) -> Result<Option<StatsResponse>, Unreachable> {
    self.requested.lock().unwrap().push(meeting_id.to_owned());
    self.answer.clone().map_err(|()| Unreachable)
  }
}
