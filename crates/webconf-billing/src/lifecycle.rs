//! Create, update and destroy subscriptions against the local store and the
//! payment gateway.
//!
//! Each transition opens a store transaction, talks to the gateway, and only
//! commits once the gateway has accepted the change. Any failure rolls the
//! local transaction back; remote side effects already made are not undone.

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use webconf_core::{
  gateway::{
    CustomerDetails, CustomerToken, CustomerUpdate, InvalidFields, OpsType,
    PaymentGateway,
  },
  store::{StoreTransaction, SubscriptionStore},
  subscription::{
    NewSubscription, Plan, Subscription, SubscriptionChanges, SubscriptionStatus,
  },
  validation::{Field, FieldError},
};

use crate::LifecycleError;

type Result<T, E = LifecycleError> = std::result::Result<T, E>;

const NO_TOKEN: &str = "No Token returned from IUGU, aborting";
const NO_UPDATE: &str = "Could not update IUGU, aborting";
const NO_SUBSCRIPTION_DELETE: &str = "Could not delete subscription from OPS, aborting";
const NO_CUSTOMER_DELETE: &str = "Could not delete customer from OPS, aborting";

/// Drives subscription state changes through a store and a gateway.
pub struct SubscriptionLifecycle<S, G> {
  store:   Arc<S>,
  gateway: Arc<G>,
}

impl<S, G> Clone for SubscriptionLifecycle<S, G> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), gateway: Arc::clone(&self.gateway) }
  }
}

impl<S, G> SubscriptionLifecycle<S, G>
where
  S: SubscriptionStore,
  G: PaymentGateway,
{
  pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self { Self { store, gateway } }

  pub fn store(&self) -> &S { &self.store }

  // ─── Create ────────────────────────────────────────────────────────────────

  /// Open a remote customer and subscription, then persist the local row.
  ///
  /// Nothing is sent to the gateway unless validation passes and the plan
  /// is billed by a supported processor.
  pub async fn create(
    &self,
    new: NewSubscription,
    now: DateTime<Utc>,
  ) -> Result<Subscription> {
    let mut errors = new.validate().err().unwrap_or_default();
    let existing = self
      .store
      .find_subscription_by_user(new.subscriber.user_id)
      .await
      .map_err(LifecycleError::store)?;
    if existing.is_some() {
      errors.add(Field::UserId, FieldError::Taken);
    }
    errors.into_result().map_err(LifecycleError::Invalid)?;

    let plan = self.plan_for(new.plan_id).await?;
    if OpsType::parse(&plan.ops_type).is_none() {
      tracing::error!(ops_type = %plan.ops_type, "Bad ops_type, can't create customer");
      return Err(LifecycleError::UnsupportedGatewayType {
        ops_type:  plan.ops_type,
        operation: "create customer",
      });
    }

    let pending = new.into_pending(now);
    let user_id = pending.subscriber.user_id;
    let mut tx = self.store.begin().await.map_err(LifecycleError::store)?;

    let outcome: Result<Subscription> = async {
      // Another create for the same user may have committed while this one
      // waited for the writer lock.
      let taken = self
        .store
        .find_subscription_by_user(user_id)
        .await
        .map_err(LifecycleError::store)?;
      if taken.is_some() {
        return Err(LifecycleError::Invalid((Field::UserId, FieldError::Taken).into()));
      }
      let subscription = self.open_remote(&plan, pending).await?;
      tx.insert_subscription(&subscription)
        .await
        .map_err(LifecycleError::store)?;
      Ok::<_, LifecycleError>(subscription)
    }
    .await;

    let subscription = finish(tx, outcome).await?;
    tracing::info!(
      subscription_id = %subscription.subscription_id,
      user_id = %subscription.subscriber.user_id,
      plan_id = %plan.plan_id,
      "subscription created"
    );
    Ok(subscription)
  }

  async fn open_remote(
    &self,
    plan: &Plan,
    mut subscription: Subscription,
  ) -> Result<Subscription> {
    let customer = CustomerDetails {
      email:     &subscription.subscriber.email,
      full_name: &subscription.subscriber.full_name,
      billing:   &subscription.billing,
    };
    let created = self.gateway.create_customer(customer).await;
    let customer_token = match settle("create_customer", created).flatten() {
      Some(CustomerToken::Issued(token)) => token,
      Some(CustomerToken::Rejected(fields)) if fields.any() => {
        return Err(rejected(fields));
      }
      Some(CustomerToken::Rejected(_)) | None => {
        tracing::error!("{NO_TOKEN}");
        return Err(LifecycleError::Gateway(NO_TOKEN.into()));
      }
    };

    let created = self
      .gateway
      .create_subscription(&plan.identifier, &customer_token, subscription.pay_day)
      .await;
    let Some(subscription_token) = settle("create_subscription", created).flatten()
    else {
      // The remote customer stays behind; there is no compensating delete.
      tracing::warn!(
        customer_token = %customer_token,
        "remote subscription not created; remote customer left in place"
      );
      tracing::error!("{NO_TOKEN}");
      return Err(LifecycleError::Gateway(NO_TOKEN.into()));
    };

    subscription.customer_token = Some(customer_token);
    subscription.subscription_token = Some(subscription_token);
    subscription.status = SubscriptionStatus::Active;
    Ok(subscription)
  }

  // ─── Update ────────────────────────────────────────────────────────────────

  /// Push a new billing address and pay day to the gateway and store them.
  pub async fn update(
    &self,
    subscription_id: Uuid,
    changes: SubscriptionChanges,
    now: DateTime<Utc>,
  ) -> Result<Subscription> {
    let current = self.existing(subscription_id).await?;
    let updated = current
      .with_changes(changes, now)
      .map_err(LifecycleError::Invalid)?;

    let ops_type = self.ops_type_of(&current).await?;
    if OpsType::parse(&ops_type).is_none() {
      tracing::error!(%ops_type, "Bad ops_type, can't update customer");
      return Err(LifecycleError::UnsupportedGatewayType {
        ops_type,
        operation: "update customer",
      });
    }

    let mut tx = self.store.begin().await.map_err(LifecycleError::store)?;

    let outcome: Result<Subscription> = async {
      let Some(token) = updated.customer_token.as_deref() else {
        tracing::error!(%subscription_id, "no customer token; {NO_UPDATE}");
        return Err(LifecycleError::Gateway(NO_UPDATE.into()));
      };
      let result = self.gateway.update_customer(token, &updated.billing).await;
      match settle("update_customer", result) {
        Some(CustomerUpdate::Updated) => {}
        Some(CustomerUpdate::Rejected(fields)) if fields.any() => {
          return Err(rejected(fields));
        }
        Some(CustomerUpdate::Rejected(_)) => {}
        Some(CustomerUpdate::Failed) | None => {
          tracing::error!("{NO_UPDATE}");
          return Err(LifecycleError::Gateway(NO_UPDATE.into()));
        }
      }
      tx.update_subscription(&updated)
        .await
        .map_err(LifecycleError::store)?;
      Ok::<_, LifecycleError>(updated)
    }
    .await;

    let updated = finish(tx, outcome).await?;
    tracing::info!(%subscription_id, "subscription updated");
    Ok(updated)
  }

  // ─── Destroy ───────────────────────────────────────────────────────────────

  /// Cancel the remote subscription and customer, then delete the local row.
  ///
  /// Returns the removed subscription marked
  /// [`Terminated`](SubscriptionStatus::Terminated).
  pub async fn destroy(&self, subscription_id: Uuid) -> Result<Subscription> {
    let mut subscription = self.existing(subscription_id).await?;
    let ops_type = self.ops_type_of(&subscription).await?;

    let mut tx = self.store.begin().await.map_err(LifecycleError::store)?;

    let outcome: Result<()> = async {
      if OpsType::parse(&ops_type).is_some() {
        self.close_remote(&subscription).await?;
      } else {
        tracing::error!(%ops_type, %subscription_id, "Bad ops_type, can't destroy subscription");
      }
      tx.delete_subscription(subscription_id)
        .await
        .map_err(LifecycleError::store)
    }
    .await;

    finish(tx, outcome).await?;
    tracing::info!(%subscription_id, "subscription destroyed");
    subscription.status = SubscriptionStatus::Terminated;
    Ok(subscription)
  }

  async fn close_remote(&self, subscription: &Subscription) -> Result<()> {
    let removed = match subscription.subscription_token.as_deref() {
      Some(token) => {
        let result = self.gateway.destroy_subscription(token).await;
        settle("destroy_subscription", result).unwrap_or(false)
      }
      None => false,
    };
    if !removed {
      tracing::error!("{NO_SUBSCRIPTION_DELETE}");
      return Err(LifecycleError::Gateway(NO_SUBSCRIPTION_DELETE.into()));
    }

    let removed = match subscription.customer_token.as_deref() {
      Some(token) => {
        let result = self.gateway.destroy_customer(token).await;
        settle("destroy_customer", result).unwrap_or(false)
      }
      None => false,
    };
    if !removed {
      tracing::error!("{NO_CUSTOMER_DELETE}");
      return Err(LifecycleError::Gateway(NO_CUSTOMER_DELETE.into()));
    }
    Ok(())
  }

  // ─── Lookups ───────────────────────────────────────────────────────────────

  async fn existing(&self, subscription_id: Uuid) -> Result<Subscription> {
    self
      .store
      .get_subscription(subscription_id)
      .await
      .map_err(LifecycleError::store)?
      .ok_or(LifecycleError::NotFound(subscription_id))
  }

  async fn plan_for(&self, plan_id: Option<Uuid>) -> Result<Plan> {
    let Some(plan_id) = plan_id else {
      return Err(LifecycleError::Invalid((Field::PlanId, FieldError::Blank).into()));
    };
    self
      .store
      .get_plan(plan_id)
      .await
      .map_err(LifecycleError::store)?
      .ok_or_else(|| LifecycleError::Invalid((Field::PlanId, FieldError::Invalid).into()))
  }

  /// The `ops_type` of the subscription's plan; empty when the plan is gone.
  async fn ops_type_of(&self, subscription: &Subscription) -> Result<String> {
    let plan = self
      .store
      .get_plan(subscription.plan_id)
      .await
      .map_err(LifecycleError::store)?;
    Ok(plan.map(|p| p.ops_type).unwrap_or_default())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Commit on success, roll back on failure.
async fn finish<T, X>(tx: X, outcome: Result<T>) -> Result<T>
where
  X: StoreTransaction,
{
  match outcome {
    Ok(value) => {
      tx.commit().await.map_err(LifecycleError::store)?;
      Ok(value)
    }
    Err(err) => {
      if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "rollback failed");
      }
      Err(err)
    }
  }
}

/// Collapse a transport failure into "no result".
fn settle<T, E: Display>(call: &'static str, result: Result<T, E>) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(e) => {
      tracing::warn!(call, error = %e, "payment gateway call failed");
      None
    }
  }
}

fn rejected(fields: InvalidFields) -> LifecycleError {
  match (fields.tax_id, fields.zip_code) {
    (true, true) => LifecycleError::TaxIdAndZipCodeInvalid,
    (true, false) => LifecycleError::TaxIdInvalid,
    _ => LifecycleError::ZipCodeInvalid,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use webconf_core::gateway::InvalidFields;
  use webconf_core::subscription::{BillingAddress, NewPlan, Subscriber};
  use webconf_core::validation::ValidationErrors;
  use webconf_store_sqlite::SqliteStore;

  use super::*;
  use crate::fakes::{Call, FakeGateway};

  fn errors_of<T>(result: &Result<T>) -> ValidationErrors {
    result.as_ref().err().map(LifecycleError::errors).unwrap_or_default()
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap() }

  fn address() -> BillingAddress {
    BillingAddress {
      tax_id:                  "123.456.789-09".into(),
      address:                 "Rua das Flores".into(),
      additional_address_info: None,
      number:                  "42".into(),
      zip_code:                "90000-000".into(),
      city:                    "Porto Alegre".into(),
      province:                "RS".into(),
      district:                "Centro".into(),
      country:                 "Brasil".into(),
    }
  }

  fn new_subscription(plan_id: Uuid, user_id: Uuid) -> NewSubscription {
    NewSubscription {
      plan_id:    Some(plan_id),
      subscriber: Subscriber {
        user_id,
        email:      "ana@example.com".into(),
        full_name:  "Ana Souza".into(),
        meeting_id: "ana-room".into(),
      },
      billing:    address(),
      pay_day:    Some(10),
    }
  }

  struct Harness {
    store:     Arc<SqliteStore>,
    gateway:   Arc<FakeGateway>,
    lifecycle: SubscriptionLifecycle<SqliteStore, FakeGateway>,
    plan:      Plan,
  }

  async fn harness(ops_type: &str, gateway: FakeGateway) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let plan = store
      .add_plan(NewPlan {
        name:       "Basic".into(),
        ops_type:   ops_type.into(),
        identifier: "basic_monthly".into(),
      })
      .await
      .unwrap();
    let gateway = Arc::new(gateway);
    let lifecycle = SubscriptionLifecycle::new(Arc::clone(&store), Arc::clone(&gateway));
    Harness { store, gateway, lifecycle, plan }
  }

  async fn created(h: &Harness) -> Subscription {
    h.lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await
      .unwrap()
  }

  // ── Create ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_stores_active_row_with_tokens() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;

    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.customer_token.as_deref(), Some("CUST-1"));
    assert_eq!(sub.subscription_token.as_deref(), Some("SUB-1"));

    let stored = h.store.get_subscription(sub.subscription_id).await.unwrap();
    assert_eq!(stored, Some(sub));
    assert_eq!(
      h.gateway.calls(),
      [
        Call::CreateCustomer { email: "ana@example.com".into() },
        Call::CreateSubscription {
          plan_identifier: "basic_monthly".into(),
          customer_token:  "CUST-1".into(),
          pay_day:         10,
        },
      ]
    );
  }

  #[tokio::test]
  async fn create_with_blank_fields_makes_no_remote_call() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let mut new = new_subscription(h.plan.plan_id, Uuid::new_v4());
    new.billing.city = String::new();
    new.pay_day = None;

    let result = h.lifecycle.create(new, now()).await;
    let errors = errors_of(&result);
    assert_eq!(errors.on(Field::City), &[FieldError::Blank]);
    assert_eq!(errors.on(Field::PayDay), &[FieldError::Blank]);
    assert!(h.gateway.calls().is_empty());
  }

  #[tokio::test]
  async fn create_twice_for_same_user_is_taken() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let user = Uuid::new_v4();
    h.lifecycle
      .create(new_subscription(h.plan.plan_id, user), now())
      .await
      .unwrap();

    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, user), now())
      .await;
    assert_eq!(errors_of(&result).on(Field::UserId), &[FieldError::Taken]);
    assert_eq!(h.store.list_subscriptions().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn create_with_unknown_plan_is_invalid() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let result = h
      .lifecycle
      .create(new_subscription(Uuid::new_v4(), Uuid::new_v4()), now())
      .await;
    assert_eq!(errors_of(&result).on(Field::PlanId), &[FieldError::Invalid]);
    assert!(h.gateway.calls().is_empty());
  }

  #[tokio::test]
  async fn unsupported_ops_type_makes_no_remote_call() {
    let h = harness("PAYPAL", FakeGateway::accepting()).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;

    assert!(matches!(
      result,
      Err(LifecycleError::UnsupportedGatewayType { ref ops_type, .. }) if ops_type == "PAYPAL"
    ));
    assert!(h.gateway.calls().is_empty());
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn concurrent_creates_for_same_user_open_one_remote_customer() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let user = Uuid::new_v4();

    let (first, second) = tokio::join!(
      h.lifecycle.create(new_subscription(h.plan.plan_id, user), now()),
      h.lifecycle.create(new_subscription(h.plan.plan_id, user), now()),
    );

    let (ok, taken) = if first.is_ok() { (first, second) } else { (second, first) };
    assert!(ok.is_ok());
    assert_eq!(errors_of(&taken).on(Field::UserId), &[FieldError::Taken]);
    assert_eq!(h.store.list_subscriptions().await.unwrap().len(), 1);
    let customers = h
      .gateway
      .calls()
      .into_iter()
      .filter(|c| matches!(c, Call::CreateCustomer { .. }))
      .count();
    assert_eq!(customers, 1);
  }

  #[tokio::test]
  async fn double_marker_yields_two_errors_and_no_row() {
    let gateway = FakeGateway::accepting().rejecting_customer(InvalidFields {
      tax_id:   true,
      zip_code: true,
    });
    let h = harness("IUGU", gateway).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;

    assert!(matches!(result, Err(LifecycleError::TaxIdAndZipCodeInvalid)));
    let errors = errors_of(&result);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.on(Field::TaxId), &[FieldError::Invalid]);
    assert_eq!(errors.on(Field::ZipCode), &[FieldError::Invalid]);
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn single_marker_maps_to_its_field() {
    let gateway = FakeGateway::accepting().rejecting_customer(InvalidFields {
      tax_id:   false,
      zip_code: true,
    });
    let h = harness("IUGU", gateway).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;
    assert!(matches!(result, Err(LifecycleError::ZipCodeInvalid)));
    assert_eq!(errors_of(&result).fields().collect::<Vec<_>>(), [Field::ZipCode]);
  }

  #[tokio::test]
  async fn missing_customer_token_aborts() {
    let h = harness("IUGU", FakeGateway::accepting().without_customer_token()).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;
    assert_eq!(
      errors_of(&result).on(Field::OpsError),
      &[FieldError::Message(NO_TOKEN.into())]
    );
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn transport_failure_counts_as_no_token() {
    let h = harness("IUGU", FakeGateway::unreachable()).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;
    assert!(matches!(result, Err(LifecycleError::Gateway(_))));
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn failed_remote_subscription_leaves_remote_customer() {
    let h = harness("IUGU", FakeGateway::accepting().without_subscription_token()).await;
    let result = h
      .lifecycle
      .create(new_subscription(h.plan.plan_id, Uuid::new_v4()), now())
      .await;

    assert!(matches!(result, Err(LifecycleError::Gateway(_))));
    assert!(h.store.list_subscriptions().await.unwrap().is_empty());
    assert!(
      !h.gateway
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DestroyCustomer { .. }))
    );
  }

  // ── Update ────────────────────────────────────────────────────────────────

  fn changes(city: &str) -> SubscriptionChanges {
    SubscriptionChanges {
      billing: BillingAddress { city: city.into(), ..address() },
      pay_day: Some(20),
    }
  }

  #[tokio::test]
  async fn update_pushes_address_and_persists() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;

    let later = now() + chrono::Duration::days(3);
    let updated = h
      .lifecycle
      .update(sub.subscription_id, changes("Pelotas"), later)
      .await
      .unwrap();
    assert_eq!(updated.billing.city, "Pelotas");
    assert_eq!(updated.pay_day, 20);
    assert_eq!(updated.updated_at, later);

    let stored = h
      .store
      .get_subscription(sub.subscription_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored, updated);
    assert!(h.gateway.calls().contains(&Call::UpdateCustomer {
      customer_token: "CUST-1".into(),
      city:           "Pelotas".into(),
    }));
  }

  #[tokio::test]
  async fn update_refused_keeps_previous_row() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    h.gateway.set_update(CustomerUpdate::Failed);

    let result = h
      .lifecycle
      .update(sub.subscription_id, changes("Pelotas"), now())
      .await;
    assert_eq!(
      errors_of(&result).on(Field::OpsError),
      &[FieldError::Message(NO_UPDATE.into())]
    );
    let stored = h.store.get_subscription(sub.subscription_id).await.unwrap();
    assert_eq!(stored, Some(sub));
  }

  #[tokio::test]
  async fn update_markers_become_field_errors() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    h.gateway.set_update(CustomerUpdate::Rejected(InvalidFields {
      tax_id:   true,
      zip_code: false,
    }));

    let result = h
      .lifecycle
      .update(sub.subscription_id, changes("Pelotas"), now())
      .await;
    assert!(matches!(result, Err(LifecycleError::TaxIdInvalid)));
  }

  #[tokio::test]
  async fn update_rejection_without_markers_is_accepted() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    h.gateway.set_update(CustomerUpdate::Rejected(InvalidFields::default()));

    let updated = h
      .lifecycle
      .update(sub.subscription_id, changes("Pelotas"), now())
      .await
      .unwrap();
    assert_eq!(updated.billing.city, "Pelotas");
  }

  #[tokio::test]
  async fn update_validates_before_calling_gateway() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    let before = h.gateway.calls().len();

    let result = h
      .lifecycle
      .update(sub.subscription_id, changes(""), now())
      .await;
    assert_eq!(errors_of(&result).on(Field::City), &[FieldError::Blank]);
    assert_eq!(h.gateway.calls().len(), before);
  }

  #[tokio::test]
  async fn update_missing_subscription_is_not_found() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let id = Uuid::new_v4();
    let result = h.lifecycle.update(id, changes("Pelotas"), now()).await;
    assert!(matches!(result, Err(LifecycleError::NotFound(missing)) if missing == id));
  }

  #[tokio::test]
  async fn update_with_unsupported_type_makes_no_remote_call() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let other = h
      .store
      .add_plan(NewPlan {
        name:       "Legacy".into(),
        ops_type:   "PAYPAL".into(),
        identifier: "legacy".into(),
      })
      .await
      .unwrap();

    let mut sub = new_subscription(other.plan_id, Uuid::new_v4()).into_pending(now());
    sub.status = SubscriptionStatus::Active;
    sub.customer_token = Some("CUST-9".into());
    let mut tx = h.store.begin().await.unwrap();
    tx.insert_subscription(&sub).await.unwrap();
    tx.commit().await.unwrap();

    let result = h
      .lifecycle
      .update(sub.subscription_id, changes("Pelotas"), now())
      .await;
    assert!(matches!(
      result,
      Err(LifecycleError::UnsupportedGatewayType { ref ops_type, .. }) if ops_type == "PAYPAL"
    ));
    assert!(h.gateway.calls().is_empty());
    let stored = h.store.get_subscription(sub.subscription_id).await.unwrap();
    assert_eq!(stored, Some(sub));
  }

  // ── Destroy ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn destroy_removes_remote_then_local() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;

    let removed = h.lifecycle.destroy(sub.subscription_id).await.unwrap();
    assert_eq!(removed.status, SubscriptionStatus::Terminated);
    assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_none());

    let calls = h.gateway.calls();
    assert_eq!(
      &calls[calls.len() - 2..],
      [
        Call::DestroySubscription { token: "SUB-1".into() },
        Call::DestroyCustomer { token: "CUST-1".into() },
      ]
    );
  }

  #[tokio::test]
  async fn destroy_refused_keeps_row() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    h.gateway.set_destroy_subscription(false);

    let result = h.lifecycle.destroy(sub.subscription_id).await;
    assert_eq!(
      errors_of(&result).on(Field::OpsError),
      &[FieldError::Message(NO_SUBSCRIPTION_DELETE.into())]
    );
    assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_some());
    assert!(
      !h.gateway
        .calls()
        .iter()
        .any(|c| matches!(c, Call::DestroyCustomer { .. }))
    );
  }

  #[tokio::test]
  async fn destroy_customer_refused_keeps_row() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let sub = created(&h).await;
    h.gateway.set_destroy_customer(false);

    let result = h.lifecycle.destroy(sub.subscription_id).await;
    assert!(matches!(result, Err(LifecycleError::Gateway(ref m)) if m == NO_CUSTOMER_DELETE));
    assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn destroy_with_unsupported_type_deletes_locally() {
    let h = harness("IUGU", FakeGateway::accepting()).await;
    let other = h
      .store
      .add_plan(NewPlan {
        name:       "Legacy".into(),
        ops_type:   "PAYPAL".into(),
        identifier: "legacy".into(),
      })
      .await
      .unwrap();

    // Rows for unsupported plans can only come from outside the lifecycle.
    let mut sub = new_subscription(other.plan_id, Uuid::new_v4()).into_pending(now());
    sub.status = SubscriptionStatus::Active;
    let mut tx = h.store.begin().await.unwrap();
    tx.insert_subscription(&sub).await.unwrap();
    tx.commit().await.unwrap();

    h.lifecycle.destroy(sub.subscription_id).await.unwrap();
    assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_none());
    assert!(h.gateway.calls().is_empty());
  }
}
