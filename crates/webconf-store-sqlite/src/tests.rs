//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone as _, Utc};
use uuid::Uuid;
use webconf_core::{
  store::{StoreTransaction as _, SubscriptionStore},
  subscription::{
    BillingAddress, NewPlan, Plan, Subscriber, Subscription, SubscriptionStatus,
  },
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn plan(s: &SqliteStore) -> Plan {
  s.add_plan(NewPlan {
    name:       "Basic".into(),
    ops_type:   "IUGU".into(),
    identifier: "basic_monthly".into(),
  })
  .await
  .unwrap()
}

fn subscription(plan_id: Uuid, user_id: Uuid) -> Subscription {
  let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
  Subscription {
    subscription_id:    Uuid::new_v4(),
    plan_id,
    subscriber:         Subscriber {
      user_id,
      email:      "ana@example.com".into(),
      full_name:  "Ana Souza".into(),
      meeting_id: "ana-room".into(),
    },
    billing:            BillingAddress {
      tax_id:                  "123.456.789-09".into(),
      address:                 "Rua das Flores".into(),
      additional_address_info: Some("apto 3".into()),
      number:                  "42".into(),
      zip_code:                "90000-000".into(),
      city:                    "Porto Alegre".into(),
      province:                "RS".into(),
      district:                "Centro".into(),
      country:                 "Brasil".into(),
    },
    pay_day:            10,
    customer_token:     Some("CUST".into()),
    subscription_token: Some("SUB".into()),
    status:             SubscriptionStatus::Active,
    created_at:         now,
    updated_at:         now,
  }
}

async fn insert_committed(s: &SqliteStore, sub: &Subscription) {
  let mut tx = s.begin().await.unwrap();
  tx.insert_subscription(sub).await.unwrap();
  tx.commit().await.unwrap();
}

// ─── Plans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_plan() {
  let s = store().await;
  let p = plan(&s).await;

  let fetched = s.get_plan(p.plan_id).await.unwrap();
  assert_eq!(fetched, Some(p));
}

#[tokio::test]
async fn get_plan_missing_returns_none() {
  let s = store().await;
  assert!(s.get_plan(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn committed_insert_is_visible() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());

  insert_committed(&s, &sub).await;

  let fetched = s.get_subscription(sub.subscription_id).await.unwrap();
  assert_eq!(fetched, Some(sub.clone()));

  let by_user = s
    .find_subscription_by_user(sub.subscriber.user_id)
    .await
    .unwrap();
  assert_eq!(by_user.map(|x| x.subscription_id), Some(sub.subscription_id));
}

#[tokio::test]
async fn rollback_discards_insert() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());

  let mut tx = s.begin().await.unwrap();
  tx.insert_subscription(&sub).await.unwrap();
  tx.rollback().await.unwrap();

  assert!(s.get_subscription(sub.subscription_id).await.unwrap().is_none());
  assert!(s.list_subscriptions().await.unwrap().is_empty());
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());

  {
    let mut tx = s.begin().await.unwrap();
    tx.insert_subscription(&sub).await.unwrap();
  }

  // The next writer waits for the background rollback to release the lock.
  let tx = s.begin().await.unwrap();
  tx.commit().await.unwrap();

  assert!(s.get_subscription(sub.subscription_id).await.unwrap().is_none());
}

#[tokio::test]
async fn second_subscription_for_user_is_rejected() {
  let s = store().await;
  let p = plan(&s).await;
  let user = Uuid::new_v4();
  insert_committed(&s, &subscription(p.plan_id, user)).await;

  let mut tx = s.begin().await.unwrap();
  let err = tx
    .insert_subscription(&subscription(p.plan_id, user))
    .await
    .unwrap_err();
  tx.rollback().await.unwrap();

  assert!(matches!(err, Error::DuplicateSubscriber(id) if id == user));
  assert_eq!(s.list_subscriptions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn insert_with_unknown_plan_is_rejected() {
  let s = store().await;
  let missing = Uuid::new_v4();

  let mut tx = s.begin().await.unwrap();
  let err = tx
    .insert_subscription(&subscription(missing, Uuid::new_v4()))
    .await
    .unwrap_err();
  tx.rollback().await.unwrap();

  assert!(matches!(err, Error::PlanNotFound(id) if id == missing));
}

#[tokio::test]
async fn update_replaces_billing_and_tokens() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());
  insert_committed(&s, &sub).await;

  let mut changed = sub.clone();
  changed.billing.city = "Pelotas".into();
  changed.billing.additional_address_info = None;
  changed.pay_day = 20;
  changed.updated_at = Utc.with_ymd_and_hms(2024, 4, 1, 8, 30, 0).unwrap();

  let mut tx = s.begin().await.unwrap();
  tx.update_subscription(&changed).await.unwrap();
  tx.commit().await.unwrap();

  let fetched = s
    .get_subscription(sub.subscription_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, changed);
  assert_eq!(fetched.created_at, sub.created_at);
}

#[tokio::test]
async fn update_missing_subscription_fails() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());

  let mut tx = s.begin().await.unwrap();
  let err = tx.update_subscription(&sub).await.unwrap_err();
  tx.rollback().await.unwrap();

  assert!(matches!(err, Error::SubscriptionNotFound(_)));
}

#[tokio::test]
async fn delete_removes_row() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());
  insert_committed(&s, &sub).await;

  let mut tx = s.begin().await.unwrap();
  tx.delete_subscription(sub.subscription_id).await.unwrap();
  tx.commit().await.unwrap();

  assert!(s.get_subscription(sub.subscription_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_then_rollback_keeps_row() {
  let s = store().await;
  let p = plan(&s).await;
  let sub = subscription(p.plan_id, Uuid::new_v4());
  insert_committed(&s, &sub).await;

  let mut tx = s.begin().await.unwrap();
  tx.delete_subscription(sub.subscription_id).await.unwrap();
  tx.rollback().await.unwrap();

  assert!(s.get_subscription(sub.subscription_id).await.unwrap().is_some());
}

#[tokio::test]
async fn list_orders_by_creation() {
  let s = store().await;
  let p = plan(&s).await;

  let mut first = subscription(p.plan_id, Uuid::new_v4());
  first.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
  let second = subscription(p.plan_id, Uuid::new_v4());

  insert_committed(&s, &second).await;
  insert_committed(&s, &first).await;

  let ids: Vec<_> = s
    .list_subscriptions()
    .await
    .unwrap()
    .into_iter()
    .map(|x| x.subscription_id)
    .collect();
  assert_eq!(ids, [first.subscription_id, second.subscription_id]);
}

#[tokio::test]
async fn open_on_disk_persists_across_reopen() {
  let dir = std::env::temp_dir().join(format!("webconf-store-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("webconf.db");

  let plan_id = {
    let s = SqliteStore::open(&path).await.unwrap();
    plan(&s).await.plan_id
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get_plan(plan_id).await.unwrap().is_some());

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}
