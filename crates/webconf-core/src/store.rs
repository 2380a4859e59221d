//! The `SubscriptionStore` trait and its transaction handle.
//!
//! Lifecycle flows open a transaction, talk to the payment gateway, and only
//! then commit. Whatever they wrote is rolled back if the gateway refuses.

use std::future::Future;

use uuid::Uuid;

use crate::subscription::{NewPlan, Plan, Subscription};

/// Local persistence for plans and subscriptions.
///
/// Reads go straight to the store; writes to subscriptions happen only
/// through a [`StoreTransaction`].
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Transaction: StoreTransaction<Error = Self::Error>;

  // ── Plans ─────────────────────────────────────────────────────────────

  fn add_plan(
    &self,
    plan: NewPlan,
  ) -> impl Future<Output = Result<Plan, Self::Error>> + Send + '_;

  fn get_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Plan>, Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  fn get_subscription(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  /// The subscription held by `user_id`; there is at most one.
  fn find_subscription_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  fn list_subscriptions(
    &self,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + '_;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Open a write transaction. Concurrent writers wait until the current one
  /// commits or rolls back.
  fn begin(
    &self,
  ) -> impl Future<Output = Result<Self::Transaction, Self::Error>> + Send + '_;
}

/// A unit of local atomicity. Must end in [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
pub trait StoreTransaction: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn insert_subscription<'a>(
    &'a mut self,
    subscription: &'a Subscription,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn update_subscription<'a>(
    &'a mut self,
    subscription: &'a Subscription,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn delete_subscription(
    &mut self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn commit(self) -> impl Future<Output = Result<(), Self::Error>> + Send;

  fn rollback(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
