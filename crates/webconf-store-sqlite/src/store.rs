//! [`SqliteStore`]: the SQLite implementation of [`SubscriptionStore`].

use std::{path::Path, sync::Arc};

use rusqlite::{OptionalExtension as _, ffi};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use webconf_core::{
  store::{StoreTransaction, SubscriptionStore},
  subscription::{NewPlan, Plan, Subscription},
};

use crate::{
  Error, Result,
  encode::{
    PLAN_COLUMNS, RawPlan, RawSubscription, SUBSCRIPTION_COLUMNS,
    SubscriptionParams, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A webconf subscription store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one writer lock, so at most one [`SqliteTransaction`] is open at a
/// time.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  writer: Arc<Mutex<()>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn, writer: Arc::new(Mutex::new(())) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_subscriptions(
    &self,
    filter: &'static str,
    arg: Option<String>,
  ) -> Result<Vec<Subscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions {filter} \
           ORDER BY created_at, subscription_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
          Some(arg) => stmt
            .query_map(rusqlite::params![arg], RawSubscription::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawSubscription::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }
}

impl SubscriptionStore for SqliteStore {
  type Error = Error;
  type Transaction = SqliteTransaction;

  // ── Plans ─────────────────────────────────────────────────────────────────

  async fn add_plan(&self, plan: NewPlan) -> Result<Plan> {
    let plan = Plan {
      plan_id:    Uuid::new_v4(),
      name:       plan.name,
      ops_type:   plan.ops_type,
      identifier: plan.identifier,
    };

    let id_str = encode_uuid(plan.plan_id);
    let name = plan.name.clone();
    let ops_type = plan.ops_type.clone();
    let identifier = plan.identifier.clone();

    // Statements issued while a transaction is open would join it.
    let _writer = self.writer.lock().await;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plans (plan_id, name, ops_type, identifier)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, ops_type, identifier],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(plan_id = %plan.plan_id, ops_type = %plan.ops_type, "plan added");
    Ok(plan)
  }

  async fn get_plan(&self, id: Uuid) -> Result<Option<Plan>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM plans WHERE plan_id = ?1"),
            rusqlite::params![id_str],
            RawPlan::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawPlan::into_plan).transpose()
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
    let mut found = self
      .query_subscriptions("WHERE subscription_id = ?1", Some(encode_uuid(id)))
      .await?;
    Ok(found.pop())
  }

  async fn find_subscription_by_user(
    &self,
    user_id: Uuid,
  ) -> Result<Option<Subscription>> {
    let mut found = self
      .query_subscriptions("WHERE user_id = ?1", Some(encode_uuid(user_id)))
      .await?;
    Ok(found.pop())
  }

  async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
    self.query_subscriptions("", None).await
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn begin(&self) -> Result<SqliteTransaction> {
    let guard = Arc::clone(&self.writer).lock_owned().await;
    self
      .conn
      .call(|conn| {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
      })
      .await?;

    tracing::trace!("transaction opened");
    Ok(SqliteTransaction {
      conn:     self.conn.clone(),
      guard:    Some(guard),
      finished: false,
    })
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// An open `BEGIN IMMEDIATE` transaction holding the store's writer lock.
///
/// Dropping it without calling `commit` or `rollback` rolls back on a
/// background task, releasing the lock once the rollback has run.
pub struct SqliteTransaction {
  conn:     tokio_rusqlite::Connection,
  guard:    Option<OwnedMutexGuard<()>>,
  finished: bool,
}

enum InsertOutcome {
  Inserted,
  DuplicateSubscriber,
  MissingPlan,
}

impl SqliteTransaction {
  async fn finish(mut self, statement: &'static str) -> Result<()> {
    self.finished = true;
    let result = self
      .conn
      .call(move |conn| {
        conn.execute_batch(statement)?;
        Ok(())
      })
      .await;
    // Release the writer lock only after the statement has run.
    self.guard.take();
    result?;
    tracing::trace!(statement, "transaction closed");
    Ok(())
  }
}

impl StoreTransaction for SqliteTransaction {
  type Error = Error;

  async fn insert_subscription(&mut self, subscription: &Subscription) -> Result<()> {
    let p = SubscriptionParams::encode(subscription);

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          &format!(
            "INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                     ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
          ),
          rusqlite::params![
            p.subscription_id,
            p.plan_id,
            p.user_id,
            p.email,
            p.full_name,
            p.meeting_id,
            p.tax_id,
            p.address,
            p.additional_address_info,
            p.number,
            p.zip_code,
            p.city,
            p.province,
            p.district,
            p.country,
            p.pay_day,
            p.customer_token,
            p.subscription_token,
            p.status,
            p.created_at,
            p.updated_at,
          ],
        );
        match inserted {
          Ok(_) => Ok(InsertOutcome::Inserted),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
          {
            Ok(InsertOutcome::DuplicateSubscriber)
          }
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
          {
            Ok(InsertOutcome::MissingPlan)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted => Ok(()),
      InsertOutcome::DuplicateSubscriber => {
        Err(Error::DuplicateSubscriber(subscription.subscriber.user_id))
      }
      InsertOutcome::MissingPlan => Err(Error::PlanNotFound(subscription.plan_id)),
    }
  }

  async fn update_subscription(&mut self, subscription: &Subscription) -> Result<()> {
    let p = SubscriptionParams::encode(subscription);

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE subscriptions SET
             plan_id = ?2, user_id = ?3, email = ?4, full_name = ?5,
             meeting_id = ?6, tax_id = ?7, address = ?8,
             additional_address_info = ?9, number = ?10, zip_code = ?11,
             city = ?12, province = ?13, district = ?14, country = ?15,
             pay_day = ?16, customer_token = ?17, subscription_token = ?18,
             status = ?19, updated_at = ?20
           WHERE subscription_id = ?1",
          rusqlite::params![
            p.subscription_id,
            p.plan_id,
            p.user_id,
            p.email,
            p.full_name,
            p.meeting_id,
            p.tax_id,
            p.address,
            p.additional_address_info,
            p.number,
            p.zip_code,
            p.city,
            p.province,
            p.district,
            p.country,
            p.pay_day,
            p.customer_token,
            p.subscription_token,
            p.status,
            p.updated_at,
          ],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SubscriptionNotFound(subscription.subscription_id));
    }
    Ok(())
  }

  async fn delete_subscription(&mut self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM subscriptions WHERE subscription_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n)
      })
      .await?;

    if removed == 0 {
      return Err(Error::SubscriptionNotFound(id));
    }
    Ok(())
  }

  async fn commit(self) -> Result<()> { self.finish("COMMIT").await }

  async fn rollback(self) -> Result<()> { self.finish("ROLLBACK").await }
}

impl Drop for SqliteTransaction {
  fn drop(&mut self) {
    if self.finished {
      return;
    }
    let guard = self.guard.take();
    let conn = self.conn.clone();
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        tracing::warn!("transaction dropped while open; rolling back");
        handle.spawn(async move {
          let result = conn
            .call(|conn| {
              conn.execute_batch("ROLLBACK")?;
              Ok(())
            })
            .await;
          if let Err(e) = result {
            tracing::error!(error = %e, "rollback of dropped transaction failed");
          }
          drop(guard);
        });
      }
      Err(_) => {
        tracing::error!("transaction dropped outside a runtime; left open");
      }
    }
  }
}
