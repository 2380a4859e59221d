//! Monthly usage billing.
//!
//! Usage is the number of distinct participant names seen in the
//! subscriber's room during the last calendar month. The count picks a
//! price tier; the resulting item is appended to the subscription's next
//! gateway invoice.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Months, Utc};
use webconf_core::{
  conference::{ConferenceServer, StatsResponse},
  gateway::{InvoiceItem, OpsType, PaymentGateway},
  store::SubscriptionStore,
  subscription::{Plan, Subscription},
};

use crate::UsageError;

pub const MINIMUM_FEE: &str = "Minimum fee";
pub const USER_FEE: &str = "User fee";

// ─── Tiers ───────────────────────────────────────────────────────────────────

/// Price bands by distinct participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
  /// Fewer than 15 participants: a flat fee.
  Minimum,
  From15,
  From250,
  From500,
  From1000,
  From2500,
  Above5000,
}

impl Tier {
  /// The band for `participants`. Exactly 5000 falls in none.
  pub fn for_count(participants: u32) -> Option<Self> {
    match participants {
      0..15 => Some(Self::Minimum),
      15..250 => Some(Self::From15),
      250..500 => Some(Self::From250),
      500..1000 => Some(Self::From500),
      1000..2500 => Some(Self::From1000),
      2500..5000 => Some(Self::From2500),
      5000 => None,
      _ => Some(Self::Above5000),
    }
  }

  /// Unit price in cents.
  pub fn price_cents(self) -> u32 {
    match self {
      Self::Minimum => 9000,
      Self::From15 => 600,
      Self::From250 => 540,
      Self::From500 => 480,
      Self::From1000 => 420,
      Self::From2500 => 360,
      Self::Above5000 => 300,
    }
  }

  pub fn item(self, participants: u32) -> InvoiceItem {
    let (description, quantity) = match self {
      Self::Minimum => (MINIMUM_FEE, 1),
      _ => (USER_FEE, participants),
    };
    InvoiceItem {
      description: description.to_owned(),
      price_cents: self.price_cents(),
      quantity,
    }
  }
}

// ─── Counting ────────────────────────────────────────────────────────────────

/// Start of the billing window: one calendar month before `now`, in whole
/// seconds since the epoch.
pub fn cutoff_secs(now: DateTime<Utc>) -> i64 {
  now
    .checked_sub_months(Months::new(1))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
    .timestamp()
}

/// Distinct participant names across meetings that started at or after
/// `cutoff_secs`. Names are compared exactly.
pub fn count_participants(stats: StatsResponse, cutoff_secs: i64) -> u32 {
  let names: HashSet<String> = stats
    .stats
    .meeting
    .into_vec()
    .into_iter()
    .filter(|m| m.epoch_start_time.div_euclid(1000) >= cutoff_secs)
    .flat_map(|m| m.participants.participant.into_vec())
    .map(|p| p.user_name)
    .collect();
  u32::try_from(names.len()).unwrap_or(u32::MAX)
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

/// Computes the usage invoice item for a subscription.
pub struct UsageAggregator<C> {
  conference: Arc<C>,
}

impl<C> Clone for UsageAggregator<C> {
  fn clone(&self) -> Self { Self { conference: Arc::clone(&self.conference) } }
}

impl<C: ConferenceServer> UsageAggregator<C> {
  pub fn new(conference: Arc<C>) -> Self { Self { conference } }

  /// The item to bill for the month before `now`.
  ///
  /// `Ok(None)` when the plan's gateway is unsupported or the count falls in
  /// no tier. Stats are fetched first either way; a room with no meetings
  /// at all is a [`UsageError::StatsFetch`].
  pub async fn compute_invoice_item(
    &self,
    subscription: &Subscription,
    plan: &Plan,
    now: DateTime<Utc>,
  ) -> Result<Option<InvoiceItem>, UsageError> {
    let meeting_id = &subscription.subscriber.meeting_id;
    let stats = match self.conference.get_stats(meeting_id).await {
      Ok(Some(stats)) => stats,
      Ok(None) => {
        tracing::error!(%meeting_id, "get_stats API call has failed");
        return Err(UsageError::StatsFetch(format!("no stats for {meeting_id}")));
      }
      Err(e) => {
        tracing::error!(%meeting_id, error = %e, "get_stats API call has failed");
        return Err(UsageError::StatsFetch(e.to_string()));
      }
    };

    if stats.stats.meeting.is_empty() {
      tracing::error!(%meeting_id, "get_stats returned no meetings");
      return Err(UsageError::StatsFetch(format!("no meetings for {meeting_id}")));
    }

    let participants = count_participants(stats, cutoff_secs(now));
    tracing::debug!(
      subscription_id = %subscription.subscription_id,
      participants,
      "usage counted"
    );

    if OpsType::parse(&plan.ops_type).is_none() {
      return Ok(None);
    }
    let Some(tier) = Tier::for_count(participants) else {
      tracing::warn!(
        subscription_id = %subscription.subscription_id,
        participants,
        "participant count matches no price tier; nothing billed"
      );
      return Ok(None);
    };
    Ok(Some(tier.item(participants)))
  }
}

// ─── Posting ─────────────────────────────────────────────────────────────────

/// Tally of one [`UsageBilling::invoice_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceRun {
  pub posted:  usize,
  pub skipped: usize,
  pub failed:  usize,
}

/// Computes usage items and appends them to gateway invoices.
pub struct UsageBilling<C, G> {
  aggregator: UsageAggregator<C>,
  gateway:    Arc<G>,
}

impl<C, G> Clone for UsageBilling<C, G> {
  fn clone(&self) -> Self {
    Self { aggregator: self.aggregator.clone(), gateway: Arc::clone(&self.gateway) }
  }
}

impl<C, G> UsageBilling<C, G>
where
  C: ConferenceServer,
  G: PaymentGateway,
{
  pub fn new(conference: Arc<C>, gateway: Arc<G>) -> Self {
    Self { aggregator: UsageAggregator::new(conference), gateway }
  }

  pub fn aggregator(&self) -> &UsageAggregator<C> { &self.aggregator }

  /// Compute the month's item and post it. Returns the posted item, or
  /// `None` when there was nothing to bill.
  pub async fn create_invoice(
    &self,
    subscription: &Subscription,
    plan: &Plan,
    now: DateTime<Utc>,
  ) -> Result<Option<InvoiceItem>, UsageError> {
    let Some(item) = self
      .aggregator
      .compute_invoice_item(subscription, plan, now)
      .await?
    else {
      return Ok(None);
    };

    let Some(token) = subscription.subscription_token.as_deref() else {
      return Err(UsageError::Gateway("subscription has no gateway token".into()));
    };
    let posted = match self.gateway.add_invoice_item(token, &item).await {
      Ok(posted) => posted,
      Err(e) => {
        tracing::warn!(error = %e, "add_invoice_item failed");
        false
      }
    };
    if !posted {
      return Err(UsageError::Gateway("invoice item was not accepted".into()));
    }

    tracing::info!(
      subscription_id = %subscription.subscription_id,
      description = %item.description,
      price_cents = item.price_cents,
      quantity = item.quantity,
      "invoice item posted"
    );
    Ok(Some(item))
  }

  /// Bill every stored subscription, continuing past individual failures.
  pub async fn invoice_all<S: SubscriptionStore>(
    &self,
    store: &S,
    now: DateTime<Utc>,
  ) -> Result<InvoiceRun, S::Error> {
    let mut run = InvoiceRun::default();
    for subscription in store.list_subscriptions().await? {
      let Some(plan) = store.get_plan(subscription.plan_id).await? else {
        tracing::error!(
          subscription_id = %subscription.subscription_id,
          plan_id = %subscription.plan_id,
          "plan missing; subscription not billed"
        );
        run.failed += 1;
        continue;
      };
      match self.create_invoice(&subscription, &plan, now).await {
        Ok(Some(_)) => run.posted += 1,
        Ok(None) => run.skipped += 1,
        Err(e) => {
          tracing::error!(
            subscription_id = %subscription.subscription_id,
            error = %e,
            "invoice failed"
          );
          run.failed += 1;
        }
      }
    }
    tracing::info!(
      posted = run.posted,
      skipped = run.skipped,
      failed = run.failed,
      "invoice run finished"
    );
    Ok(run)
  }
}
