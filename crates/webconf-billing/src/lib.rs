//! Subscription lifecycle and usage billing.
//!
//! [`SubscriptionLifecycle`] keeps the local store and the payment gateway in
//! step; [`UsageAggregator`] turns conferencing statistics into the monthly
//! invoice item and [`UsageBilling`] posts it.

pub mod error;
pub mod lifecycle;
pub mod usage;

pub use error::{LifecycleError, UsageError};
pub use lifecycle::SubscriptionLifecycle;
pub use usage::{InvoiceRun, Tier, UsageAggregator, UsageBilling};

#[cfg(test)]
mod fakes;
