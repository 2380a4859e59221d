//! JSON operator API for webconf.
//!
//! Exposes an axum [`Router`] over a [`SubscriptionStore`], a
//! [`PaymentGateway`] and a [`ConferenceServer`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", webconf_api::api_router(store, gateway, conference))
//! ```

pub mod abilities;
pub mod error;
pub mod plans;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use webconf_billing::{SubscriptionLifecycle, UsageBilling};
use webconf_core::{
  conference::ConferenceServer, gateway::PaymentGateway, store::SubscriptionStore,
};

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<S, G, C> {
  pub store:     Arc<S>,
  pub lifecycle: SubscriptionLifecycle<S, G>,
  pub billing:   UsageBilling<C, G>,
}

impl<S, G, C> Clone for AppState<S, G, C> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      lifecycle: self.lifecycle.clone(),
      billing:   self.billing.clone(),
    }
  }
}

impl<S, G, C> AppState<S, G, C>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  pub fn new(store: Arc<S>, gateway: Arc<G>, conference: Arc<C>) -> Self {
    Self {
      lifecycle: SubscriptionLifecycle::new(Arc::clone(&store), Arc::clone(&gateway)),
      billing: UsageBilling::new(conference, gateway),
      store,
    }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G, C>(
  store: Arc<S>,
  gateway: Arc<G>,
  conference: Arc<C>,
) -> Router<()>
where
  S: SubscriptionStore + 'static,
  G: PaymentGateway + 'static,
  C: ConferenceServer + 'static,
{
  Router::new()
    // Authorization
    .route("/abilities/check", post(abilities::check))
    // Plans
    .route("/plans", post(plans::create::<S, G, C>))
    .route("/plans/{id}", get(plans::get_one::<S, G, C>))
    // Subscriptions
    .route(
      "/subscriptions",
      get(subscriptions::list::<S, G, C>).post(subscriptions::create::<S, G, C>),
    )
    .route(
      "/subscriptions/{id}",
      get(subscriptions::get_one::<S, G, C>)
        .put(subscriptions::update::<S, G, C>)
        .delete(subscriptions::destroy::<S, G, C>),
    )
    .route("/subscriptions/{id}/invoice", post(subscriptions::invoice::<S, G, C>))
    .with_state(AppState::new(store, gateway, conference))
}
