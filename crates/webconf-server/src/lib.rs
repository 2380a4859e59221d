//! HTTP server wiring for webconf.
//!
//! Mounts the operator API under `/api` behind HTTP Basic auth, and provides
//! the HTTP clients for the Iugu payment gateway and the BigBlueButton
//! conferencing server.

pub mod auth;
pub mod bigbluebutton;
pub mod error;
pub mod iugu;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use webconf_core::{
  conference::ConferenceServer, gateway::PaymentGateway, store::SubscriptionStore,
};

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  pub iugu:               IuguConfig,
  pub bigbluebutton:      BigBlueButtonConfig,
}

#[derive(Deserialize, Clone)]
pub struct IuguConfig {
  #[serde(default = "default_iugu_url")]
  pub base_url:  String,
  pub api_token: String,
}

fn default_iugu_url() -> String { "https://api.iugu.com/v1".to_owned() }

#[derive(Deserialize, Clone)]
pub struct BigBlueButtonConfig {
  /// Server base URL, up to and excluding `/api`.
  pub url:    String,
  /// Shared secret used to sign API calls.
  pub secret: String,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`]: the operator API under `/api`,
/// guarded by Basic auth, with request tracing.
pub fn router<S, G, C>(
  auth: Arc<AuthConfig>,
  store: Arc<S>,
  gateway: Arc<G>,
  conference: Arc<C>,
) -> Router
where
  S: SubscriptionStore + 'static,
  G: PaymentGateway + 'static,
  C: ConferenceServer + 'static,
{
  let api = webconf_api::api_router(store, gateway, conference)
    .layer(middleware::from_fn_with_state(auth, require_auth));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
