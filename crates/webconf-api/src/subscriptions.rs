//! Handlers for `/subscriptions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subscriptions` | All stored subscriptions |
//! | `POST`   | `/subscriptions` | Opens customer + subscription on the gateway |
//! | `GET`    | `/subscriptions/:id` | 404 if not found |
//! | `PUT`    | `/subscriptions/:id` | Billing address and pay day only |
//! | `DELETE` | `/subscriptions/:id` | Cancels on the gateway, then deletes |
//! | `POST`   | `/subscriptions/:id/invoice` | Posts last month's usage item |
//!
//! Rejected transitions answer `422` with `{"errors": {field: [messages]}}`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use webconf_core::{
  conference::ConferenceServer,
  gateway::{InvoiceItem, PaymentGateway},
  store::SubscriptionStore,
  subscription::{NewSubscription, Subscription, SubscriptionChanges},
};

use crate::{AppState, error::ApiError};

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /subscriptions`
pub async fn list<S, G, C>(
  State(state): State<AppState<S, G, C>>,
) -> Result<Json<Vec<Subscription>>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let subscriptions = state
    .store
    .list_subscriptions()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subscriptions))
}

/// `GET /subscriptions/:id`
pub async fn get_one<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  find(&state, id).await.map(Json)
}

async fn find<S, G, C>(state: &AppState<S, G, C>, id: Uuid) -> Result<Subscription, ApiError>
where
  S: SubscriptionStore,
{
  state
    .store
    .get_subscription(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subscription {id}")))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// `POST /subscriptions`
pub async fn create<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Json(body): Json<NewSubscription>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let subscription = state.lifecycle.create(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(subscription)))
}

/// `PUT /subscriptions/:id`
pub async fn update<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SubscriptionChanges>,
) -> Result<Json<Subscription>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let subscription = state.lifecycle.update(id, body, Utc::now()).await?;
  Ok(Json(subscription))
}

/// `DELETE /subscriptions/:id`: returns the removed subscription.
pub async fn destroy<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let subscription = state.lifecycle.destroy(id).await?;
  Ok(Json(subscription))
}

// ─── Invoice ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
  /// `null` when nothing was billed.
  pub item: Option<InvoiceItem>,
}

/// `POST /subscriptions/:id/invoice`
pub async fn invoice<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let subscription = find(&state, id).await?;
  let plan = state
    .store
    .get_plan(subscription.plan_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("plan {}", subscription.plan_id)))?;

  let item = state
    .billing
    .create_invoice(&subscription, &plan, Utc::now())
    .await?;
  Ok(Json(InvoiceResponse { item }))
}
