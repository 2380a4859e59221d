//! Handlers for `/plans` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/plans` | Body: `{"name":..,"ops_type":"IUGU","identifier":..}` |
//! | `GET`  | `/plans/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use uuid::Uuid;
use webconf_core::{
  conference::ConferenceServer,
  gateway::PaymentGateway,
  store::SubscriptionStore,
  subscription::{NewPlan, Plan},
};

use crate::{AppState, error::ApiError};

/// `POST /plans`
pub async fn create<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Json(body): Json<NewPlan>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  let required = [
    ("name", &body.name),
    ("ops_type", &body.ops_type),
    ("identifier", &body.identifier),
  ];
  for (name, value) in required {
    if value.trim().is_empty() {
      return Err(ApiError::BadRequest(format!("{name} can't be blank")));
    }
  }
  let plan = state.store.add_plan(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(plan)))
}

/// `GET /plans/:id`
pub async fn get_one<S, G, C>(
  State(state): State<AppState<S, G, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Plan>, ApiError>
where
  S: SubscriptionStore,
  G: PaymentGateway,
  C: ConferenceServer,
{
  state
    .store
    .get_plan(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("plan {id}")))
}
