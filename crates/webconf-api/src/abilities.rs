//! Handler for `/abilities/check`.
//!
//! Evaluation is pure: the caller supplies the actor and the resource with
//! its relationships already resolved.

use axum::Json;
use serde::{Deserialize, Serialize};
use webconf_core::{
  ability::{Ability, Decision, Role},
  action::Action,
  actor::Actor,
  resource::Resource,
};

#[derive(Debug, Deserialize)]
pub struct CheckBody {
  #[serde(default)]
  pub actor:    Actor,
  pub action:   Action,
  pub resource: Resource,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
  pub allowed:  bool,
  pub decision: Decision,
  pub role:     Role,
}

/// `POST /abilities/check`, body `{"actor":{..},"action":"show","resource":{"kind":..}}`
pub async fn check(Json(body): Json<CheckBody>) -> Json<CheckResponse> {
  let ability = Ability::for_actor(&body.actor);
  let allowed = ability.can(body.action, &body.resource);
  tracing::debug!(
    role = ?ability.role(),
    action = %body.action,
    kind = %body.resource.kind(),
    allowed,
    "ability checked"
  );
  Json(CheckResponse { allowed, decision: allowed.into(), role: ability.role() })
}
