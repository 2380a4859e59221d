//! Actor: whoever is attempting an action.
//!
//! Accounts are created at registration and never deleted; admins disable
//! them instead. Anonymous visitors have no id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity evaluated by the ability rule sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:        Option<Uuid>,
  #[serde(default)]
  pub superuser: bool,
  #[serde(default)]
  pub anonymous: bool,
  #[serde(default)]
  pub disabled:  bool,
}

impl Actor {
  /// A visitor without an account.
  pub fn anonymous() -> Self {
    Self { id: None, superuser: false, anonymous: true, disabled: false }
  }

  /// A regular signed-in account.
  pub fn member(id: Uuid) -> Self {
    Self { id: Some(id), superuser: false, anonymous: false, disabled: false }
  }

  /// A signed-in account with global administration rights.
  pub fn superuser(id: Uuid) -> Self {
    Self { id: Some(id), superuser: true, anonymous: false, disabled: false }
  }

  /// Whether this actor is the account identified by `id`.
  ///
  /// Always `false` for anonymous visitors.
  pub fn is(&self, id: Uuid) -> bool { self.id == Some(id) }

  /// Whether `id` is contained in `set`, as seen from this actor.
  pub fn is_in<'a>(&self, mut set: impl Iterator<Item = &'a Uuid>) -> bool {
    match self.id {
      Some(me) => set.any(|id| *id == me),
      None => false,
    }
  }
}
