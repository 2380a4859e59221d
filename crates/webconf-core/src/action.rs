//! Actions an actor may attempt on a resource.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  // ── Generic ─────────────────────────────────────────────────────────────
  /// Wildcard: a rule granting `manage` covers every action.
  Manage,
  Read,
  Index,
  Show,
  Create,
  New,
  Update,
  Edit,
  Destroy,

  // ── Conferencing ────────────────────────────────────────────────────────
  CreateMeeting,
  End,
  JoinOptions,
  Invite,
  InviteUserid,
  Auth,
  Running,
  Join,
  External,
  ExternalAuth,
  JoinMobile,
  Play,

  // ── Accounts ────────────────────────────────────────────────────────────
  Fellows,
  Current,
  Select,

  // ── Spaces ──────────────────────────────────────────────────────────────
  Webconference,
  Leave,
  JoinRequestNew,
  JoinRequestCreate,
  JoinRequestUpdate,
  JoinRequestIndex,
  UserPermissions,
  ReplyPost,
}

impl Action {
  /// Whether a rule granting `self` also grants `requested`.
  ///
  /// `read` covers `index` and `show`, `create` covers `new`, `update`
  /// covers `edit`, and `manage` covers everything.
  pub fn covers(self, requested: Action) -> bool {
    match self {
      Self::Manage => true,
      Self::Read => {
        matches!(requested, Self::Read | Self::Index | Self::Show)
      }
      Self::Create => matches!(requested, Self::Create | Self::New),
      Self::Update => matches!(requested, Self::Update | Self::Edit),
      other => other == requested,
    }
  }
}
