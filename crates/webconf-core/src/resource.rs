//! Resources: the things an actor acts upon.
//!
//! Every variant carries the ownership and visibility attributes the ability
//! rules inspect. Membership sets (space members and admins, profile fellows)
//! are resolved by the caller before evaluation, so evaluating a rule never
//! touches storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The discriminant of [`Resource`]; rules are grouped by kind.
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
pub enum ResourceKind {
  Room,
  Recording,
  User,
  Profile,
  PrivateMessage,
  Space,
  Post,
  News,
  Event,
  Attachment,
  Permission,
}

// ─── Spaces ──────────────────────────────────────────────────────────────────

/// A collaboration space with its resolved member and admin sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
  pub id:         Uuid,
  pub public:     bool,
  /// Whether the file repository (attachments) is enabled.
  pub repository: bool,
  #[serde(default)]
  pub members:    BTreeSet<Uuid>,
  #[serde(default)]
  pub admins:     BTreeSet<Uuid>,
}

// ─── Conferencing ────────────────────────────────────────────────────────────

/// Who owns a conferencing room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomOwner {
  User { id: Uuid },
  Space(Space),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
  pub id:    Uuid,
  pub owner: Option<RoomOwner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
  pub id:   Uuid,
  /// `None` when the room the recording was made in no longer exists.
  pub room: Option<Room>,
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
  pub id:       Uuid,
  pub disabled: bool,
}

/// Who may see a profile. The stored value is an index into this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
  Everybody,
  Members,
  PublicFellows,
  PrivateFellows,
  Nobody,
}

impl Visibility {
  /// Decode a stored visibility index. Values outside the known range yield
  /// `None`.
  pub fn from_index(index: i32) -> Option<Self> {
    match index {
      0 => Some(Self::Everybody),
      1 => Some(Self::Members),
      2 => Some(Self::PublicFellows),
      3 => Some(Self::PrivateFellows),
      4 => Some(Self::Nobody),
      _ => None,
    }
  }

  pub fn index(self) -> i32 {
    match self {
      Self::Everybody => 0,
      Self::Members => 1,
      Self::PublicFellows => 2,
      Self::PrivateFellows => 3,
      Self::Nobody => 4,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:         Uuid,
  /// Raw index as stored; see [`Visibility::from_index`].
  pub visibility:      i32,
  #[serde(default)]
  pub public_fellows:  BTreeSet<Uuid>,
  #[serde(default)]
  pub private_fellows: BTreeSet<Uuid>,
}

impl Profile {
  pub fn visibility(&self) -> Option<Visibility> {
    Visibility::from_index(self.visibility)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
  pub id:          Uuid,
  pub sender_id:   Uuid,
  pub receiver_id: Uuid,
}

// ─── Space content ───────────────────────────────────────────────────────────

/// A post, news item, event or attachment living inside a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceContent {
  pub id:        Uuid,
  pub author_id: Option<Uuid>,
  pub space:     Space,
}

// ─── Permissions ─────────────────────────────────────────────────────────────

/// What a permission grants a role on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionSubject {
  Space(Space),
  Event(SpaceContent),
  /// Any other subject type; it has no admins.
  Other { subject_type: String },
}

impl PermissionSubject {
  /// Accounts allowed to manage permissions on this subject.
  pub fn admins(&self) -> BTreeSet<Uuid> {
    match self {
      Self::Space(space) => space.admins.clone(),
      Self::Event(event) => event.space.admins.clone(),
      Self::Other { .. } => BTreeSet::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub id:      Uuid,
  pub user_id: Uuid,
  pub subject: PermissionSubject,
}

// ─── Resource ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
  Room(Room),
  Recording(Recording),
  User(UserAccount),
  Profile(Profile),
  PrivateMessage(PrivateMessage),
  Space(Space),
  Post(SpaceContent),
  News(SpaceContent),
  Event(SpaceContent),
  Attachment(SpaceContent),
  Permission(Permission),
}

impl Resource {
  pub fn kind(&self) -> ResourceKind {
    match self {
      Self::Room(_) => ResourceKind::Room,
      Self::Recording(_) => ResourceKind::Recording,
      Self::User(_) => ResourceKind::User,
      Self::Profile(_) => ResourceKind::Profile,
      Self::PrivateMessage(_) => ResourceKind::PrivateMessage,
      Self::Space(_) => ResourceKind::Space,
      Self::Post(_) => ResourceKind::Post,
      Self::News(_) => ResourceKind::News,
      Self::Event(_) => ResourceKind::Event,
      Self::Attachment(_) => ResourceKind::Attachment,
      Self::Permission(_) => ResourceKind::Permission,
    }
  }

  /// The space this resource lives in, for content kinds.
  pub fn space(&self) -> Option<&Space> {
    match self {
      Self::Space(space) => Some(space),
      Self::Post(c) | Self::News(c) | Self::Event(c) | Self::Attachment(c) => {
        Some(&c.space)
      }
      _ => None,
    }
  }

  /// The author of space content, when known.
  pub fn author_id(&self) -> Option<Uuid> {
    match self {
      Self::Post(c) | Self::News(c) | Self::Event(c) | Self::Attachment(c) => {
        c.author_id
      }
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn visibility_index_round_trips() {
    for v in Visibility::iter() {
      assert_eq!(Visibility::from_index(v.index()), Some(v));
    }
    assert_eq!(Visibility::from_index(5), None);
    assert_eq!(Visibility::from_index(-1), None);
  }

  #[test]
  fn resource_json_is_tagged_by_kind() {
    let json = serde_json::json!({
      "kind": "private_message",
      "id": Uuid::nil(),
      "sender_id": Uuid::nil(),
      "receiver_id": Uuid::nil(),
    });
    let resource: Resource = serde_json::from_value(json).unwrap();
    assert_eq!(resource.kind(), ResourceKind::PrivateMessage);
  }

  #[test]
  fn other_permission_subject_has_no_admins() {
    let subject = PermissionSubject::Other { subject_type: "Site".into() };
    assert!(subject.admins().is_empty());
  }
}
