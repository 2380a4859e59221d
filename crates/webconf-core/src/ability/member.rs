//! Rules for signed-in accounts.
//!
//! Several conferencing room actions only gate access here; the room
//! endpoints run their own finer checks (e.g. who may join which room).

use super::{Filter, Rule, RuleSet};
use crate::{
  action::Action,
  actor::Actor,
  resource::{Resource, ResourceKind as K, Room, RoomOwner, Visibility},
};

/// Whether `actor` may start a meeting in `room`: their own room, or the
/// room of a space they belong to.
pub fn can_create_meeting(actor: &Actor, room: &Room) -> bool {
  match &room.owner {
    Some(RoomOwner::User { id }) => actor.is(*id),
    Some(RoomOwner::Space(space)) => actor.is_in(space.members.iter()),
    None => false,
  }
}

fn owns_or_shares_room(actor: &Actor, resource: &Resource) -> bool {
  match resource {
    Resource::Room(room) => can_create_meeting(actor, room),
    _ => false,
  }
}

fn recording_visible(actor: &Actor, resource: &Resource) -> bool {
  let Resource::Recording(recording) = resource else { return false };
  match recording.room.as_ref().and_then(|room| room.owner.as_ref()) {
    Some(RoomOwner::User { id }) => actor.is(*id),
    Some(RoomOwner::Space(space)) => {
      space.public || actor.is_in(space.members.iter())
    }
    None => false,
  }
}

fn profile_visible(actor: &Actor, resource: &Resource) -> bool {
  let Resource::Profile(profile) = resource else { return false };
  match profile.visibility() {
    Some(Visibility::Everybody | Visibility::Members) => true,
    Some(Visibility::PublicFellows) => {
      actor.is_in(profile.public_fellows.iter())
    }
    Some(Visibility::PrivateFellows) => {
      actor.is_in(profile.private_fellows.iter())
    }
    Some(Visibility::Nobody) | None => false,
  }
}

fn message_party(actor: &Actor, resource: &Resource) -> bool {
  matches!(
    resource,
    Resource::PrivateMessage(m) if actor.is(m.sender_id) || actor.is(m.receiver_id)
  )
}

fn space_member(actor: &Actor, resource: &Resource) -> bool {
  resource.space().is_some_and(|s| actor.is_in(s.members.iter()))
}

fn space_admin(actor: &Actor, resource: &Resource) -> bool {
  resource.space().is_some_and(|s| actor.is_in(s.admins.iter()))
}

fn repository_disabled(_: &Actor, resource: &Resource) -> bool {
  resource.space().is_some_and(|s| !s.repository)
}

fn subject_admin(actor: &Actor, resource: &Resource) -> bool {
  match resource {
    Resource::Permission(p) => actor.is_in(p.subject.admins().iter()),
    _ => false,
  }
}

pub(super) fn rules() -> RuleSet {
  use Action::*;

  RuleSet::new([
    // ── Conferencing rooms ────────────────────────────────────────────────
    Rule::can(&[CreateMeeting, End, JoinOptions], K::Room)
      .when(owns_or_shares_room),
    Rule::can(
      &[
        Invite,
        InviteUserid,
        Auth,
        Running,
        Join,
        External,
        ExternalAuth,
        JoinMobile,
      ],
      K::Room,
    ),
    Rule::can(&[Show, Play], K::Recording).when(recording_visible),
    // ── Accounts ──────────────────────────────────────────────────────────
    // Disabled accounts are only visible to superusers.
    Rule::can(&[Read, Fellows, Current, Select], K::User)
      .with(Filter::NotDisabled),
    Rule::can(&[Update, Destroy], K::User)
      .with(Filter::IsActor)
      .with(Filter::NotDisabled),
    // A disabled actor loses self-service whatever the account record says.
    Rule::cannot(&[Read, Update, Destroy], K::User)
      .with(Filter::IsActor)
      .with(Filter::ActorDisabled),
    Rule::can(&[Read], K::Profile).when(profile_visible),
    Rule::can(&[Read, Update], K::Profile).with(Filter::OwnProfile),
    // ── Private messages ──────────────────────────────────────────────────
    Rule::can(&[Create], K::PrivateMessage),
    Rule::can(&[Read], K::PrivateMessage).when(message_party),
    Rule::can(&[Destroy], K::PrivateMessage).when(message_party),
    // ── Spaces ────────────────────────────────────────────────────────────
    Rule::can(&[Create], K::Space),
    Rule::can(&[Read, Webconference], K::Space).with(Filter::SpacePublic),
    Rule::can(&[JoinRequestNew], K::Space),
    Rule::can(&[JoinRequestCreate], K::Space),
    Rule::can(&[Read, Webconference, Leave], K::Space).when(space_member),
    Rule::can(
      &[
        Destroy,
        Update,
        JoinRequestUpdate,
        JoinRequestIndex,
        UserPermissions,
      ],
      K::Space,
    )
    .when(space_admin),
    // ── Posts ─────────────────────────────────────────────────────────────
    Rule::can(&[Read], K::Post).with(Filter::SpacePublic),
    Rule::can(&[Read, Create, ReplyPost], K::Post).when(space_member),
    Rule::can(&[Read, ReplyPost, Update, Destroy], K::Post)
      .with(Filter::AuthoredByActor),
    // ── News: only admins write ───────────────────────────────────────────
    Rule::can(&[Read], K::News).with(Filter::SpacePublic),
    Rule::can(&[Read], K::News).when(space_member),
    Rule::can(&[Manage], K::News).when(space_admin),
    // ── Events ────────────────────────────────────────────────────────────
    Rule::can(&[Read], K::Event).with(Filter::SpacePublic),
    Rule::can(&[Read, Create], K::Event).when(space_member),
    Rule::can(&[Read, Update, Destroy], K::Event).with(Filter::AuthoredByActor),
    // ── Attachments ───────────────────────────────────────────────────────
    Rule::can(&[Read], K::Attachment).with(Filter::SpacePublic),
    Rule::can(&[Read, Create], K::Attachment).when(space_member),
    Rule::can(&[Read, Destroy], K::Attachment).with(Filter::AuthoredByActor),
    // Nothing at all while the space's repository is switched off.
    Rule::cannot(&[Manage], K::Attachment).when(repository_disabled),
    // ── Permissions ───────────────────────────────────────────────────────
    Rule::can(&[Read, Update], K::Permission).when(subject_admin),
  ])
}
