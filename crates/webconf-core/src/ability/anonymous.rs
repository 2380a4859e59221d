//! Rules for visitors without an account.

use super::{Filter, Rule, RuleSet};
use crate::{
  action::Action,
  resource::{Resource, ResourceKind as K, Visibility},
};

pub(super) fn rules() -> RuleSet {
  RuleSet::new([
    Rule::can(&[Action::Read], K::Profile).when(|_, resource| {
      matches!(
        resource,
        Resource::Profile(p) if p.visibility() == Some(Visibility::Everybody)
      )
    }),
    Rule::can(&[Action::Read, Action::Current], K::User).with(Filter::NotDisabled),
    Rule::can(&[Action::Read, Action::Webconference], K::Space)
      .with(Filter::SpacePublic),
    Rule::can(&[Action::Read], K::Post).with(Filter::SpacePublic),
    Rule::can(&[Action::Read], K::News).with(Filter::SpacePublic),
    Rule::can(&[Action::Read], K::Event).with(Filter::SpacePublic),
    Rule::can(&[Action::Read], K::Attachment)
      .with(Filter::SpacePublic)
      .with(Filter::SpaceRepository),
    // Room actions that authorize the visitor themselves further down.
    Rule::can(
      &[Action::Invite, Action::InviteUserid, Action::Auth, Action::Running],
      K::Room,
    ),
  ])
}
