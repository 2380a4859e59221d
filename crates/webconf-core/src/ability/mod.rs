//! The authorization engine.
//!
//! Each role has a [`RuleSet`]: ordered allow/deny rules grouped by
//! [`ResourceKind`]. A rule matches when it covers the requested action, all
//! of its attribute [`Filter`]s hold, and its predicate (if any) returns
//! `true`. Evaluation collects every matching rule for the resource kind;
//! any matching deny wins, otherwise any matching allow grants, otherwise
//! the answer is no.
//!
//! Rule sets are built once and shared; evaluation is pure.

mod anonymous;
mod member;
mod superuser;

use std::{collections::HashMap, sync::LazyLock};

use serde::{Deserialize, Serialize};

use crate::{
  action::Action,
  actor::Actor,
  resource::{Resource, ResourceKind},
};

pub use member::can_create_meeting;

// ─── Rules ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
  Allow,
  Deny,
}

/// A boolean check over the actor and the candidate resource.
pub type Predicate = fn(&Actor, &Resource) -> bool;

/// Attribute-equality conditions checked before a rule's predicate.
///
/// A filter evaluated against a resource that lacks the attribute fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
  /// `disabled == false` on a user account.
  NotDisabled,
  /// The user account is the actor's own.
  IsActor,
  /// The actor's own account has been disabled.
  ActorDisabled,
  /// The profile belongs to the actor.
  OwnProfile,
  /// The resource's space is public.
  SpacePublic,
  /// The resource's space has its file repository enabled.
  SpaceRepository,
  /// The actor authored the space content.
  AuthoredByActor,
}

impl Filter {
  pub fn holds(self, actor: &Actor, resource: &Resource) -> bool {
    match self {
      Self::NotDisabled => {
        matches!(resource, Resource::User(user) if !user.disabled)
      }
      Self::IsActor => {
        matches!(resource, Resource::User(user) if actor.is(user.id))
      }
      Self::ActorDisabled => actor.disabled,
      Self::OwnProfile => {
        matches!(resource, Resource::Profile(p) if actor.is(p.user_id))
      }
      Self::SpacePublic => resource.space().is_some_and(|s| s.public),
      Self::SpaceRepository => resource.space().is_some_and(|s| s.repository),
      Self::AuthoredByActor => {
        resource.author_id().is_some_and(|author| actor.is(author))
      }
    }
  }
}

/// One `can`/`cannot` declaration.
#[derive(Debug, Clone)]
pub struct Rule {
  pub effect:    Effect,
  pub actions:   &'static [Action],
  /// `None` targets every resource kind.
  pub kind:      Option<ResourceKind>,
  pub filters:   Vec<Filter>,
  pub predicate: Option<Predicate>,
}

impl Rule {
  pub fn can(actions: &'static [Action], kind: ResourceKind) -> Self {
    Self {
      effect: Effect::Allow,
      actions,
      kind: Some(kind),
      filters: Vec::new(),
      predicate: None,
    }
  }

  pub fn cannot(actions: &'static [Action], kind: ResourceKind) -> Self {
    Self { effect: Effect::Deny, ..Self::can(actions, kind) }
  }

  /// Grant `actions` on every resource kind.
  pub fn can_all(actions: &'static [Action]) -> Self {
    Self {
      effect: Effect::Allow,
      actions,
      kind: None,
      filters: Vec::new(),
      predicate: None,
    }
  }

  pub fn with(mut self, filter: Filter) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn when(mut self, predicate: Predicate) -> Self {
    self.predicate = Some(predicate);
    self
  }

  fn covers(&self, action: Action) -> bool {
    self.actions.iter().any(|granted| granted.covers(action))
  }

  fn matches(&self, actor: &Actor, resource: &Resource) -> bool {
    self.filters.iter().all(|f| f.holds(actor, resource))
      && self.predicate.is_none_or(|p| p(actor, resource))
  }
}

// ─── Rule sets ───────────────────────────────────────────────────────────────

/// The rules applicable to one role, indexed by resource kind.
#[derive(Debug, Default)]
pub struct RuleSet {
  by_kind:  HashMap<ResourceKind, Vec<Rule>>,
  /// Rules declared for every kind.
  wildcard: Vec<Rule>,
}

impl RuleSet {
  pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
    let mut set = Self::default();
    for rule in rules {
      match rule.kind {
        Some(kind) => set.by_kind.entry(kind).or_default().push(rule),
        None => set.wildcard.push(rule),
      }
    }
    set
  }

  /// Deny-override evaluation; see the module docs.
  pub fn allows(&self, actor: &Actor, action: Action, resource: &Resource) -> bool {
    let specific = self.by_kind.get(&resource.kind()).into_iter().flatten();
    let mut allowed = false;
    for rule in self.wildcard.iter().chain(specific) {
      if !rule.covers(action) || !rule.matches(actor, resource) {
        continue;
      }
      match rule.effect {
        Effect::Deny => return false,
        Effect::Allow => allowed = true,
      }
    }
    allowed
  }

  pub fn len(&self) -> usize {
    self.wildcard.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

static ANONYMOUS: LazyLock<RuleSet> = LazyLock::new(anonymous::rules);
static MEMBER: LazyLock<RuleSet> = LazyLock::new(member::rules);
static SUPERUSER: LazyLock<RuleSet> = LazyLock::new(superuser::rules);

// ─── Roles ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Anonymous,
  Member,
  Superuser,
}

impl Role {
  /// Superuser beats member beats anonymous. The superuser flag alone
  /// grants the superuser role; a member needs an id.
  pub fn resolve(actor: &Actor) -> Self {
    if actor.superuser {
      Self::Superuser
    } else if !actor.anonymous && actor.id.is_some() {
      Self::Member
    } else {
      Self::Anonymous
    }
  }

  pub fn rules(self) -> &'static RuleSet {
    match self {
      Self::Anonymous => &ANONYMOUS,
      Self::Member => &MEMBER,
      Self::Superuser => &SUPERUSER,
    }
  }
}

// ─── Ability ─────────────────────────────────────────────────────────────────

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Allow,
  Deny,
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allow) }
}

impl From<bool> for Decision {
  fn from(allowed: bool) -> Self {
    if allowed { Self::Allow } else { Self::Deny }
  }
}

/// An actor bound to the rule set of its role.
#[derive(Debug, Clone, Copy)]
pub struct Ability<'a> {
  actor: &'a Actor,
  role:  Role,
}

impl<'a> Ability<'a> {
  pub fn for_actor(actor: &'a Actor) -> Self {
    Self { actor, role: Role::resolve(actor) }
  }

  pub fn role(&self) -> Role { self.role }

  pub fn can(&self, action: Action, resource: &Resource) -> bool {
    self.role.rules().allows(self.actor, action, resource)
  }

  pub fn cannot(&self, action: Action, resource: &Resource) -> bool {
    !self.can(action, resource)
  }
}

/// Decide whether `actor` may perform `action` on `resource`.
pub fn evaluate(actor: &Actor, action: Action, resource: &Resource) -> Decision {
  Ability::for_actor(actor).can(action, resource).into()
}
