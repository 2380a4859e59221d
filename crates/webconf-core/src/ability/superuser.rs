use super::{Rule, RuleSet};
use crate::action::Action;

/// Superusers may do anything to anything.
pub(super) fn rules() -> RuleSet {
  RuleSet::new([Rule::can_all(&[Action::Manage])])
}
