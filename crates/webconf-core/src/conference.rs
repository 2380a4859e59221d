//! The conferencing server contract: meeting statistics used for billing.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// One element or a list of them; remote stats collapse single-element lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
  Many(Vec<T>),
  One(T),
}

impl<T> Default for OneOrMany<T> {
  fn default() -> Self { Self::Many(Vec::new()) }
}

impl<T> OneOrMany<T> {
  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Many(items) if items.is_empty())
  }

  pub fn into_vec(self) -> Vec<T> {
    match self {
      Self::Many(items) => items,
      Self::One(item) => vec![item],
    }
  }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
  fn from(items: Vec<T>) -> Self { Self::Many(items) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
  #[serde(rename = "userName")]
  pub user_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
  #[serde(default)]
  pub participant: OneOrMany<Participant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
  /// Milliseconds since the Unix epoch.
  #[serde(rename = "epochStartTime")]
  pub epoch_start_time: i64,
  #[serde(default)]
  pub participants:     Participants,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingStats {
  #[serde(default)]
  pub meeting: OneOrMany<Meeting>,
}

/// Aggregate statistics for one conferencing room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
  pub stats: MeetingStats,
}

/// A conferencing server able to report per-room statistics.
pub trait ConferenceServer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Statistics for `meeting_id` over the server's reporting period.
  /// `Ok(None)` when the server has nothing to report.
  fn get_stats<'a>(
    &'a self,
    meeting_id: &'a str,
  ) -> impl Future<Output = Result<Option<StatsResponse>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_meeting_is_wrapped() {
    let json = serde_json::json!({
      "stats": {
        "meeting": {
          "epochStartTime": 1_700_000_000_000_i64,
          "participants": { "participant": { "userName": "Ana" } }
        }
      }
    });
    let resp: StatsResponse = serde_json::from_value(json).unwrap();
    let meetings = resp.stats.meeting.into_vec();
    assert_eq!(meetings.len(), 1);
    let names: Vec<_> = meetings[0]
      .participants
      .participant
      .clone()
      .into_vec()
      .into_iter()
      .map(|p| p.user_name)
      .collect();
    assert_eq!(names, ["Ana"]);
  }

  #[test]
  fn meeting_lists_stay_lists() {
    let json = serde_json::json!({
      "stats": {
        "meeting": [
          { "epochStartTime": 1, "participants": { "participant": [] } },
          { "epochStartTime": 2 }
        ]
      }
    });
    let resp: StatsResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.stats.meeting.into_vec().len(), 2);
  }
}
