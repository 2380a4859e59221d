//! [`ConferenceServer`] over the BigBlueButton API.
//!
//! Every call is signed with `sha256(call name + query string + secret)`,
//! appended as the `checksum` parameter. Responses are XML.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use webconf_core::conference::{
  ConferenceServer, Meeting, MeetingStats, OneOrMany, Participant, Participants,
  StatsResponse,
};

use crate::BigBlueButtonConfig;

#[derive(Debug, Error)]
pub enum BigBlueButtonError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid server url {url}: {reason}")]
  Url { url: String, reason: String },

  #[error("xml error: {0}")]
  Xml(#[from] quick_xml::DeError),
}

/// BigBlueButton API client. Cheap to clone; the inner
/// [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct BigBlueButtonClient {
  client: Client,
  config: BigBlueButtonConfig,
}

// ─── XML ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct XmlResponse {
  returncode: String,
  #[serde(default)]
  stats:      Option<XmlStats>,
  #[serde(default)]
  message:    Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlStats {
  #[serde(default)]
  meeting: Vec<XmlMeeting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlMeeting {
  epoch_start_time: i64,
  #[serde(default)]
  participants:     Option<XmlParticipants>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlParticipants {
  #[serde(default)]
  participant: Vec<XmlParticipant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlParticipant {
  user_name: String,
}

impl From<XmlStats> for StatsResponse {
  fn from(stats: XmlStats) -> Self {
    let meetings = stats
      .meeting
      .into_iter()
      .map(|m| Meeting {
        epoch_start_time: m.epoch_start_time,
        participants:     Participants {
          participant: OneOrMany::Many(
            m.participants
              .unwrap_or_default()
              .participant
              .into_iter()
              .map(|p| Participant { user_name: p.user_name })
              .collect(),
          ),
        },
      })
      .collect();
    StatsResponse { stats: MeetingStats { meeting: OneOrMany::Many(meetings) } }
  }
}

/// Parse a `getStats` body. `None` unless the server answered `SUCCESS`.
pub fn parse_stats(xml: &str) -> Result<Option<StatsResponse>, BigBlueButtonError> {
  let response: XmlResponse = quick_xml::de::from_str(xml)?;
  if response.returncode != "SUCCESS" {
    tracing::warn!(
      returncode = %response.returncode,
      message = response.message.as_deref().unwrap_or(""),
      "getStats refused"
    );
    return Ok(None);
  }
  Ok(Some(response.stats.unwrap_or_default().into()))
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// `sha256(call + query + secret)` as lowercase hex.
pub fn checksum(call: &str, query: &str, secret: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(call.as_bytes());
  hasher.update(query.as_bytes());
  hasher.update(secret.as_bytes());
  hex::encode(hasher.finalize())
}

impl BigBlueButtonClient {
  pub fn new(config: BigBlueButtonConfig) -> Result<Self, BigBlueButtonError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  /// The signed URL for `call` with `params`.
  pub fn api_url(
    &self,
    call: &str,
    params: &[(&str, &str)],
  ) -> Result<Url, BigBlueButtonError> {
    let base = self.config.url.trim_end_matches('/');
    let raw = format!("{base}/api/{call}");
    let mut url = Url::parse(&raw)
      .map_err(|e| BigBlueButtonError::Url { url: raw.clone(), reason: e.to_string() })?;
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params);
    }
    let query = url.query().unwrap_or("").to_owned();
    let sum = checksum(call, &query, &self.config.secret);
    url.query_pairs_mut().append_pair("checksum", &sum);
    Ok(url)
  }
}

impl ConferenceServer for BigBlueButtonClient {
  type Error = BigBlueButtonError;

  async fn get_stats(
    &self,
    meeting_id: &str,
  ) -> Result<Option<StatsResponse>, BigBlueButtonError> {
    let url = self.api_url("getStats", &[("meetingID", meeting_id)])?;
    let resp = self.client.get(url).send().await?;
    if !resp.status().is_success() {
      tracing::warn!(status = %resp.status(), %meeting_id, "getStats failed");
      return Ok(None);
    }
    let body = resp.text().await?;
    parse_stats(&body)
  }
}
