use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::upload::FileKind;

/// A message mirrored from the invoices Slack channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlackMessage {
    /// Slack timestamp (`"1718000000.000100"`), also the message id.
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub files: Vec<SlackFile>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl SlackMessage {
    /// Wall-clock time encoded in the Slack `ts`.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        let seconds: f64 = self.ts.parse().ok()?;
        DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
    }

    pub fn has_thread(&self) -> bool {
        self.reply_count > 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlackFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl SlackFile {
    pub fn kind(&self) -> FileKind {
        match FileKind::from_mime(&self.mimetype) {
            FileKind::Other => FileKind::from_file_name(&self.name),
            kind => kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub count: u32,
    /// Whether the current operator is among the reactors.
    #[serde(default)]
    pub me: bool,
}

/// Body of `POST /logistics/slack/react/`.
#[derive(Debug, Clone, Serialize)]
pub struct ReactRequest<'a> {
    pub ts: &'a str,
    pub reaction: &'a str,
}
