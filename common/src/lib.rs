//! A library with common utilities for the weekly progress tracker.

pub mod collation;
#[cfg(feature = "network")]
pub mod client_api;
#[cfg(feature = "database")]
pub mod config;
#[cfg(feature = "database")]
pub mod db_util;
pub mod display;
pub mod error;
pub mod period;
pub mod ranking;
pub mod submission;
pub mod summary;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use error::ProgressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CLIENT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;

/// The two report types tracked independently per staff member and date.
/// Serialized (and stored) with the labels the web form submits.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum Category {
    /// Procurement contract management.
    #[serde(rename = "採購案履約管理")]
    #[value(name = "procurement")]
    Procurement,
    /// Important work.
    #[serde(rename = "重要工作")]
    #[value(name = "important-work")]
    ImportantWork,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Procurement, Category::ImportantWork];

    /// The label used on the wire and in the `progress.category` column.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Procurement => "採購案履約管理",
            Category::ImportantWork => "重要工作",
        }
    }

    /// Match either the stored label or the ASCII alias.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "採購案履約管理" | "procurement" => Some(Category::Procurement),
            "重要工作" | "important-work" | "important" => Some(Category::ImportantWork),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s)
            .ok_or_else(|| ProgressError::validation(format!("unknown category {s:?}")))
    }
}

/// A staff member as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: i32,
    pub name: String,
}

/// A row of the legacy staff rankings list: the latest update of any kind since the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRanking {
    pub id: i32,
    pub name: String,
    pub latest: Option<DateTime<Utc>>,
}

/// Latest qualifying (non-blank) update for one staff member in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub staff_id: i32,
    pub category: Category,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    NotSubmitted,
}

/// One line of the weekly ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub id: i32,
    pub name: String,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A candidate entry for the weekly summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub entry_id: i64,
    pub staff_id: i32,
    pub staff_name: String,
    pub category: Category,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// The weekly digest, one display line per staff member and category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub procurement: Vec<String>,
    pub important: Vec<String>,
}

/// Response of the previous-entry lookup. Serializes to `{}` when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
}

/// How an entry identifies its staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffRef {
    Id(i32),
    /// Looked up by exact name, created if missing.
    Name(String),
}

/// A validated entry of a submission batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedEntry {
    pub staff: StaffRef,
    pub text: Option<String>,
    /// `None` is passed through to the store, which rejects it.
    pub category: Option<Category>,
}

/// A validated submission batch, persisted all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionBatch {
    pub year: i32,
    pub date: NaiveDate,
    pub collector_id: Option<i32>,
    pub entries: Vec<SubmittedEntry>,
}
